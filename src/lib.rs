pub mod client;
pub mod config;
pub mod reconciliation;
pub mod utils;

// Re-export commonly used types
pub use client::{
    list_mailing_lists, list_pending_requests, CancelAction, ClientError, Credentials,
    HttpListManager, HttpSettings, ListManagerClient, MailingList, Page, PendingRequest,
    RequestFilter, RequestKind, TokenOwner,
};
pub use config::{load_settings, resolve_settings, Args, ConfigError, FileConfig, OutputFormat, Settings};
pub use reconciliation::{
    build_list_plan, execute_list_plan, reconcile_list, run, CancelPolicy, ListPlan, Outcome,
    RequestOutcome, RunOptions, Summary,
};
