use clap::builder::FalseyValueParser;
use clap::Parser;
use std::path::PathBuf;

/// pending-reaper - cancel stale pending subscription requests on a Mailman 3 list manager
///
/// Every option can also be given through its environment variable or in the
/// JSON file passed with --config. Flags and environment win over the file.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file
    #[arg(short, long, env = "REAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mailman REST root, including the API version.
    /// Example: --api-url=http://localhost:8001/3.1
    #[arg(long, env = "API_URL")]
    pub api_url: Option<String>,

    /// REST admin user (defaults to restadmin)
    #[arg(long, env = "API_USER")]
    pub api_user: Option<String>,

    /// REST admin password
    #[arg(long, env = "API_PASSWORD", hide_env_values = true)]
    pub api_password: Option<String>,

    /// Bearer token, used instead of user/password when set
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Only cancel requests pending longer than this (e.g. 30m, 1h, 2d, 1w).
    /// Without it every pending request is cancelled.
    #[arg(long, env = "MIN_AGE")]
    pub min_age: Option<String>,

    /// Log what would be cancelled without cancelling anything.
    /// `--dry-run=false` or DRY_RUN=0 turns off a dry run set in the config file.
    #[arg(
        long,
        env = "DRY_RUN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = FalseyValueParser::new()
    )]
    pub dry_run: Option<bool>,

    /// How to cancel: discard (silent) or reject (notifies the requester)
    #[arg(long, env = "CANCEL_ACTION")]
    pub action: Option<String>,

    /// Reason sent to the requester with --action=reject
    #[arg(long, env = "CANCEL_REASON")]
    pub reason: Option<String>,

    /// Comma-separated request types to consider (subscription, unsubscription)
    #[arg(long, env = "REQUEST_TYPES", value_delimiter = ',')]
    pub request_types: Vec<String>,

    /// Only consider tokens waiting on this party (moderator or subscriber)
    #[arg(long, env = "TOKEN_OWNER")]
    pub token_owner: Option<String>,

    /// Comma-separated list ids to reconcile; all lists when omitted
    #[arg(long, env = "LISTS", value_delimiter = ',')]
    pub lists: Vec<String>,

    /// Number of lists reconciled concurrently
    #[arg(long, env = "CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Entries requested per API page
    #[arg(long, env = "PAGE_SIZE")]
    pub page_size: Option<u32>,

    /// Per-request timeout against the API, in seconds
    #[arg(long, env = "API_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Report format on stdout: text or json
    #[arg(long, env = "OUTPUT_FORMAT")]
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "pending-reaper",
            "--api-url",
            "http://localhost:8001/3.1",
            "--api-password",
            "restpass",
            "--min-age",
            "1h",
            "--dry-run",
            "--lists",
            "a@example.org,b@example.org",
            "--request-types=subscription,unsubscription",
        ])
        .unwrap();

        assert_eq!(args.api_url.as_deref(), Some("http://localhost:8001/3.1"));
        assert_eq!(args.min_age.as_deref(), Some("1h"));
        assert_eq!(args.dry_run, Some(true));
        assert_eq!(args.lists, vec!["a@example.org", "b@example.org"]);
        assert_eq!(args.request_types.len(), 2);
    }

    #[test]
    fn test_dry_run_can_be_switched_off() {
        let args = Args::try_parse_from(["pending-reaper", "--dry-run=false"]).unwrap();
        assert_eq!(args.dry_run, Some(false));

        let args = Args::try_parse_from(["pending-reaper", "--dry-run=no"]).unwrap();
        assert_eq!(args.dry_run, Some(false));
    }

    #[test]
    fn test_no_required_arguments() {
        assert!(Args::try_parse_from(["pending-reaper"]).is_ok());
    }
}
