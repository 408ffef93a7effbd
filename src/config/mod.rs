mod args;

pub use args::Args;

use crate::client::{CancelAction, Credentials, HttpSettings, RequestFilter, RequestKind, TokenOwner};
use crate::reconciliation::{CancelPolicy, RunOptions, DEFAULT_CONCURRENCY};
use crate::utils::{parse_duration, DurationError, DEFAULT_API_USER};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No API URL configured (set API_URL or apiUrl)")]
    MissingApiUrl,

    #[error("No credentials configured (set API_PASSWORD or API_TOKEN)")]
    MissingCredentials,

    #[error("Invalid minimum age: {0}")]
    InvalidMinAge(#[from] DurationError),

    #[error("Invalid {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Report format written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected text or json)", other)),
        }
    }
}

/// Contents of the optional JSON config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub api_user: Option<String>,
    pub api_password: Option<String>,
    pub api_token: Option<String>,
    pub min_age: Option<String>,
    pub dry_run: Option<bool>,
    pub action: Option<String>,
    pub reason: Option<String>,
    pub request_types: Vec<String>,
    pub token_owner: Option<String>,
    pub lists: Vec<String>,
    pub concurrency: Option<usize>,
    pub page_size: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub output: Option<String>,
}

/// Fully resolved settings for one pass
#[derive(Debug, Clone)]
pub struct Settings {
    pub http: HttpSettings,
    pub run: RunOptions,
    pub output: OutputFormat,
}

/// Read the configuration file
pub async fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).await?;
    let config: FileConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Resolve settings from the command line/environment, reading `--config` if given.
pub async fn load_settings(args: Args) -> Result<Settings, ConfigError> {
    let file = match &args.config {
        Some(path) => read_config(path).await?,
        None => FileConfig::default(),
    };
    resolve_settings(args, file)
}

/// Merge flags/environment over the file config and validate the result.
pub fn resolve_settings(args: Args, file: FileConfig) -> Result<Settings, ConfigError> {
    let api_url = non_empty(args.api_url)
        .or(non_empty(file.api_url))
        .ok_or(ConfigError::MissingApiUrl)?;

    let credentials = resolve_credentials(
        non_empty(args.api_token).or(non_empty(file.api_token)),
        non_empty(args.api_user).or(non_empty(file.api_user)),
        non_empty(args.api_password).or(non_empty(file.api_password)),
    )?;

    let policy = match non_empty(args.min_age).or(non_empty(file.min_age)) {
        Some(raw) => CancelPolicy::older_than(parse_duration(&raw)?),
        None => CancelPolicy::unconditional(),
    };

    let reason = non_empty(args.reason).or(non_empty(file.reason));
    let action = match non_empty(args.action).or(non_empty(file.action)) {
        None => CancelAction::Discard,
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "discard" => CancelAction::Discard,
            "reject" => CancelAction::Reject { reason },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "action",
                    reason: format!("unknown action '{}' (expected discard or reject)", other),
                })
            }
        },
    };

    let filter = resolve_filter(
        pick_list(args.request_types, file.request_types),
        non_empty(args.token_owner).or(non_empty(file.token_owner)),
    )?;

    let concurrency = args
        .concurrency
        .or(file.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 {
        return Err(ConfigError::InvalidValue {
            key: "concurrency",
            reason: "must be at least 1".to_string(),
        });
    }

    let page_size = args.page_size.or(file.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err(ConfigError::InvalidValue {
            key: "page size",
            reason: "must be at least 1".to_string(),
        });
    }

    let timeout_secs = args
        .timeout_secs
        .or(file.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: "timeout",
            reason: "must be at least 1 second".to_string(),
        });
    }

    let output = match non_empty(args.output).or(non_empty(file.output)) {
        Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
            key: "output format",
            reason,
        })?,
        None => OutputFormat::Text,
    };

    Ok(Settings {
        http: HttpSettings {
            base_url: api_url,
            credentials,
            timeout: Duration::from_secs(timeout_secs),
            page_size,
        },
        run: RunOptions {
            policy,
            filter,
            action,
            dry_run: args.dry_run.or(file.dry_run).unwrap_or(false),
            concurrency,
            lists: pick_list(args.lists, file.lists),
        },
        output,
    })
}

/// A token wins over user/password; the user defaults to Mailman's stock admin.
fn resolve_credentials(
    token: Option<String>,
    user: Option<String>,
    password: Option<String>,
) -> Result<Credentials, ConfigError> {
    if let Some(token) = token {
        return Ok(Credentials::Bearer(token));
    }

    match password {
        Some(password) => Ok(Credentials::Basic {
            user: user.unwrap_or_else(|| DEFAULT_API_USER.to_string()),
            password,
        }),
        None => Err(ConfigError::MissingCredentials),
    }
}

fn resolve_filter(
    request_types: Vec<String>,
    token_owner: Option<String>,
) -> Result<RequestFilter, ConfigError> {
    let mut filter = RequestFilter::default();

    if !request_types.is_empty() {
        let mut kinds = Vec::new();
        for raw in &request_types {
            let kind: RequestKind = raw.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "request type",
                reason,
            })?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        filter.kinds = kinds;
    }

    if let Some(raw) = token_owner {
        let owner: TokenOwner = raw.parse().map_err(|reason| ConfigError::InvalidValue {
            key: "token owner",
            reason,
        })?;
        filter.token_owner = Some(owner);
    }

    Ok(filter)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Flag/env list if it has entries, else the file's.
fn pick_list(primary: Vec<String>, fallback: Vec<String>) -> Vec<String> {
    let clean = |values: Vec<String>| -> Vec<String> {
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    };

    let primary = clean(primary);
    if primary.is_empty() {
        clean(fallback)
    } else {
        primary
    }
}
