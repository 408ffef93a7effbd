mod duration;
mod timestamp;

pub use duration::{format_duration, parse_duration, DurationError};
pub use timestamp::parse_timestamp;

/// Default Mailman REST user, as shipped in mailman.cfg
pub const DEFAULT_API_USER: &str = "restadmin";
