use thiserror::Error;

/// Problems that stop a command before any page is visited.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("please set {user_var} and {pass_var} environment variables")]
    MissingCredentials {
        user_var: &'static str,
        pass_var: &'static str,
    },
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error(transparent)]
    Settings(#[from] config::ConfigError),
}

/// Failures raised by a page session while visiting a single item.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("no page loaded")]
    NoPage,
    #[error("no login form on {0}")]
    NoLoginForm(String),
    #[error("download affordance \"{0}\" has no link target")]
    UnusableAffordance(String),
}
