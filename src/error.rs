use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelensError {
    #[error("Lookup failed for job '{job}': {reason}")]
    LookupFailed { job: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Build not found: {job} #{number}")]
    BuildNotFound { job: String, number: u32 },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelensError>;
