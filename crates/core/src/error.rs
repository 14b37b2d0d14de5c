use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrandError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid config value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },
}
