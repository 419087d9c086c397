use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The listing URL must be http(s) with a host. Got: {0}")]
    InvalidUrl(String),
    #[error("Url Error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
    #[error("Couldn't compile the product code pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl Error {
    pub fn selector(selector: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }
}
