use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeskError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl DeskError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Returns the bare message without the variant prefix, for wire payloads.
    pub fn message(&self) -> &str {
        match self {
            Self::MalformedInput(msg) | Self::Validation(msg) | Self::NotFound(msg) => msg,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_variant_prefix() {
        let err = DeskError::not_found("Request not found");
        assert_eq!(err.to_string(), "Not found: Request not found");
        assert_eq!(err.message(), "Request not found");
    }
}
