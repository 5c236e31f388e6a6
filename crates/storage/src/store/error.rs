#![forbid(unsafe_code)]

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("referenced row does not exist")]
    InvalidReference,
    #[error("unknown id")]
    UnknownId,
}

impl StoreError {
    /// Stable machine-readable code for tool responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidReference | Self::UnknownId => "NOT_FOUND",
            Self::Io(_) | Self::Sql(_) => "STORE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let io = StoreError::Io(std::io::Error::other("disk"));
        assert_eq!(io.code(), "STORE_ERROR");
        assert_eq!(
            StoreError::InvalidInput("RESET_REQUIRED: schema version mismatch").code(),
            "RESET_REQUIRED"
        );
        assert_eq!(StoreError::InvalidInput("bad").code(), "INVALID_INPUT");
        assert_eq!(StoreError::Conflict("dup").code(), "CONFLICT");
        assert_eq!(StoreError::UnknownId.code(), "NOT_FOUND");
        assert_eq!(StoreError::InvalidReference.code(), "NOT_FOUND");
    }
}
