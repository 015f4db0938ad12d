use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] rialto_core::ValidationError),

    #[error(transparent)]
    Service(#[from] rialto_core::ServiceError),

    #[error(transparent)]
    Store(#[from] rialto_core::StoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::InvalidArgument(_) => 2,
            Self::Service(_) => 3,
            Self::Store(_) => 4,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_trouble_maps_to_usage_exit_code() {
        let error = CliError::InvalidArgument("bad adjustment".to_owned());
        assert_eq!(error.exit_code(), 2);
    }
}
