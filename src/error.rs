use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Could not serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Malformed bookmark entry: {0}")]
    MalformedBookmark(String),

    #[error("Unknown environment variable: {0}")]
    UnknownVariable(String),
}

pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_bookmark_error() {
        let error = EditorError::MalformedBookmark("docs = 3".to_string());
        assert_eq!(error.to_string(), "Malformed bookmark entry: docs = 3");
    }

    #[test]
    fn test_unknown_variable_error() {
        let error = EditorError::UnknownVariable("NOPE".to_string());
        assert_eq!(error.to_string(), "Unknown environment variable: NOPE");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: EditorError = io_error.into();
        assert!(matches!(error, EditorError::Io(_)));
        assert!(error.to_string().contains("missing"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse: Result<toml::Value, _> = toml::from_str("= nope");
        let error: EditorError = parse.unwrap_err().into();
        assert!(matches!(error, EditorError::ConfigParse(_)));
    }
}
