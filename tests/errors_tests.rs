use shortvault::errors::{Result, StoreError};
use std::error::Error;

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = StoreError::not_found("no entry 'abcd'");

        assert!(matches!(error, StoreError::NotFound(_)));
        assert!(error.to_string().contains("Entry Not Found"));
        assert!(error.to_string().contains("no entry 'abcd'"));
    }

    #[test]
    fn test_invalid_url_error() {
        let error = StoreError::invalid_url("missing scheme");

        assert!(matches!(error, StoreError::InvalidUrl(_)));
        assert!(error.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_authorization_failed_error() {
        let error = StoreError::authorization_failed("token mismatch");

        assert!(matches!(error, StoreError::AuthorizationFailed(_)));
        assert_eq!(error.message(), "token mismatch");
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            StoreError::invalid_url(""),
            StoreError::already_exists(""),
            StoreError::generation_exhausted(""),
            StoreError::not_found(""),
            StoreError::expired(""),
            StoreError::authorization_failed(""),
            StoreError::database_connection(""),
            StoreError::database_operation(""),
            StoreError::serialization(""),
            StoreError::file_operation(""),
            StoreError::password_hash(""),
            StoreError::random_source(""),
            StoreError::config(""),
            StoreError::storage_backend_not_found(""),
        ];

        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert_eq!(StoreError::invalid_url("").code(), "E001");
        assert_eq!(StoreError::storage_backend_not_found("").code(), "E014");
    }
}

#[cfg(test)]
mod error_behaviour_tests {
    use super::*;

    #[test]
    fn test_context_keeps_variant() {
        let error =
            StoreError::database_operation("timeout").context("could not set key 'entry:x'");

        assert!(matches!(error, StoreError::DatabaseOperation(_)));
        assert_eq!(error.message(), "could not set key 'entry:x': timeout");
    }

    #[test]
    fn test_format_simple() {
        let error = StoreError::expired("entry 'abcd' has expired");
        assert_eq!(
            error.format_simple(),
            "Entry Expired: entry 'abcd' has expired"
        );
        assert_eq!(error.to_string(), error.format_simple());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_format_colored_contains_code() {
        let error = StoreError::generation_exhausted("10 attempts");
        let colored = error.format_colored();
        assert!(colored.contains("E003"));
        assert!(colored.contains("10 attempts"));
    }

    #[test]
    fn test_is_std_error() {
        let error = StoreError::config("bad");
        let dyn_error: &dyn Error = &error;
        assert!(dyn_error.source().is_none());
    }

    #[test]
    fn test_result_alias() {
        fn fails() -> Result<()> {
            Err(StoreError::not_found("x"))
        }
        assert!(fails().is_err());
    }
}

#[cfg(test)]
mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: StoreError = io.into();
        assert!(matches!(error, StoreError::FileOperation(_)));
    }

    #[test]
    fn test_from_serde_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: StoreError = parse.into();
        assert!(matches!(error, StoreError::Serialization(_)));
    }
}
