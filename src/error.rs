//! Error types and handling for docpack
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for docpack operations
#[derive(Error, Diagnostic, Debug)]
pub enum DocpackError {
    // Registry errors
    #[error("Duplicate identity '{id}': {first} and {second}")]
    #[diagnostic(
        code(docpack::registry::duplicate_identity),
        help(
            "Give one of the files a distinct identity field in its frontmatter, \
             or configure a base directory so identities include the directory path"
        )
    )]
    DuplicateIdentity {
        id: String,
        first: String,
        second: String,
    },

    // Packaging errors
    #[error(
        "Destination collision under '{strategy}' naming: {first_source} -> {first_destination} \
         and {second_source} -> {second_destination}"
    )]
    #[diagnostic(
        code(docpack::package::destination_collision),
        help("Use a naming strategy that keeps more of the source path (flattened or preserve)")
    )]
    DestinationCollision {
        strategy: String,
        first_source: String,
        first_destination: String,
        second_source: String,
        second_destination: String,
    },

    #[error("Root document is outside the project root: {path}")]
    #[diagnostic(
        code(docpack::package::root_outside_project),
        help("Pass --project-root pointing at a directory that contains the root document")
    )]
    RootOutsideProject { path: String },

    #[error("Output directory is not empty: {path}")]
    #[diagnostic(
        code(docpack::package::output_not_empty),
        help("Choose another output path or pass --force to write into it anyway")
    )]
    OutputNotEmpty { path: String },

    #[error("Failed to create archive {path}: {reason}")]
    #[diagnostic(code(docpack::package::archive_failed))]
    ArchiveFailed { path: String, reason: String },

    // Rewrite errors
    #[error("Invalid template '{template}': {reason}")]
    #[diagnostic(
        code(docpack::rewrite::template_invalid),
        help("Placeholders look like {{{{ name }}}} or {{{{ link.name }}}}")
    )]
    TemplateInvalid { template: String, reason: String },

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    #[diagnostic(code(docpack::glob::invalid))]
    InvalidGlob { pattern: String, reason: String },

    // Configuration errors
    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(docpack::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}")]
    #[diagnostic(code(docpack::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(docpack::config::invalid))]
    ConfigInvalid { message: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(docpack::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(docpack::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(docpack::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(docpack::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for DocpackError {
    fn from(err: std::io::Error) -> Self {
        DocpackError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for DocpackError {
    fn from(err: serde_yaml::Error) -> Self {
        DocpackError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DocpackError {
    fn from(err: serde_json::Error) -> Self {
        DocpackError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<walkdir::Error> for DocpackError {
    fn from(err: walkdir::Error) -> Self {
        DocpackError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for DocpackError {
    fn from(err: zip::result::ZipError) -> Self {
        DocpackError::ArchiveFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Helper for wrapping an I/O failure on a specific path as a read error
pub fn read_failed(path: &std::path::Path, err: &std::io::Error) -> DocpackError {
    DocpackError::FileReadFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Helper for wrapping an I/O failure on a specific path as a write error
pub fn write_failed(path: &std::path::Path, err: &std::io::Error) -> DocpackError {
    DocpackError::FileWriteFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, DocpackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocpackError::FileNotFound {
            path: "docs/guide.md".to_string(),
        };
        assert_eq!(err.to_string(), "File not found: docs/guide.md");
    }

    #[test]
    fn test_error_code() {
        let err = DocpackError::DuplicateIdentity {
            id: "guide".to_string(),
            first: "a/guide.md".to_string(),
            second: "b/guide.md".to_string(),
        };
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("docpack::registry::duplicate_identity".to_string())
        );
    }

    #[test]
    fn test_duplicate_identity_names_both_paths() {
        let err = DocpackError::DuplicateIdentity {
            id: "guide".to_string(),
            first: "a/guide.md".to_string(),
            second: "b/guide.md".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("a/guide.md"));
        assert!(message.contains("b/guide.md"));
    }

    #[test]
    fn test_destination_collision_names_strategy_and_paths() {
        let err = DocpackError::DestinationCollision {
            strategy: "flat".to_string(),
            first_source: "/p/a/guide.md".to_string(),
            first_destination: "out/guide.md".to_string(),
            second_source: "/p/b/guide.md".to_string(),
            second_destination: "out/Guide.md".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'flat'"));
        assert!(message.contains("/p/a/guide.md"));
        assert!(message.contains("/p/b/guide.md"));
        assert!(message.contains("out/guide.md"));
        assert!(message.contains("out/Guide.md"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DocpackError = io_err.into();
        assert!(matches!(err, DocpackError::IoError { .. }));
    }

    #[test]
    fn test_template_invalid_help_renders_braces() {
        let err = DocpackError::TemplateInvalid {
            template: "{{ id".to_string(),
            reason: "unterminated placeholder".to_string(),
        };
        let help = err.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("{{ name }}"));
    }
}
