use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// How far an error is allowed to travel before it stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Aborts the whole process with a non-zero exit status.
    Fatal,
    /// May be logged and replaced with a default by the caller.
    Recoverable,
}

/// Error types for the documenthor library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Invalid UTF-8 encountered in file.
    #[error("Invalid UTF-8 encoding in file '{path}'. File may be binary or use unsupported encoding.")]
    InvalidUtf8 {
        /// Path to file with encoding issues
        path: PathBuf,
    },

    /// The documentation request to the generation endpoint failed.
    ///
    /// This is the only fatal error kind: the run cannot produce a document
    /// without it.
    #[error("Error communicating with Ollama at '{endpoint}': {message}")]
    Generation {
        /// Endpoint URL that was called
        endpoint: String,
        /// Error message
        message: String,
    },

    /// A model-management request failed.
    #[error("Ollama request to '{endpoint}' failed: {message}")]
    Http {
        /// Endpoint URL that was called
        endpoint: String,
        /// Error message
        message: String,
    },

    /// An external command could not be run or exited unsuccessfully.
    #[error("Command '{command}' failed: {message}")]
    Command {
        /// Command line that was executed
        command: String,
        /// Error message, usually captured stderr
        message: String,
    },

    /// No usable training examples were found.
    #[error("No training data found in '{path}'")]
    NoTrainingData {
        /// Directory that was searched
        path: PathBuf,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        // Tera hides the useful part of the message in the source chain.
        let mut message = source.to_string();
        let mut cause = std::error::Error::source(&source);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = std::error::Error::source(inner);
        }

        Self::Template {
            template: template.into(),
            message,
        }
    }

    /// Creates an invalid UTF-8 error.
    #[must_use]
    pub fn invalid_utf8(path: impl Into<PathBuf>) -> Self {
        Self::InvalidUtf8 { path: path.into() }
    }

    /// Creates a fatal generation error.
    #[must_use]
    pub fn generation(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Generation {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Creates a recoverable HTTP error.
    #[must_use]
    pub fn http(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Creates an external command error.
    #[must_use]
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a missing training data error.
    #[must_use]
    pub fn no_training_data(path: impl Into<PathBuf>) -> Self {
        Self::NoTrainingData { path: path.into() }
    }

    /// Returns how this error should be treated by the caller.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Generation { .. } => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }

    /// Returns true if this error must abort the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.severity(), Severity::Fatal)
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl From<tera::Error> for Error {
    fn from(e: tera::Error) -> Self {
        Self::template("unknown", e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(err.to_string().contains("test message"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io("/tmp/test.txt", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn test_generation_error_is_fatal() {
        let err = Error::generation("http://localhost:11434/api/generate", "connection refused");
        assert_eq!(err.severity(), Severity::Fatal);
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Error communicating with Ollama"));
    }

    #[test]
    fn test_other_errors_are_recoverable() {
        let errors = vec![
            Error::http("http://localhost:11434/api/tags", "timeout"),
            Error::config("bad"),
            Error::command("kubectl get pods", "not found"),
            Error::no_training_data("/tmp/training"),
        ];

        for err in errors {
            assert_eq!(err.severity(), Severity::Recoverable, "{err}");
        }
    }

    #[test]
    fn test_error_clone() {
        let err = Error::config("test");
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }
}
