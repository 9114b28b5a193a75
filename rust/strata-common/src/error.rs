use thiserror::Error;

/// Common error type for the strata crates.
///
/// The error kind is boxed to keep `Result<T>` at a single pointer of overhead
/// on the success path.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    /// Build or load was invoked on an index instance that is already ready.
    pub fn already_ready(operation: impl Into<String>) -> Error {
        Error(
            ErrorKind::AlreadyReady {
                operation: operation.into(),
            }
            .into(),
        )
    }

    /// A query or serialize operation was invoked before a successful build
    /// or load.
    pub fn not_ready(operation: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotReady {
                operation: operation.into(),
            }
            .into(),
        )
    }

    pub fn build_failed(kind: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::BuildFailed {
                kind: kind.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// Persisted index data is missing, truncated or otherwise malformed.
    pub fn corrupt(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::CorruptIndex {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn type_mismatch(
        element: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::TypeMismatch {
                element: element.into(),
                expected: expected.into(),
                actual: actual.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("{operation}: index is already built or loaded")]
    AlreadyReady { operation: String },

    #[error("{operation}: index is not ready, build or load it first")]
    NotReady { operation: String },

    #[error("failed to build {kind} index: {message}")]
    BuildFailed { kind: String, message: String },

    #[error("corrupt index data in '{element}': {message}")]
    CorruptIndex { element: String, message: String },

    #[error("element type mismatch for '{element}': expected {expected}, found {actual}")]
    TypeMismatch {
        element: String,
        expected: String,
        actual: String,
    },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
