use std::fmt;

/// Synchronous failure while constructing or inserting a renderable.
///
/// This is the only error the composer propagates to callers; asynchronous
/// load failures are converted into the `Error` lifecycle state instead and
/// never thrown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionError {
    message: String,
}

impl ConstructionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer construction failed: {}", self.message)
    }
}

impl std::error::Error for ConstructionError {}
