//! Window and GPU context errors.

use thiserror::Error;

/// Errors reported by GPU contexts and backends.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The presentation surface could not be refreshed for a transient
    /// reason. The frame is skipped and retried with the next one.
    #[error("surface out of date")]
    OutOfDate,

    /// The GPU device is gone. Context and GPU must be recreated.
    #[error("GPU device lost")]
    DeviceLost,

    /// Every candidate backend failed.
    #[error("no usable GPU backend: {}", .0.join("; "))]
    NoBackend(Vec<String>),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl ContextError {
    /// Whether the error is recovered from inside the frame loop.
    pub fn is_transient(&self) -> bool {
        matches!(self, ContextError::OutOfDate | ContextError::DeviceLost)
    }
}

/// Errors ending the life of a window.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("GPU context error: {0}")]
    Context(#[from] ContextError),

    #[error("only one window may be open at a time")]
    MultipleWindows,

    #[error("window closed")]
    Closed,

    #[error("invalid window configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_backend_lists_every_failure() {
        let err = ContextError::NoBackend(vec!["vulkan: no device".into(), "gl: no display".into()]);
        assert_eq!(
            err.to_string(),
            "no usable GPU backend: vulkan: no device; gl: no display"
        );
        assert!(!err.is_transient());
        assert!(ContextError::DeviceLost.is_transient());
    }

    #[test]
    fn test_backend_errors_convert() {
        let err: ContextError = anyhow::anyhow!("driver crashed").into();
        let err: WindowError = err.into();
        assert_eq!(err.to_string(), "GPU context error: driver crashed");
    }
}
