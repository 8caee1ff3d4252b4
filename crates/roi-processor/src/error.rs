use thiserror::Error;

/// Errors raised while setting up a processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    /// Constructed outside of a Tokio runtime without an explicit handle.
    #[error("No Tokio runtime available to run frame computations")]
    NoRuntime,
}
