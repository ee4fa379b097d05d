use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Severity level {0} out of range (0-16)")]
    SeverityOutOfRange(u16),

    #[error("Invalid group pattern '{pattern}': {reason}")]
    InvalidGroupPattern { pattern: String, reason: String },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}
