/// Everything that can go wrong while measuring.
///
/// Out-of-range buffer probes are not represented here: the accessors return
/// `Option` because scans step past the image edges all the time. Only a query
/// point that lies outside the screenshot surfaces as `OutOfRange`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeasureError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
    #[error("Point ({x}, {y}) is outside the screenshot")]
    OutOfRange { x: i64, y: i64 },
    #[error("Area scan was cancelled")]
    Cancelled,
}

impl MeasureError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        MeasureError::InvalidInput {
            reason: reason.into(),
        }
    }
}

pub type MeasureResult<T> = Result<T, MeasureError>;
