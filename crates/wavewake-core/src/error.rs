use thiserror::Error;

/// Failures raised while assembling the gesture core
///
/// Event processing itself never fails; anything that can go wrong with the
/// platform is detected when the service is built.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no proximity sensor available: {0}")]
    SensorUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
