pub mod eligibility;
pub mod model;
pub mod ports;
pub mod provider;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}
