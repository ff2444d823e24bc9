use thiserror::Error;

/// Fatal model-building failures.
///
/// Everything recoverable is reported through `Diagnostics` instead; these
/// indicate a defect in the builder itself.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Synthetic name {name} collides with an existing declaration in {scope}")]
    SyntheticNameCollision { scope: String, name: String },

    #[error("Expected a translation_unit root, got {kind}")]
    InvalidRoot { kind: String },
}
