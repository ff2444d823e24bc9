//! Emitter and pipeline error types.

use sipgen_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("model build failed: {0}")]
    Model(#[from] ModelError),

    #[error("failed to format output: {0}")]
    Format(#[from] std::fmt::Error),
}
