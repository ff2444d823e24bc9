//! Rule table error types.

/// Errors raised while loading or compiling a rule table.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("invalid glob pattern `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("rule `{rule}`: cannot parse signature `{signature}`")]
    InvalidSignature { rule: String, signature: String },

    #[error("rule `{rule}`: action `{action}` requires a `parameter`")]
    MissingParameter { rule: String, action: String },

    #[error("rule table parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
