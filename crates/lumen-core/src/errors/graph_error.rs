/// Knowledge graph errors.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("entity not found: {name}")]
    EntityNotFound { name: String },

    #[error("invalid graph query: {reason}")]
    InvalidQuery { reason: String },

    #[error("relation strength out of range for {source_entity} -> {target_entity}: {strength}")]
    StrengthOutOfRange {
        source_entity: String,
        target_entity: String,
        strength: f64,
    },
}
