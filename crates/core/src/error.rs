use crate::availability::Rejection;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("business hours must satisfy 0 <= open < close <= 23, got {open}..{close}")]
    InvalidHours { open: u32, close: u32 },

    #[error("closed day must be 0 (Monday) to 6 (Sunday), got {0:?}")]
    InvalidWeekday(String),

    #[error("invalid service catalog: {0}")]
    Catalog(String),

    #[error("could not read catalog file: {0}")]
    CatalogIo(#[from] std::io::Error),

    #[error("could not parse catalog file: {0}")]
    CatalogParse(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another booking was confirmed for an overlapping interval first.
    #[error("slot is already taken")]
    SlotTaken,

    #[error("booking rejected: {0}")]
    Rejected(Rejection),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt booking row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },

    #[error("booking task did not finish: {0}")]
    Interrupted(String),
}
