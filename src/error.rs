/// Why a raw timestamp could not be turned into canonical text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("not a legacy datetime: {0}")]
    NoMatch(String),

    #[error("unknown month name: {0}")]
    UnknownMonth(String),

    #[error("invalid {field} value: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("element carries no datetime or data-title attribute")]
    NoSource,

    #[error("does not resolve to a point in time: {0}")]
    Unresolvable(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("document has no <body> to observe")]
    MissingRoot,

    #[error("reconciler is already observing; dispose it first")]
    AlreadyInitialized,
}
