use thiserror::Error;

/// Conditions that abort a harvest run instead of degrading to "no data"
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("review {id} has malformed date {value:?}")]
    InvalidDate {
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("review is missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("review field `{field}` has unexpected value {value}")]
    UnexpectedType { field: &'static str, value: String },

    #[error("malformed review record: {0}")]
    MalformedReview(#[from] serde_json::Error),
}
