/// Failures of the progress core. `NotFound` is an expected outcome of a
/// read, not something callers should retry; `Store` aborts the whole
/// operation with no partial write visible.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Course progress not found for this user")]
    NotFound,
    #[error("Invalid progress payload: {0}")]
    Validation(String),
    #[error("Store failure: {0}")]
    Store(#[source] anyhow::Error),
}
