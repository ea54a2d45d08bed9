#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("exchange already terminal: {0}")]
    Terminal(String),

    #[error("store is closed")]
    Closed,
}
