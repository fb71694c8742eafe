use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("a drag is already in progress for item {origin}")]
    DragInProgress { origin: usize },
    #[error("no drag is in progress")]
    NoActiveDrag,
    #[error("index {index} is out of range for a list of {len} items")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("drag layout has {layout} slots but the list holds {items} items")]
    LayoutMismatch { layout: usize, items: usize },
    #[error("a reorder batch is still being persisted")]
    PersistInFlight,
    #[error("failed to load categories: {source}")]
    Load { source: anyhow::Error },
}
