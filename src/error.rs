use thiserror::Error;

/// Algorithmic failures a caller may want to match on. Returned wrapped in
/// `anyhow::Error`; recover with `err.downcast_ref::<MotifError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MotifError {
    #[error("Requested subgraph size must be greater than zero")]
    InvalidSize,

    #[error("No input graphs with nodes to sample from")]
    EmptyInput,

    #[error("No connected component with at least {requested} nodes (largest has {largest})")]
    NoLargeComponent { requested: usize, largest: usize },

    #[error("Unable to draw a connected subgraph of size {requested} within {attempts} attempts")]
    SamplingBudgetExhausted { requested: usize, attempts: usize },
}
