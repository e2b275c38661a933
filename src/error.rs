//! VofTopoError: unified error type for vof-topo public APIs.
//!
//! Used throughout the crate so that fallible operations surface a single,
//! non-panicking error enum. Recoverable conditions (empty label groups,
//! zero-length mesh segments) are handled by skipping work and never reach
//! this type.

use thiserror::Error;

/// Unified error type for vof-topo operations.
#[derive(Debug, Error)]
pub enum VofTopoError {
    /// Scalar/vector component count did not match the grid cell count.
    #[error("array `{name}` has {got} tuples, grid has {want} cells")]
    ArrayLengthMismatch {
        name: &'static str,
        got: usize,
        want: usize,
    },
    /// The two snapshots of an epoch disagree on grid resolution.
    #[error("snapshot resolution mismatch: {0:?} vs {1:?}")]
    ResolutionMismatch([usize; 3], [usize; 3]),
    /// A per-axis coordinate array was too short to form any cell.
    #[error("axis {axis} has {nodes} nodes; at least 2 required")]
    DegenerateAxis { axis: usize, nodes: usize },
    /// Failure in the rank-to-rank message layer.
    #[error("communication with rank {neighbor} failed: {source}")]
    CommError {
        neighbor: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A collective returned fewer contributions than there are ranks.
    #[error("all-gather expected {want} contributions, got {got}")]
    IncompleteGather { want: usize, got: usize },
}
