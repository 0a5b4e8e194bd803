//! Error types for graph construction, partition mutation and the
//! multiplex drivers.

use core::fmt;

/// Error raised by fallible operations in this crate.
///
/// Read-only accessors taking vertex, edge or community indices panic on
/// out-of-bounds input instead (see the `**Panics**` sections on each
/// method); only construction and mutation report errors by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunityError {
    /// An input vector has the wrong length for the graph, or a value is
    /// outside its allowed domain (negative, NaN or infinite weight where
    /// disallowed, membership entry out of range, NaN resolution, malformed
    /// null model).
    InputShape(&'static str),
    /// A vertex or community index passed to a fallible operation exceeds
    /// the valid bound.
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The exclusive upper bound it was checked against.
        bound: usize,
    },
    /// A random neighbour was requested for a vertex without neighbours.
    IsolatedNode(usize),
    /// A multiplex operation was invoked with an empty list of layers.
    EmptyLayers,
    /// The layers of a multiplex operation disagree on the vertex count.
    LayerMismatch {
        /// Vertex count of the first layer.
        expected: usize,
        /// Vertex count of the offending layer.
        actual: usize,
    },
}

impl fmt::Display for CommunityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CommunityError::InputShape(msg) => write!(f, "{msg}"),
            CommunityError::IndexOutOfRange { index, bound } => {
                write!(f, "index {index} out of range for bound {bound}")
            }
            CommunityError::IsolatedNode(v) => {
                write!(f, "cannot select a random neighbour for isolated node {v}")
            }
            CommunityError::EmptyLayers => write!(f, "no partitions provided"),
            CommunityError::LayerMismatch { expected, actual } => {
                write!(
                    f,
                    "number of nodes is not equal for all layers: expected {expected}, got {actual}"
                )
            }
        }
    }
}

impl std::error::Error for CommunityError {}
