mod connections;
mod node;
mod rehydrate;
mod store;

pub use connections::ConnectionPolicy;
pub use node::{Node, NodeId};
pub use rehydrate::RestoredBalloon;
pub use store::GraphStore;

/// Caller errors reported by [`GraphStore`]. A failing operation never mutates the store.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("a root balloon already exists ({0})")]
    RootExists(NodeId),
    #[error("unknown parent balloon {0}")]
    UnknownParent(NodeId),
    #[error("unknown balloon {0}")]
    UnknownNode(NodeId),
    #[error("{} stored balloons could not be attached to the tree", .0.len())]
    UnresolvedRecords(Vec<NodeId>),
}
