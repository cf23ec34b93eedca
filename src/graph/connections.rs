use clap::ValueEnum;

use super::node::NodeId;

/// Rule deciding which existing balloons a freshly added balloon links to besides its parent.
///
/// `Full` links every new balloon with every balloon that already exists, so the number of
/// connections grows quadratically over a session. `ParentOnly` keeps just the tree edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ConnectionPolicy {
    #[default]
    Full,
    ParentOnly,
}

impl ConnectionPolicy {
    pub(super) fn related<'a>(
        self,
        parent: NodeId,
        existing: impl Iterator<Item = &'a NodeId>,
    ) -> Vec<NodeId> {
        match self {
            Self::Full => existing.copied().collect(),
            Self::ParentOnly => vec![parent],
        }
    }
}
