use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use eframe::egui::Pos2;
use serde::{Deserialize, Serialize};

const INITIAL_PREFIX: &str = "initial-";
const BALLOON_PREFIX: &str = "balloon-";

/// Identity of a balloon. The root carries the `initial-` marker and a creation stamp,
/// generated balloons a monotonically increasing counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeId {
    Initial(u64),
    Balloon(u64),
}

impl NodeId {
    pub fn is_initial(self) -> bool {
        matches!(self, Self::Initial(_))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial(stamp) => write!(f, "{INITIAL_PREFIX}{stamp}"),
            Self::Balloon(counter) => write!(f, "{BALLOON_PREFIX}{counter}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed balloon id {0:?}")]
pub struct ParseNodeIdError(String);

impl FromStr for NodeId {
    type Err = ParseNodeIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parse = |digits: &str| {
            digits
                .parse::<u64>()
                .map_err(|_| ParseNodeIdError(value.to_owned()))
        };

        if let Some(stamp) = value.strip_prefix(INITIAL_PREFIX) {
            parse(stamp).map(Self::Initial)
        } else if let Some(counter) = value.strip_prefix(BALLOON_PREFIX) {
            parse(counter).map(Self::Balloon)
        } else {
            Err(ParseNodeIdError(value.to_owned()))
        }
    }
}

impl TryFrom<String> for NodeId {
    type Error = ParseNodeIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.to_string()
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub position: Pos2,
    pub text: String,
    pub parent_id: Option<NodeId>,
    pub connections: BTreeSet<NodeId>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::NodeId;

    #[test]
    fn ids_render_with_their_marker_and_parse_back() {
        let root: NodeId = "initial-1729000000000".parse().expect("root id");
        let balloon: NodeId = "balloon-12".parse().expect("balloon id");

        assert_eq!(root, NodeId::Initial(1_729_000_000_000));
        assert_eq!(balloon, NodeId::Balloon(12));
        assert_eq!(balloon.to_string(), "balloon-12");
        assert!(root.is_initial());
        assert!(!balloon.is_initial());
    }

    #[test]
    fn foreign_ids_are_rejected() {
        assert!("session-4".parse::<NodeId>().is_err());
        assert!("balloon-".parse::<NodeId>().is_err());
        assert!("balloon-x1".parse::<NodeId>().is_err());
    }

    #[test]
    fn ids_serialize_as_strings() {
        let json = serde_json::to_string(&NodeId::Balloon(3)).expect("serialize");
        assert_eq!(json, "\"balloon-3\"");
        let back: NodeId = serde_json::from_str("\"initial-9\"").expect("deserialize");
        assert_eq!(back, NodeId::Initial(9));
    }
}
