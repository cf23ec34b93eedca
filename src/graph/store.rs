use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Pos2;

use super::connections::ConnectionPolicy;
use super::node::{Node, NodeId};
use super::GraphError;

/// Owns every balloon of a session together with its tree and auxiliary links.
///
/// Nodes are kept in id order so iteration is deterministic: the root first, then
/// generated balloons in allocation order.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, Node>,
    last_balloon: u64,
    policy: ConnectionPolicy,
}

impl GraphStore {
    pub fn new(policy: ConnectionPolicy) -> Self {
        Self {
            nodes: BTreeMap::new(),
            last_balloon: 0,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn create_root(
        &mut self,
        text: impl Into<String>,
        position: Pos2,
        stamp: u64,
    ) -> Result<&Node, GraphError> {
        if let Some(existing) = self.root() {
            return Err(GraphError::RootExists(existing.id));
        }

        let id = NodeId::Initial(stamp);
        log::debug!("creating root balloon {id}");
        Ok(self.nodes.entry(id).or_insert(Node {
            id,
            position,
            text: text.into(),
            parent_id: None,
            connections: BTreeSet::new(),
        }))
    }

    /// Appends one child of `parent_id` per text. New balloons start on top of their parent;
    /// the layout engine moves them afterwards. An empty `texts` is a no-op.
    pub fn add_children<I, S>(&mut self, parent_id: NodeId, texts: I) -> Result<Vec<NodeId>, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origin = self
            .nodes
            .get(&parent_id)
            .map(|parent| parent.position)
            .ok_or(GraphError::UnknownParent(parent_id))?;

        let mut created = Vec::new();
        for text in texts {
            self.last_balloon += 1;
            let id = NodeId::Balloon(self.last_balloon);
            self.insert_linked(id, text.into(), parent_id, origin);
            created.push(id);
        }

        if !created.is_empty() {
            log::debug!(
                "added {} balloons under {parent_id}, graph now holds {}",
                created.len(),
                self.nodes.len()
            );
        }
        Ok(created)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Snapshot of every node in id order.
    pub fn all(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.values().find(|node| node.is_root())
    }

    pub fn set_position(&mut self, id: NodeId, position: Pos2) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        node.position = position;
        Ok(())
    }

    /// Positions in id order, matching [`GraphStore::all`].
    pub fn positions(&self) -> Vec<Pos2> {
        self.nodes.values().map(|node| node.position).collect()
    }

    pub fn positions_mut(&mut self) -> impl Iterator<Item = &mut Pos2> {
        self.nodes.values_mut().map(|node| &mut node.position)
    }

    pub(super) fn insert_linked(&mut self, id: NodeId, text: String, parent_id: NodeId, position: Pos2) {
        let mut connections = BTreeSet::from([parent_id]);
        connections.extend(self.policy.related(parent_id, self.nodes.keys()));

        for other in &connections {
            if let Some(node) = self.nodes.get_mut(other) {
                node.connections.insert(id);
            }
        }

        self.nodes.insert(
            id,
            Node {
                id,
                position,
                text,
                parent_id: Some(parent_id),
                connections,
            },
        );
    }

    pub(super) fn insert_root(&mut self, id: NodeId, text: String) {
        self.nodes.insert(
            id,
            Node {
                id,
                position: Pos2::ZERO,
                text,
                parent_id: None,
                connections: BTreeSet::new(),
            },
        );
    }

    pub(super) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(super) fn resume_counter_after(&mut self, counter: u64) {
        self.last_balloon = self.last_balloon.max(counter);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use eframe::egui::pos2;
    use proptest::prelude::*;

    use super::*;

    pub(crate) fn assert_tree(graph: &GraphStore) {
        let roots = graph.all().filter(|node| node.is_root()).count();
        assert_eq!(roots, 1, "exactly one root");
        let root = graph.root().expect("root").id;

        for node in graph.all() {
            let mut cursor = node.id;
            let mut steps = 0;
            while let Some(parent) = graph.get(cursor).and_then(|n| n.parent_id) {
                cursor = parent;
                steps += 1;
                assert!(steps <= graph.len(), "parent chain of {} loops", node.id);
            }
            assert_eq!(cursor, root, "{} does not reach the root", node.id);
        }
    }

    pub(crate) fn assert_symmetric(graph: &GraphStore) {
        for node in graph.all() {
            for other in &node.connections {
                let other = graph.get(*other).expect("connection target exists");
                assert!(
                    other.connections.contains(&node.id),
                    "{} -> {} is one-sided",
                    node.id,
                    other.id
                );
            }
        }
    }

    fn rooted(policy: ConnectionPolicy) -> (GraphStore, NodeId) {
        let mut graph = GraphStore::new(policy);
        let root = graph
            .create_root("Start here", pos2(400.0, 100.0), 7)
            .expect("first root")
            .id;
        (graph, root)
    }

    #[test]
    fn second_root_is_rejected_without_mutation() {
        let (mut graph, root) = rooted(ConnectionPolicy::Full);
        let err = graph
            .create_root("again", pos2(0.0, 0.0), 8)
            .expect_err("second root");

        assert_eq!(err, GraphError::RootExists(root));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn children_link_to_parent_and_every_prior_balloon() {
        let (mut graph, root) = rooted(ConnectionPolicy::Full);
        let ids = graph
            .add_children(root, ["a", "b", "c"])
            .expect("known parent");

        assert_eq!(ids, vec![NodeId::Balloon(1), NodeId::Balloon(2), NodeId::Balloon(3)]);
        for id in &ids {
            let node = graph.get(*id).expect("inserted");
            assert_eq!(node.parent_id, Some(root));
            assert_eq!(node.position, pos2(400.0, 100.0));
            let expected = graph
                .all()
                .map(|other| other.id)
                .filter(|other| other != id)
                .collect::<BTreeSet<_>>();
            assert_eq!(node.connections, expected);
        }
        assert_symmetric(&graph);
        assert_tree(&graph);
    }

    #[test]
    fn parent_only_policy_keeps_tree_edges() {
        let (mut graph, root) = rooted(ConnectionPolicy::ParentOnly);
        let first = graph.add_children(root, ["a", "b"]).expect("root");
        graph.add_children(first[0], ["c"]).expect("child");

        let c = graph.get(NodeId::Balloon(3)).expect("c");
        assert_eq!(c.connections, BTreeSet::from([first[0]]));
        let a = graph.get(first[0]).expect("a");
        assert_eq!(a.connections, BTreeSet::from([root, NodeId::Balloon(3)]));
        assert_symmetric(&graph);
    }

    #[test]
    fn unknown_parent_is_reported() {
        let (mut graph, _) = rooted(ConnectionPolicy::Full);
        let err = graph
            .add_children(NodeId::Balloon(42), ["x"])
            .expect_err("unknown parent");

        assert_eq!(err, GraphError::UnknownParent(NodeId::Balloon(42)));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn empty_batch_leaves_graph_unchanged() {
        let (mut graph, root) = rooted(ConnectionPolicy::Full);
        let created = graph
            .add_children(root, Vec::<String>::new())
            .expect("empty batch is fine");

        assert!(created.is_empty());
        assert_eq!(graph.len(), 1);
        assert!(graph.get(root).expect("root").connections.is_empty());
    }

    #[test]
    fn set_position_on_missing_node_fails() {
        let (mut graph, _) = rooted(ConnectionPolicy::Full);
        assert_eq!(
            graph.set_position(NodeId::Balloon(1), pos2(1.0, 1.0)),
            Err(GraphError::UnknownNode(NodeId::Balloon(1)))
        );
    }

    proptest! {
        #[test]
        fn growth_preserves_tree_symmetry_and_counts(
            batches in prop::collection::vec((any::<prop::sample::Index>(), 0usize..=5), 0..12),
            parent_only in any::<bool>(),
        ) {
            let policy = if parent_only { ConnectionPolicy::ParentOnly } else { ConnectionPolicy::Full };
            let (mut graph, _) = rooted(policy);

            for (pick, count) in batches {
                let ids = graph.all().map(|node| node.id).collect::<Vec<_>>();
                let parent = ids[pick.index(ids.len())];
                let before = graph.len();
                let texts = (0..count).map(|i| format!("idea {i}")).collect::<Vec<_>>();

                let created = graph.add_children(parent, texts).expect("parent exists");

                prop_assert_eq!(graph.len(), before + count);
                for id in created {
                    prop_assert_eq!(graph.get(id).and_then(|n| n.parent_id), Some(parent));
                }
            }

            assert_tree(&graph);
            assert_symmetric(&graph);
        }
    }
}
