use std::collections::{BTreeSet, HashSet, VecDeque};

use super::connections::ConnectionPolicy;
use super::node::NodeId;
use super::store::GraphStore;
use super::GraphError;

/// A persisted balloon as read back from the local store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoredBalloon {
    pub id: NodeId,
    pub text: String,
    pub parent_id: NodeId,
}

impl GraphStore {
    /// Rebuilds a session graph from stored balloons.
    ///
    /// The root is the one parent id that is not itself stored; `fallback_root` is used when
    /// nothing was stored. Balloons are replayed parents-first through the same linking rule
    /// as [`GraphStore::add_children`]. Every node starts at the origin; callers scatter them.
    pub fn rehydrate(
        policy: ConnectionPolicy,
        root_text: impl Into<String>,
        records: impl IntoIterator<Item = RestoredBalloon>,
        fallback_root: NodeId,
    ) -> Result<Self, GraphError> {
        let mut seen = HashSet::new();
        let mut pending = VecDeque::new();
        for record in records {
            if seen.insert(record.id) {
                pending.push_back(record);
            } else {
                log::warn!("ignoring duplicate stored balloon {}", record.id);
            }
        }

        let orphan_parents = pending
            .iter()
            .map(|record| record.parent_id)
            .filter(|parent| !seen.contains(parent))
            .collect::<BTreeSet<_>>();

        let root_id = match (pending.is_empty(), orphan_parents.len()) {
            (true, _) => fallback_root,
            (false, 1) => orphan_parents.into_iter().next().unwrap_or(fallback_root),
            (false, _) => {
                return Err(GraphError::UnresolvedRecords(
                    pending.iter().map(|record| record.id).collect(),
                ));
            }
        };

        let mut graph = GraphStore::new(policy);
        graph.insert_root(root_id, root_text.into());
        if let NodeId::Balloon(counter) = root_id {
            graph.resume_counter_after(counter);
        }

        while !pending.is_empty() {
            let before = pending.len();
            for _ in 0..before {
                let Some(record) = pending.pop_front() else {
                    break;
                };
                if graph.contains(record.parent_id) {
                    if let NodeId::Balloon(counter) = record.id {
                        graph.resume_counter_after(counter);
                    }
                    graph.insert_linked(record.id, record.text, record.parent_id, Default::default());
                } else {
                    pending.push_back(record);
                }
            }

            if pending.len() == before {
                return Err(GraphError::UnresolvedRecords(
                    pending.iter().map(|record| record.id).collect(),
                ));
            }
        }

        log::info!("restored {} balloons under {root_id}", graph.len() - 1);
        Ok(graph)
    }
}
