use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::Pos2;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::{GraphStore, NodeId};
use crate::layout::LayoutConfig;
use crate::util::fuzzy_match_score;

use super::super::{SearchMatchCache, ViewModel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ClickAction {
    Miss,
    RootNoop(NodeId),
    Expand(NodeId),
}

/// The topmost card under `point`, walking `order` from the last drawn card backwards.
pub(in crate::app) fn hit_test(
    graph: &GraphStore,
    order: &[NodeId],
    point: Pos2,
    config: &LayoutConfig,
) -> Option<NodeId> {
    let half = config.card_size * 0.5;
    order.iter().rev().copied().find(|&id| {
        graph.get(id).is_some_and(|node| {
            let offset = point - node.position;
            offset.x.abs() <= half.x && offset.y.abs() <= half.y
        })
    })
}

pub(in crate::app) fn classify_click(
    graph: &GraphStore,
    order: &[NodeId],
    point: Pos2,
    config: &LayoutConfig,
) -> ClickAction {
    let Some(id) = hit_test(graph, order, point, config) else {
        return ClickAction::Miss;
    };

    let is_root = graph.get(id).is_some_and(|node| node.is_root());
    if is_root || id.is_initial() {
        ClickAction::RootNoop(id)
    } else {
        ClickAction::Expand(id)
    }
}

impl ViewModel {
    /// Balloons whose text fuzzy-matches the search box, cached until the query or the
    /// balloon count changes.
    pub(in crate::app) fn search_matches(&mut self) -> Option<Arc<HashSet<NodeId>>> {
        let query = self.search.trim();
        if query.is_empty() || self.graph.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.node_count == self.graph.len()
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .graph
            .all()
            .filter(|node| fuzzy_match_score(&matcher, &node.text, query).is_some())
            .map(|node| node.id)
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            node_count: self.graph.len(),
            matches: Arc::clone(&matches),
        });
        Some(matches)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;
    use crate::app::render_utils::draw_order;
    use crate::graph::ConnectionPolicy;

    fn graph_with_children() -> (GraphStore, NodeId, Vec<NodeId>) {
        let mut graph = GraphStore::new(ConnectionPolicy::Full);
        let root = graph
            .create_root("Start here", pos2(400.0, 100.0), 7)
            .expect("empty graph")
            .id;
        let children = graph.add_children(root, ["near", "far"]).expect("root exists");
        graph
            .set_position(children[0], pos2(450.0, 120.0))
            .expect("known id");
        graph
            .set_position(children[1], pos2(700.0, 400.0))
            .expect("known id");
        (graph, root, children)
    }

    #[test]
    fn clicking_the_root_does_nothing() {
        let (graph, root, _) = graph_with_children();
        let order = draw_order(&graph);
        let config = LayoutConfig::default();

        assert_eq!(
            classify_click(&graph, &order, pos2(340.0, 70.0), &config),
            ClickAction::RootNoop(root)
        );
        assert_eq!(
            classify_click(&graph, &order, pos2(20.0, 20.0), &config),
            ClickAction::Miss
        );
    }

    #[test]
    fn overlapping_cards_resolve_to_the_one_drawn_last() {
        let (graph, _, children) = graph_with_children();
        let order = draw_order(&graph);
        let config = LayoutConfig::default();

        assert_eq!(
            classify_click(&graph, &order, pos2(430.0, 110.0), &config),
            ClickAction::Expand(children[0])
        );
        assert_eq!(hit_test(&graph, &order, pos2(770.0, 440.0), &config), Some(children[1]));
        assert_eq!(hit_test(&graph, &order, pos2(771.0, 440.0), &config), None);
    }
}
