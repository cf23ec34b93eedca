use eframe::egui::epaint::CubicBezierShape;
use eframe::egui::{
    Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2, pos2, vec2,
};

use crate::graph::{GraphStore, NodeId};

use super::feedback::Pulse;

pub(in crate::app) const CARD_FONT_SIZE: f32 = 13.0;
pub(in crate::app) const CARD_PADDING: f32 = 14.0;
pub(in crate::app) const CARD_TEXT_TOP: f32 = 12.0;
pub(in crate::app) const CARD_LINE_HEIGHT: f32 = 16.0;
pub(in crate::app) const CARD_MAX_LINES: usize = 3;
const CARD_ROUNDING: f32 = 12.0;
const ACCENT_WIDTH: f32 = 5.0;
const DOT_SPACING: f32 = 40.0;
const MAX_EDGE_ARC: f32 = 60.0;

pub(in crate::app) const BACKGROUND: Color32 = Color32::from_rgb(255, 247, 250);
pub(in crate::app) const ROOT_ACCENT: Color32 = Color32::from_rgb(255, 159, 67);
pub(in crate::app) const BALLOON_ACCENT: Color32 = Color32::from_rgb(236, 112, 159);
pub(in crate::app) const SEARCH_OUTLINE: Color32 = Color32::from_rgb(90, 160, 245);
const CARD_FILL: Color32 = Color32::from_rgb(255, 255, 255);
const CARD_BORDER: Color32 = Color32::from_rgb(240, 208, 222);
const CARD_TEXT: Color32 = Color32::from_rgb(64, 48, 58);
const EDGE_COLOR: Color32 = Color32::from_rgba_premultiplied(118, 71, 94, 150);

#[derive(Clone, Copy, Default)]
pub(in crate::app) struct CardHighlight {
    pub hovered: bool,
    pub matched: bool,
}

pub(in crate::app) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(in crate::app) fn draw_background(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let dot = Color32::from_rgba_unmultiplied(236, 150, 190, 40);
    let mut y = rect.top() + DOT_SPACING * 0.5;
    while y < rect.bottom() {
        let mut x = rect.left() + DOT_SPACING * 0.5;
        while x < rect.right() {
            painter.circle_filled(pos2(x, y), 1.5, dot);
            x += DOT_SPACING;
        }
        y += DOT_SPACING;
    }
}

/// Parentless balloons first, everything else after; ties keep id order.
pub(in crate::app) fn draw_order(graph: &GraphStore) -> Vec<NodeId> {
    let mut order = graph
        .all()
        .map(|node| (node.parent_id.is_some(), node.id))
        .collect::<Vec<_>>();
    order.sort_by_key(|(has_parent, _)| *has_parent);
    order.into_iter().map(|(_, id)| id).collect()
}

/// S-shaped cubic: both control points sit at the horizontal midpoint, one raised above the
/// start and one lowered below the end by `min(distance / 4, 60)`.
pub(in crate::app) fn edge_control_points(from: Pos2, to: Pos2) -> [Pos2; 4] {
    let delta = to - from;
    let bend = (delta.length() * 0.25).min(MAX_EDGE_ARC);
    let mid_x = from.x + delta.x * 0.5;
    [from, pos2(mid_x, from.y - bend), pos2(mid_x, to.y + bend), to]
}

pub(in crate::app) fn draw_edge(painter: &Painter, from: Pos2, to: Pos2) {
    painter.add(CubicBezierShape::from_points_stroke(
        edge_control_points(from, to),
        false,
        Color32::TRANSPARENT,
        Stroke::new(2.0, EDGE_COLOR),
    ));
}

pub(in crate::app) fn draw_card(
    painter: &Painter,
    rect: Rect,
    lines: &[String],
    is_root: bool,
    highlight: CardHighlight,
) {
    let accent = if is_root { ROOT_ACCENT } else { BALLOON_ACCENT };

    painter.rect_filled(
        rect.translate(vec2(0.0, 3.0)),
        CARD_ROUNDING,
        Color32::from_rgba_unmultiplied(120, 60, 90, 28),
    );
    let fill = if highlight.hovered {
        blend_color(CARD_FILL, accent, 0.10)
    } else {
        CARD_FILL
    };
    painter.rect_filled(rect, CARD_ROUNDING, fill);

    let bar = Rect::from_min_size(rect.min, vec2(ACCENT_WIDTH, rect.height()));
    painter.rect_filled(bar, CARD_ROUNDING.min(ACCENT_WIDTH), accent);

    let border = if highlight.matched {
        Stroke::new(2.5, SEARCH_OUTLINE)
    } else if highlight.hovered {
        Stroke::new(1.5, accent)
    } else {
        Stroke::new(1.0, CARD_BORDER)
    };
    painter.rect_stroke(rect, CARD_ROUNDING, border, StrokeKind::Inside);

    let font = FontId::proportional(CARD_FONT_SIZE);
    for (index, line) in lines.iter().enumerate() {
        painter.text(
            rect.min + vec2(CARD_PADDING, CARD_TEXT_TOP + index as f32 * CARD_LINE_HEIGHT),
            Align2::LEFT_TOP,
            line,
            font.clone(),
            CARD_TEXT,
        );
    }
}

pub(in crate::app) fn draw_pulse(painter: &Painter, offset: Vec2, pulse: Pulse) {
    let alpha = (pulse.alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    painter.circle_stroke(
        pulse.center + offset,
        pulse.radius,
        Stroke::new(3.0, Color32::from_rgba_unmultiplied(236, 112, 159, alpha)),
    );
}

/// Greedy word wrap, falling back to character breaks for words wider than a line (and for
/// scripts that do not separate words with spaces). A cut-off last line ends with `…`.
pub(in crate::app) fn wrap_text(
    text: &str,
    max_width: f32,
    max_lines: usize,
    measure: impl Fn(&str) -> f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_owned()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_owned();
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if current.chars().count() > 1 && measure(&current) > max_width {
                current.pop();
                lines.push(std::mem::replace(&mut current, ch.to_string()));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && measure(&format!("{last}…")) > max_width {
                last.pop();
            }
            let kept = last.trim_end().to_owned();
            *last = format!("{kept}…");
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConnectionPolicy, RestoredBalloon};

    fn monospace(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn words_wrap_within_the_width() {
        let lines = wrap_text("take a short walk outside", 100.0, 3, monospace);
        assert_eq!(lines, vec!["take a", "short walk", "outside"]);
    }

    #[test]
    fn unspaced_text_breaks_by_character() {
        let lines = wrap_text("先散步十分钟再回来工作", 40.0, 3, monospace);
        assert_eq!(lines, vec!["先散步十", "分钟再回", "来工作"]);
    }

    #[test]
    fn overflow_is_capped_with_an_ellipsis() {
        let lines = wrap_text("one two three four five six seven", 50.0, 3, monospace);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "thre…");
        assert!(lines.iter().all(|line| monospace(line) <= 50.0));
        assert!(wrap_text("   ", 50.0, 3, monospace).is_empty());
    }

    #[test]
    fn roots_are_drawn_before_children() {
        let mut graph = GraphStore::new(ConnectionPolicy::Full);
        let root = graph
            .create_root("Start here", Pos2::ZERO, 1)
            .expect("empty graph")
            .id;
        let children = graph.add_children(root, ["a", "b"]).expect("root exists");

        let order = draw_order(&graph);
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], root);
        assert_eq!(&order[1..], children.as_slice());
    }

    #[test]
    fn a_root_with_a_later_id_still_draws_first() {
        let root = NodeId::Balloon(9);
        let graph = GraphStore::rehydrate(
            ConnectionPolicy::Full,
            "Start here",
            [1, 2].map(|id| RestoredBalloon {
                id: NodeId::Balloon(id),
                text: format!("idea {id}"),
                parent_id: root,
            }),
            NodeId::Initial(1),
        )
        .expect("valid records");

        assert_eq!(
            draw_order(&graph),
            vec![root, NodeId::Balloon(1), NodeId::Balloon(2)]
        );
    }

    #[test]
    fn edges_bend_into_a_capped_s_curve() {
        let from = pos2(0.0, 0.0);
        let to = pos2(40.0, 0.0);
        let [start, first, second, end] = edge_control_points(from, to);
        assert_eq!((start, end), (from, to));
        assert_eq!(first, pos2(20.0, -10.0));
        assert_eq!(second, pos2(20.0, 10.0));

        let [_, up, down, _] = edge_control_points(pos2(100.0, 200.0), pos2(1100.0, 300.0));
        assert_eq!(up, pos2(600.0, 140.0));
        assert_eq!(down, pos2(600.0, 360.0));

        let same = edge_control_points(from, from);
        assert!(same.iter().all(|point| *point == from));
    }
}
