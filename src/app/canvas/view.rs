use eframe::egui::{self, Align2, Color32, FontId, Painter, Sense, Ui};

use crate::layout::{relax_graph, scatter};

use super::super::render_utils::{
    CARD_FONT_SIZE, CARD_MAX_LINES, CARD_PADDING, CardHighlight, draw_background, draw_card,
    draw_edge, draw_order, draw_pulse, wrap_text,
};
use super::super::{Services, ViewModel};
use super::interaction::{ClickAction, classify_click, hit_test};

impl ViewModel {
    fn refresh_wrapped(&mut self, painter: &Painter) {
        let max_width = self.layout.card_size.x - 2.0 * CARD_PADDING;
        let font = FontId::proportional(CARD_FONT_SIZE);
        let measure = |text: &str| {
            painter
                .layout_no_wrap(text.to_owned(), font.clone(), Color32::BLACK)
                .size()
                .x
        };

        for node in self.graph.all() {
            self.wrapped
                .entry(node.id)
                .or_insert_with(|| wrap_text(&node.text, max_width, CARD_MAX_LINES, &measure));
        }
    }

    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui, services: &mut Services) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click());
        let painter = ui.painter_at(rect);
        let origin = rect.min.to_vec2();
        self.canvas = rect.size();

        if self.needs_scatter {
            scatter(&mut self.graph, self.canvas, &self.layout, &mut rand::thread_rng());
            self.needs_scatter = false;
        }
        let relaxed = relax_graph(&mut self.graph, self.canvas, &self.layout);

        draw_background(&painter, rect);

        for node in self.graph.all() {
            if let Some(parent) = node.parent_id.and_then(|id| self.graph.get(id)) {
                draw_edge(&painter, parent.position + origin, node.position + origin);
            }
        }

        let order = draw_order(&self.graph);
        let hovered = response
            .hover_pos()
            .and_then(|pointer| hit_test(&self.graph, &order, pointer - origin, &self.layout));
        let matches = self.search_matches();
        self.refresh_wrapped(&painter);

        for id in &order {
            let Some(node) = self.graph.get(*id) else {
                continue;
            };
            let lines = self.wrapped.get(id).map(Vec::as_slice).unwrap_or_default();
            let highlight = CardHighlight {
                hovered: hovered == Some(*id),
                matched: matches.as_ref().is_some_and(|found| found.contains(id)),
            };
            draw_card(
                &painter,
                self.layout.card_rect(node.position).translate(origin),
                lines,
                node.is_root(),
                highlight,
            );
        }

        if self.graph.len() == 1 {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Describe what is bothering you below to grow the first balloons",
                FontId::proportional(15.0),
                Color32::from_rgb(170, 130, 150),
            );
        }

        let expandable = hovered.is_some_and(|id| {
            self.graph
                .get(id)
                .is_some_and(|node| !node.is_root() && !id.is_initial())
        });
        if expandable {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        let now = ui.input(|input| input.time);
        if response.clicked()
            && let Some(pointer) = response.interact_pointer_pos()
        {
            let point = pointer - origin;
            match classify_click(&self.graph, &order, point, &self.layout) {
                ClickAction::Miss => {}
                ClickAction::RootNoop(id) => log::debug!("ignoring click on root {id}"),
                ClickAction::Expand(id) => self.expand(id, now, services),
            }
        }

        if let Some(pulse) = self.feedback.frame(now) {
            draw_pulse(&painter, origin, pulse);
            ui.ctx().request_repaint();
        }

        if relaxed.moved {
            ui.ctx().request_repaint();
        }
    }
}
