use eframe::egui::{self, Align, Color32, Context, Key, Layout, RichText, TextEdit, Ui};

use crate::store::Role;

use super::super::{Services, ViewModel};

const STREAMING_PLACEHOLDER: &str = "Thinking of solutions...";

fn draw_turn(ui: &mut Ui, role: Role, content: &str) {
    let (label, fill) = match role {
        Role::User => ("You", Color32::from_rgb(255, 235, 243)),
        Role::Assistant => ("Balloons", Color32::from_rgb(243, 240, 255)),
    };

    egui::Frame::group(ui.style())
        .fill(fill)
        .corner_radius(8.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(label).small().strong());
            ui.label(content);
        });
    ui.add_space(4.0);
}

impl ViewModel {
    /// Draws one frame of the session. Returns true when the user asked for a new session.
    pub(in crate::app) fn show(&mut self, ctx: &Context, services: &mut Services) -> bool {
        self.pump_jobs(ctx, services);
        let mut new_session = false;

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(format!("{} Balloon map", self.session.character.emoji()));
                    ui.separator();
                    ui.label(format!("balloons: {}", self.graph.len()));
                    if self.jobs.is_busy() {
                        ui.spinner();
                        let waiting = self.jobs.waiting();
                        if waiting > 0 {
                            ui.label(format!("{waiting} more queued"));
                        }
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("Settings").clicked() {
                            services.settings.open = true;
                        }
                        if ui.button("New session").clicked() {
                            new_session = true;
                        }
                        ui.add(
                            TextEdit::singleline(&mut self.search)
                                .hint_text("Search balloons")
                                .desired_width(180.0),
                        );
                    });
                });
            });

        egui::TopBottomPanel::bottom("problem_input")
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(6.0);
                self.draw_problem_input(ui, services);
                ui.add_space(6.0);
            });

        services.draw_status(ctx);

        egui::SidePanel::right("conversation")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_conversation(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui, services));

        new_session
    }

    fn draw_problem_input(&mut self, ui: &mut Ui, services: &mut Services) {
        ui.horizontal(|ui| {
            let field = ui.add(
                TextEdit::singleline(&mut self.problem)
                    .hint_text("What is bothering you?")
                    .desired_width((ui.available_width() - 64.0).max(120.0)),
            );
            let entered = field.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            if ui.button("Ask").clicked() || entered {
                self.submit_problem(services);
                field.request_focus();
            }
        });
    }

    fn draw_conversation(&self, ui: &mut Ui) {
        ui.heading("Conversation");
        ui.separator();

        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for turn in &self.conversation {
                    draw_turn(ui, turn.role, &turn.content);
                }

                if let Some(text) = &self.streaming {
                    let shown = if text.trim().is_empty() {
                        STREAMING_PLACEHOLDER
                    } else {
                        text.as_str()
                    };
                    draw_turn(ui, Role::Assistant, shown);
                }

                if self.conversation.is_empty() && self.streaming.is_none() {
                    ui.weak("Nothing here yet.");
                }
            });
    }
}
