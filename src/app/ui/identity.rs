use eframe::egui::{self, Button, Context, RichText};

use crate::store::Identity;

/// Full-window companion picker. Returns the identity clicked this frame.
pub(in crate::app) fn choose_identity(ctx: &Context) -> Option<Identity> {
    let mut chosen = None;

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(96.0);
            ui.heading("Who is with you today?");
            ui.label("Each companion starts a new session with its own balloons and conversation.");
            ui.add_space(18.0);

            for identity in Identity::ALL {
                let label = RichText::new(format!("{}  {}", identity.emoji(), identity.label()))
                    .size(18.0);
                if ui.add_sized([180.0, 44.0], Button::new(label)).clicked() {
                    chosen = Some(identity);
                }
                ui.add_space(6.0);
            }
        });
    });

    chosen
}
