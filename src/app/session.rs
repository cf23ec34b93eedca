use anyhow::Result;
use eframe::egui::{self, Color32, Context};

use crate::store::Identity;
use crate::util::unix_millis;

use super::{Services, ViewModel};

impl Services {
    /// Shows `message` in the status bar until it is dismissed or replaced.
    pub(in crate::app) fn report(&mut self, message: String) {
        log::warn!("{message}");
        self.status = Some(message);
    }

    pub(in crate::app) fn persist(&mut self, what: &str, result: Result<()>) {
        if let Err(error) = result {
            log::error!("failed to save {what}: {error:#}");
            self.status = Some(format!("Could not save {what}: {error:#}"));
        }
    }

    /// Asks for an API configuration before anything can be requested.
    pub(in crate::app) fn require_settings(&mut self) {
        self.status = Some("Please configure the API first.".to_owned());
        self.settings.open = true;
    }

    pub(in crate::app) fn start_session(&mut self, identity: Identity) -> Option<ViewModel> {
        let session = match self.store.create_session(identity, unix_millis()) {
            Ok(session) => session,
            Err(error) => {
                self.report(format!("Could not start a session: {error:#}"));
                return None;
            }
        };
        log::info!("started {} as {}", session.id, identity.label());

        let saved = self.store.set_selected_identity(identity);
        self.persist("the selected companion", saved);
        let saved = self.store.set_active_session(&session.id);
        self.persist("the active session", saved);

        match ViewModel::fresh(session, self.policy) {
            Ok(model) => Some(model),
            Err(error) => {
                self.report(format!("Could not start a session: {error}"));
                None
            }
        }
    }

    pub(in crate::app) fn draw_status(&mut self, ctx: &Context) {
        let Some(message) = self.status.clone() else {
            return;
        };

        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(Color32::from_rgb(190, 60, 72), message);
                    if ui.small_button("Dismiss").clicked() {
                        self.status = None;
                    }
                });
            });
    }
}
