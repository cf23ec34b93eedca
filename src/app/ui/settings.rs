use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;

use eframe::egui::{self, Button, Color32, Context, TextEdit};

use crate::provider::{ChatCompletionsProvider, SolutionProvider};

use super::super::{Services, SettingsWindow, build_provider};

impl SettingsWindow {
    fn is_checking(&self) -> bool {
        self.check_rx.is_some()
    }

    fn start_check(&mut self) {
        let draft = self.draft.trimmed();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = ChatCompletionsProvider::new(&draft)
                .and_then(|provider| provider.check_connection())
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        self.check_result = None;
        self.check_rx = Some(rx);
    }

    fn poll_check(&mut self) {
        let Some(rx) = self.check_rx.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(result) => self.check_result = Some(result),
            Err(TryRecvError::Empty) => self.check_rx = Some(rx),
            Err(TryRecvError::Disconnected) => {
                self.check_result = Some(Err("connection test worker disconnected".to_owned()));
            }
        }
    }
}

impl Services {
    fn save_settings(&mut self) {
        let missing = self.settings.draft.missing_fields();
        if !missing.is_empty() {
            self.settings.check_result = Some(Err(format!("Please fill in: {}", missing.join(", "))));
            return;
        }

        let config = self.settings.draft.trimmed();
        if let Err(error) = self.store.set_api_config(&config) {
            self.report(format!("Could not save the API settings: {error:#}"));
            return;
        }
        log::info!("saved API settings for {}", config.api_url);

        self.provider = build_provider(self.offline, Some(&config));
        self.settings.draft = config;
        self.settings.check_result = None;
        self.settings.open = false;
        self.status = None;
    }

    pub(in crate::app) fn draw_settings(&mut self, ctx: &Context) {
        self.settings.poll_check();
        if self.settings.is_checking() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
        if !self.settings.open {
            return;
        }

        let mut open = true;
        let mut save = false;
        let mut test = false;
        let offline = self.offline;
        let settings = &mut self.settings;

        egui::Window::new("API settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                egui::Grid::new("api_settings")
                    .num_columns(2)
                    .spacing([10.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("API URL");
                        ui.add(
                            TextEdit::singleline(&mut settings.draft.api_url)
                                .hint_text("https://api.example.com/v1/chat/completions")
                                .desired_width(320.0),
                        );
                        ui.end_row();

                        ui.label("API key");
                        ui.add(
                            TextEdit::singleline(&mut settings.draft.api_key)
                                .password(true)
                                .desired_width(320.0),
                        );
                        ui.end_row();

                        ui.label("Model");
                        ui.add(
                            TextEdit::singleline(&mut settings.draft.model_name)
                                .hint_text("gpt-4o-mini")
                                .desired_width(320.0),
                        );
                        ui.end_row();
                    });

                if offline {
                    ui.weak("Offline mode: balloons come from built-in suggestions.");
                }
                ui.add_space(6.0);

                ui.horizontal(|ui| {
                    save = ui.button("Save").clicked();
                    test = ui
                        .add_enabled(!settings.is_checking(), Button::new("Test connection"))
                        .clicked();
                    if settings.is_checking() {
                        ui.spinner();
                    }
                });

                match &settings.check_result {
                    Some(Ok(message)) => {
                        ui.colored_label(Color32::from_rgb(46, 140, 87), message);
                    }
                    Some(Err(message)) => {
                        ui.colored_label(Color32::from_rgb(190, 60, 72), message);
                    }
                    None => {}
                }
            });

        if test {
            self.settings.start_check();
        }
        if save {
            self.save_settings();
        }
        if !open {
            self.settings.open = false;
        }
    }
}
