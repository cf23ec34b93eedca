use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use eframe::egui::{self, Context, Vec2};

use crate::graph::{ConnectionPolicy, GraphStore, NodeId};
use crate::layout::LayoutConfig;
use crate::provider::{CannedProvider, ChatCompletionsProvider, SolutionJobs, SolutionProvider};
use crate::store::{ApiConfig, ConversationTurn, LocalStore, SessionRecord};

mod canvas;
mod feedback;
mod render_utils;
mod session;
mod ui;

use feedback::{AnimationToken, FeedbackAnimator};

const ROOT_TEXT: &str = "Start here";

/// Start-up options taken from the command line.
#[derive(Clone, Copy, Debug)]
pub struct Launch {
    pub offline: bool,
    pub policy: ConnectionPolicy,
}

pub struct BalloonMapApp {
    services: Services,
    state: AppState,
}

enum AppState {
    ChooseIdentity,
    Ready(Box<ViewModel>),
}

/// Everything that outlives a single session.
struct Services {
    store: LocalStore,
    provider: Option<Arc<dyn SolutionProvider>>,
    offline: bool,
    policy: ConnectionPolicy,
    settings: SettingsWindow,
    status: Option<String>,
}

#[derive(Default)]
struct SettingsWindow {
    open: bool,
    draft: ApiConfig,
    check_rx: Option<Receiver<Result<String, String>>>,
    check_result: Option<Result<String, String>>,
}

struct ViewModel {
    session: SessionRecord,
    graph: GraphStore,
    layout: LayoutConfig,
    canvas: Vec2,
    needs_scatter: bool,
    wrapped: HashMap<NodeId, Vec<String>>,
    conversation: Vec<ConversationTurn>,
    streaming: Option<String>,
    problem: String,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    feedback: FeedbackAnimator,
    pulse_for: Option<(NodeId, AnimationToken)>,
    jobs: SolutionJobs,
}

struct SearchMatchCache {
    query: String,
    node_count: usize,
    matches: Arc<HashSet<NodeId>>,
}

fn build_provider(offline: bool, config: Option<&ApiConfig>) -> Option<Arc<dyn SolutionProvider>> {
    if offline {
        return Some(Arc::new(CannedProvider));
    }

    match ChatCompletionsProvider::new(config?) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(error) => {
            log::warn!("stored API configuration is unusable: {error:#}");
            None
        }
    }
}

impl BalloonMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>, store: LocalStore, launch: Launch) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        let api_config = store.api_config().unwrap_or_else(|error| {
            log::warn!("could not read the API configuration: {error:#}");
            None
        });
        let mut services = Services {
            provider: build_provider(launch.offline, api_config.as_ref()),
            offline: launch.offline,
            policy: launch.policy,
            settings: SettingsWindow {
                open: api_config.is_none() && !launch.offline,
                draft: api_config.unwrap_or_default(),
                ..Default::default()
            },
            status: None,
            store,
        };

        let state = match Self::resume(&mut services) {
            Some(model) => AppState::Ready(Box::new(model)),
            None => AppState::ChooseIdentity,
        };

        Self { services, state }
    }

    fn resume(services: &mut Services) -> Option<ViewModel> {
        let stored = services
            .store
            .selected_identity()
            .and_then(|identity| Ok((identity, services.store.active_session()?)));
        let (identity, session_id) = match stored {
            Ok((Some(identity), Some(session_id))) => (identity, session_id),
            Ok(_) => return None,
            Err(error) => {
                services.report(format!("Could not read the last session: {error:#}"));
                return None;
            }
        };

        let session = services
            .store
            .session(&session_id)
            .ok()
            .flatten()
            .unwrap_or(SessionRecord {
                id: session_id,
                character: identity,
                created_at: 0,
            });

        match ViewModel::resume(session, services) {
            Ok(model) => Some(model),
            Err(error) => {
                services.report(format!("Could not restore the last session: {error:#}"));
                None
            }
        }
    }
}

impl eframe::App for BalloonMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::ChooseIdentity => {
                self.services.draw_status(ctx);
                if let Some(identity) = ui::choose_identity(ctx)
                    && let Some(model) = self.services.start_session(identity)
                {
                    transition = Some(AppState::Ready(Box::new(model)));
                }
            }
            AppState::Ready(model) => {
                if model.show(ctx, &mut self.services) {
                    transition = Some(AppState::ChooseIdentity);
                }
            }
        }

        self.services.draw_settings(ctx);

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
