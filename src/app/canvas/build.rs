use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use eframe::egui::{Context, Pos2, Vec2};

use crate::graph::{ConnectionPolicy, GraphError, GraphStore, NodeId, RestoredBalloon};
use crate::layout::{LayoutConfig, place_children};
use crate::provider::{Job, JobEvent, Prompt, SolutionJobs};
use crate::store::{ConversationTurn, Role, SessionRecord, SolutionRecord};
use crate::util::{truncate_chars, unix_millis};

use super::super::feedback::FeedbackAnimator;
use super::super::{ROOT_TEXT, Services, ViewModel};

impl ViewModel {
    fn with_graph(
        session: SessionRecord,
        graph: GraphStore,
        conversation: Vec<ConversationTurn>,
    ) -> Self {
        Self {
            session,
            graph,
            layout: LayoutConfig::default(),
            canvas: Vec2::ZERO,
            needs_scatter: true,
            wrapped: HashMap::new(),
            conversation,
            streaming: None,
            problem: String::new(),
            search: String::new(),
            search_match_cache: None,
            feedback: FeedbackAnimator::default(),
            pulse_for: None,
            jobs: SolutionJobs::default(),
        }
    }

    pub(in crate::app) fn fresh(
        session: SessionRecord,
        policy: ConnectionPolicy,
    ) -> Result<Self, GraphError> {
        let mut graph = GraphStore::new(policy);
        graph.create_root(ROOT_TEXT, Pos2::ZERO, session.created_at)?;
        Ok(Self::with_graph(session, graph, Vec::new()))
    }

    /// Rebuilds a stored session. Positions are scattered on the first frame, once the canvas
    /// size is known.
    pub(in crate::app) fn resume(session: SessionRecord, services: &Services) -> Result<Self> {
        let records = services.store.solutions(&session.id)?;
        let conversation = services.store.conversations(&session.id)?;
        let graph = GraphStore::rehydrate(
            services.policy,
            ROOT_TEXT,
            records.into_iter().map(RestoredBalloon::from),
            NodeId::Initial(session.created_at),
        )?;
        log::info!(
            "resumed {} with {} balloons and {} turns",
            session.id,
            graph.len(),
            conversation.len()
        );
        Ok(Self::with_graph(session, graph, conversation))
    }

    fn record_turn(&mut self, role: Role, content: String, services: &mut Services) {
        let turn = ConversationTurn {
            role,
            content,
            created_at: unix_millis(),
        };
        let saved = services
            .store
            .append_conversation(&self.session.id, turn.clone());
        services.persist("the conversation", saved);
        self.conversation.push(turn);
    }

    /// Sends a typed problem to the provider; its solutions grow from the root.
    pub(in crate::app) fn submit_problem(&mut self, services: &mut Services) {
        let problem = self.problem.trim().to_owned();
        if problem.is_empty() {
            return;
        }
        if services.provider.is_none() {
            services.require_settings();
            return;
        }
        let Some(root) = self.graph.root().map(|node| node.id) else {
            return;
        };

        self.problem.clear();
        self.record_turn(Role::User, problem.clone(), services);
        self.jobs.enqueue(Job {
            parent: root,
            prompt: Prompt::Problem(problem),
        });
    }

    /// Asks for more specific solutions below `id` and starts the click pulse on its card.
    pub(in crate::app) fn expand(&mut self, id: NodeId, now: f64, services: &mut Services) {
        if services.provider.is_none() {
            services.require_settings();
            return;
        }
        let Some(node) = self.graph.get(id) else {
            return;
        };

        log::info!("expanding {id}: {}", truncate_chars(&node.text, 40));
        self.pulse_for = Some((id, self.feedback.start(node.position, now)));
        self.jobs.enqueue(Job {
            parent: id,
            prompt: Prompt::Refine(node.text.clone()),
        });
    }

    pub(in crate::app) fn pump_jobs(&mut self, ctx: &Context, services: &mut Services) {
        let Some(provider) = services.provider.clone() else {
            return;
        };

        let events = self.jobs.poll(&provider);
        self.apply_job_events(events, services);

        if self.jobs.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }

    pub(in crate::app) fn apply_job_events(&mut self, events: Vec<JobEvent>, services: &mut Services) {
        for event in events {
            match event {
                JobEvent::Started(job) => {
                    log::info!("requesting solutions for {}", job.parent);
                    self.streaming = Some(String::new());
                }
                JobEvent::Partial(text) => self.streaming = Some(text),
                JobEvent::Finished { job, result } => {
                    self.streaming = None;
                    match result {
                        Ok(solutions) => self.insert_batch(job.parent, &solutions, services),
                        Err(error) => {
                            if let Some((clicked, token)) = self.pulse_for
                                && clicked == job.parent
                            {
                                self.feedback.cancel(token);
                                self.pulse_for = None;
                            }
                            services.report(format!(
                                "Failed to generate solutions, check the API settings ({error})"
                            ));
                        }
                    }
                }
            }
        }
    }

    /// Adds one balloon per solution under `parent`, places them, and saves them with a
    /// summary turn.
    pub(in crate::app) fn insert_batch(
        &mut self,
        parent: NodeId,
        solutions: &[String],
        services: &mut Services,
    ) {
        let ids = match self
            .graph
            .add_children(parent, solutions.iter().map(String::as_str))
        {
            Ok(ids) => ids,
            Err(error) => {
                services.report(format!("Could not add solutions: {error}"));
                return;
            }
        };
        if let Err(error) = place_children(&mut self.graph, parent, &ids, self.canvas, &self.layout) {
            log::warn!("could not place new balloons: {error}");
        }

        let now = unix_millis();
        for (&id, text) in ids.iter().zip(solutions) {
            let saved = services.store.append_solution(
                &self.session.id,
                SolutionRecord {
                    balloon_id: id,
                    solution_text: text.clone(),
                    parent_balloon_id: parent,
                    created_at: now,
                },
            );
            services.persist("a balloon", saved);
        }
        log::info!("added {} balloons under {parent}", ids.len());

        let summary = format!(
            "Found {} solutions:\n{}",
            solutions.len(),
            solutions.join("\n")
        );
        self.record_turn(Role::Assistant, summary, services);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use eframe::egui::vec2;

    use super::*;
    use crate::app::SettingsWindow;
    use crate::provider::{CannedProvider, SolutionProvider};
    use crate::store::{Identity, LocalStore};

    fn services(provider: Option<Arc<dyn SolutionProvider>>) -> Services {
        Services {
            store: LocalStore::in_memory(),
            provider,
            offline: false,
            policy: ConnectionPolicy::Full,
            settings: SettingsWindow::default(),
            status: None,
        }
    }

    fn session(services: &mut Services) -> SessionRecord {
        services
            .store
            .create_session(Identity::Rabbit, 1_000)
            .expect("in-memory store")
    }

    #[test]
    fn inserted_batches_are_placed_and_saved() {
        let mut services = services(None);
        let mut model = ViewModel::fresh(session(&mut services), ConnectionPolicy::Full)
            .expect("fresh graph");
        model.canvas = vec2(800.0, 600.0);
        let root = model.graph.root().map(|node| node.id).expect("root");

        let solutions = ["a", "b", "c"].map(str::to_owned);
        model.insert_batch(root, &solutions, &mut services);

        assert_eq!(model.graph.len(), 4);
        let margin = model.layout.margin();
        assert!(model.graph.all().filter(|node| !node.is_root()).all(|node| {
            node.position.x >= margin
                && node.position.x <= 800.0 - margin
                && node.position.y >= margin
                && node.position.y <= 600.0 - margin
        }));

        let stored = services.store.solutions(&model.session.id).expect("readable");
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|record| record.parent_balloon_id == root));
        let turns = services.store.conversations(&model.session.id).expect("readable");
        assert_eq!(turns.len(), 1);
        assert!(turns[0].content.starts_with("Found 3 solutions"));
        assert_eq!(model.conversation, turns);
    }

    #[test]
    fn stored_sessions_come_back() {
        let mut services = services(None);
        let session = session(&mut services);
        let mut model =
            ViewModel::fresh(session.clone(), ConnectionPolicy::Full).expect("fresh graph");
        model.canvas = vec2(800.0, 600.0);
        let root = model.graph.root().map(|node| node.id).expect("root");
        model.insert_batch(root, &["walk".to_owned(), "rest".to_owned()], &mut services);

        let resumed = ViewModel::resume(session, &services).expect("stored session");

        assert_eq!(resumed.graph.len(), 3);
        assert_eq!(resumed.graph.root().map(|node| node.id), Some(root));
        assert_eq!(resumed.conversation.len(), 1);
        assert!(resumed.needs_scatter);
    }

    #[test]
    fn problems_need_a_provider_and_text() {
        let mut services = services(None);
        let mut model = ViewModel::fresh(session(&mut services), ConnectionPolicy::Full)
            .expect("fresh graph");

        model.problem = "   ".to_owned();
        model.submit_problem(&mut services);
        assert!(!services.settings.open);

        model.problem = "I cannot focus".to_owned();
        model.submit_problem(&mut services);
        assert!(services.settings.open);
        assert!(services.status.is_some());
        assert!(!model.jobs.is_busy());

        services.provider = Some(Arc::new(CannedProvider));
        model.submit_problem(&mut services);
        assert!(model.jobs.is_busy());
        assert!(model.problem.is_empty());
        assert_eq!(model.conversation.len(), 1);
        assert_eq!(model.conversation[0].role, Role::User);
    }

    #[test]
    fn expanding_pulses_on_the_clicked_balloon() {
        let mut services = services(Some(Arc::new(CannedProvider)));
        let mut model = ViewModel::fresh(session(&mut services), ConnectionPolicy::Full)
            .expect("fresh graph");
        let root = model.graph.root().map(|node| node.id).expect("root");
        let child = model
            .graph
            .add_children(root, ["stretch"])
            .expect("root exists")[0];
        model
            .graph
            .set_position(child, Pos2::new(320.0, 240.0))
            .expect("known id");

        model.expand(child, 5.0, &mut services);

        let pulse = model.feedback.frame(5.0).expect("pulse running");
        assert_eq!(pulse.center, Pos2::new(320.0, 240.0));
        assert!(model.jobs.is_busy());
    }

    #[test]
    fn failed_requests_surface_in_the_status_bar() {
        let mut services = services(None);
        let mut model = ViewModel::fresh(session(&mut services), ConnectionPolicy::Full)
            .expect("fresh graph");
        let root = model.graph.root().map(|node| node.id).expect("root");
        model.streaming = Some("partial".to_owned());

        model.apply_job_events(
            vec![JobEvent::Finished {
                job: Job {
                    parent: root,
                    prompt: Prompt::Problem("stuck".to_owned()),
                },
                result: Err("API request failed: 401".to_owned()),
            }],
            &mut services,
        );

        assert_eq!(model.graph.len(), 1);
        assert_eq!(model.streaming, None);
        assert!(services.status.as_deref().is_some_and(|status| status.contains("401")));
    }
}
