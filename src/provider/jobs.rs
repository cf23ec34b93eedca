use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::graph::NodeId;

use super::{Prompt, SolutionProvider};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub parent: NodeId,
    pub prompt: Prompt,
}

#[derive(Debug)]
pub enum JobEvent {
    Started(Job),
    Partial(String),
    Finished {
        job: Job,
        result: Result<Vec<String>, String>,
    },
}

enum WorkerMessage {
    Partial(String),
    Done(Result<Vec<String>, String>),
}

struct InFlight {
    job: Job,
    rx: Receiver<WorkerMessage>,
}

/// First-in first-out queue of solution requests. One background worker runs at a time, so
/// batches land in the order the requests were made.
#[derive(Default)]
pub struct SolutionJobs {
    queue: VecDeque<Job>,
    in_flight: Option<InFlight>,
}

impl SolutionJobs {
    pub fn enqueue(&mut self, job: Job) {
        log::debug!("queued request for {} ({} waiting)", job.parent, self.queue.len());
        self.queue.push_back(job);
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || !self.queue.is_empty()
    }

    pub fn waiting(&self) -> usize {
        self.queue.len()
    }

    /// Drains worker messages and starts the next queued job once the current one finished.
    pub fn poll(&mut self, provider: &Arc<dyn SolutionProvider>) -> Vec<JobEvent> {
        let mut events = Vec::new();

        loop {
            if self.in_flight.is_none() {
                let Some(job) = self.queue.pop_front() else {
                    break;
                };
                events.push(JobEvent::Started(job.clone()));
                self.in_flight = Some(Self::spawn(job, provider));
            }

            let Some(flight) = self.in_flight.as_ref() else {
                break;
            };

            let mut outcome = None;
            loop {
                match flight.rx.try_recv() {
                    Ok(WorkerMessage::Partial(text)) => events.push(JobEvent::Partial(text)),
                    Ok(WorkerMessage::Done(result)) => {
                        outcome = Some(result);
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        outcome = Some(Err("solution worker disconnected".to_owned()));
                        break;
                    }
                }
            }

            let Some(result) = outcome else {
                break;
            };
            if let Some(flight) = self.in_flight.take() {
                events.push(JobEvent::Finished {
                    job: flight.job,
                    result,
                });
            }
        }

        events
    }

    fn spawn(job: Job, provider: &Arc<dyn SolutionProvider>) -> InFlight {
        let (tx, rx) = mpsc::channel();
        let provider = Arc::clone(provider);
        let prompt = job.prompt.clone();

        thread::spawn(move || {
            let partial_tx = tx.clone();
            let mut forward = |text: &str| {
                let _ = partial_tx.send(WorkerMessage::Partial(text.to_owned()));
            };
            let result = provider
                .request_solutions(&prompt, &mut forward)
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(WorkerMessage::Done(result));
        });

        InFlight { job, rx }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use anyhow::{Result, bail};

    use super::*;
    use crate::provider::CannedProvider;

    struct CountingProvider {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SolutionProvider for CountingProvider {
        fn request_solutions(
            &self,
            prompt: &Prompt,
            on_partial: &mut dyn FnMut(&str),
        ) -> Result<Vec<String>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            on_partial(prompt.subject());
            self.active.fetch_sub(1, Ordering::SeqCst);
            if prompt.subject() == "fail" {
                bail!("provider refused");
            }
            Ok(vec![prompt.subject().to_owned()])
        }

        fn check_connection(&self) -> Result<String> {
            Ok("ok".to_owned())
        }
    }

    fn drain(jobs: &mut SolutionJobs, provider: &Arc<dyn SolutionProvider>) -> Vec<JobEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while jobs.is_busy() {
            assert!(Instant::now() < deadline, "jobs did not finish");
            events.extend(jobs.poll(provider));
            thread::sleep(Duration::from_millis(2));
        }
        events
    }

    fn job(parent: u64, subject: &str) -> Job {
        Job {
            parent: NodeId::Balloon(parent),
            prompt: Prompt::Refine(subject.to_owned()),
        }
    }

    #[test]
    fn jobs_run_one_at_a_time_in_request_order() {
        let counting = Arc::new(CountingProvider {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let provider: Arc<dyn SolutionProvider> = counting.clone();
        let mut jobs = SolutionJobs::default();
        jobs.enqueue(job(1, "first"));
        jobs.enqueue(job(2, "fail"));
        jobs.enqueue(job(3, "third"));
        assert_eq!(jobs.waiting(), 3);

        let finished = drain(&mut jobs, &provider)
            .into_iter()
            .filter_map(|event| match event {
                JobEvent::Finished { job, result } => Some((job.parent, result)),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(counting.peak.load(Ordering::SeqCst), 1);
        assert_eq!(finished.len(), 3);
        assert_eq!(finished[0], (NodeId::Balloon(1), Ok(vec!["first".to_owned()])));
        assert_eq!(finished[1].0, NodeId::Balloon(2));
        assert!(finished[1].1.as_ref().is_err_and(|error| error.contains("refused")));
        assert_eq!(finished[2].0, NodeId::Balloon(3));
    }

    #[test]
    fn partial_text_arrives_before_the_result() {
        let provider: Arc<dyn SolutionProvider> = Arc::new(CannedProvider);
        let mut jobs = SolutionJobs::default();
        jobs.enqueue(Job {
            parent: NodeId::Initial(1),
            prompt: Prompt::Problem("stuck".to_owned()),
        });

        let events = drain(&mut jobs, &provider);

        assert!(matches!(events.first(), Some(JobEvent::Started(_))));
        assert!(events.iter().any(|event| matches!(event, JobEvent::Partial(_))));
        assert!(matches!(
            events.last(),
            Some(JobEvent::Finished { result: Ok(solutions), .. }) if solutions.len() == 5
        ));
    }
}
