use anyhow::Result;

mod chat;
mod jobs;
mod parse;

pub use chat::ChatCompletionsProvider;
pub use jobs::{Job, JobEvent, SolutionJobs};
use parse::parse_solutions;

pub const MAX_SOLUTIONS: usize = 5;

/// Substituted when a response yields no usable line.
pub const DEFAULT_SOLUTIONS: [&str; MAX_SOLUTIONS] = [
    "Look at it from another angle",
    "Ask a friend for help",
    "Give yourself some time",
    "Do something you enjoy",
    "Keep a positive outlook",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    /// A problem typed by the user.
    Problem(String),
    /// Ask for more specific follow-ups to an existing solution.
    Refine(String),
}

impl Prompt {
    pub fn instruction(&self) -> String {
        match self {
            Self::Problem(problem) => format!(
                "Someone is dealing with something frustrating. Suggest 3-5 practical solutions. \
                 Describe each one in a single short sentence (at most 20 words), one per line, \
                 without numbering or any other commentary.\n\nTheir problem: {problem}"
            ),
            Self::Refine(solution) => format!(
                "Building on the solution \"{solution}\", suggest 3-5 related, more specific \
                 solutions. Describe each one in a single short sentence, one per line, without \
                 numbering or any other commentary."
            ),
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Self::Problem(text) | Self::Refine(text) => text,
        }
    }
}

/// Produces candidate solutions for a prompt. `on_partial` receives the accumulated response
/// text whenever more of it arrives.
pub trait SolutionProvider: Send + Sync {
    fn request_solutions(
        &self,
        prompt: &Prompt,
        on_partial: &mut dyn FnMut(&str),
    ) -> Result<Vec<String>>;

    fn check_connection(&self) -> Result<String>;
}

pub fn with_fallback(solutions: Vec<String>) -> Vec<String> {
    if solutions.is_empty() {
        log::warn!("no solutions could be parsed, using the default set");
        DEFAULT_SOLUTIONS.iter().map(|text| (*text).to_owned()).collect()
    } else {
        solutions
    }
}

/// Offline provider answering from the default set without touching the network.
pub struct CannedProvider;

impl SolutionProvider for CannedProvider {
    fn request_solutions(
        &self,
        prompt: &Prompt,
        on_partial: &mut dyn FnMut(&str),
    ) -> Result<Vec<String>> {
        let (offset, count) = match prompt {
            Prompt::Problem(_) => (0, MAX_SOLUTIONS),
            Prompt::Refine(text) => {
                let length = text.chars().count();
                (length % MAX_SOLUTIONS, 3 + length % 3)
            }
        };

        let mut streamed = String::new();
        for index in 0..count {
            let line = DEFAULT_SOLUTIONS[(offset + index) % MAX_SOLUTIONS];
            if !streamed.is_empty() {
                streamed.push('\n');
            }
            streamed.push_str(line);
            on_partial(&streamed);
        }

        Ok(with_fallback(parse_solutions(&streamed)))
    }

    fn check_connection(&self) -> Result<String> {
        Ok("offline mode, no network in use".to_owned())
    }
}
