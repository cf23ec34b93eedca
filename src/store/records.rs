use std::fmt;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::graph::{NodeId, RestoredBalloon};

use super::{KeyValueStore, MemoryStore};

const SELECTED_IDENTITY_KEY: &str = "selectedCharacter";
const ACTIVE_SESSION_KEY: &str = "currentSessionId";
const API_CONFIG_KEY: &str = "apiConfig";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Identity {
    Rabbit,
    Cat,
    Bear,
    Deer,
    Fox,
}

impl Identity {
    pub const ALL: [Self; 5] = [Self::Rabbit, Self::Cat, Self::Bear, Self::Deer, Self::Fox];

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Rabbit => "🐰",
            Self::Cat => "🐱",
            Self::Bear => "🐻",
            Self::Deer => "🦌",
            Self::Fox => "🦊",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Rabbit => "Rabbit",
            Self::Cat => "Cat",
            Self::Bear => "Bear",
            Self::Deer => "Deer",
            Self::Fox => "Fox",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub character: Identity,
    pub created_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub balloon_id: NodeId,
    pub solution_text: String,
    pub parent_balloon_id: NodeId,
    pub created_at: u64,
}

impl From<SolutionRecord> for RestoredBalloon {
    fn from(record: SolutionRecord) -> Self {
        Self {
            id: record.balloon_id,
            text: record.solution_text,
            parent_id: record.parent_balloon_id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub created_at: u64,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
}

impl ApiConfig {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("API URL", &self.api_url),
            ("API key", &self.api_key),
            ("model name", &self.model_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
        .collect()
    }

    pub fn trimmed(&self) -> Self {
        Self {
            api_url: self.api_url.trim().to_owned(),
            api_key: self.api_key.trim().to_owned(),
            model_name: self.model_name.trim().to_owned(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &format_args!("<{} chars>", self.api_key.len()))
            .field("model_name", &self.model_name)
            .finish()
    }
}

/// Typed view over a [`KeyValueStore`] holding identity, sessions, balloons, conversation
/// turns and the API configuration as JSON values.
pub struct LocalStore {
    backend: Box<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_strict(key) {
            Ok(value) => Ok(value),
            Err(error) if error.is::<serde_json::Error>() => {
                log::warn!("ignoring unreadable value under {key}: {error}");
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Like [`LocalStore::read`], but a value that does not decode is an error.
    fn read_strict<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("failed to encode value for {key}"))?;
        self.backend.set(key, &raw)
    }

    fn append<T: Serialize + DeserializeOwned>(&mut self, key: &str, item: T) -> Result<()> {
        // An unreadable list is left untouched rather than replaced by the new item alone.
        let mut items: Vec<T> = self
            .read_strict(key)
            .with_context(|| format!("refusing to append to unreadable {key}"))?
            .unwrap_or_default();
        items.push(item);
        self.write(key, &items)
    }

    pub fn selected_identity(&self) -> Result<Option<Identity>> {
        self.read(SELECTED_IDENTITY_KEY)
    }

    pub fn set_selected_identity(&mut self, identity: Identity) -> Result<()> {
        self.write(SELECTED_IDENTITY_KEY, &identity)
    }

    pub fn active_session(&self) -> Result<Option<String>> {
        self.read(ACTIVE_SESSION_KEY)
    }

    pub fn set_active_session(&mut self, session_id: &str) -> Result<()> {
        self.write(ACTIVE_SESSION_KEY, session_id)
    }

    pub fn create_session(&mut self, identity: Identity, now_ms: u64) -> Result<SessionRecord> {
        let record = SessionRecord {
            id: format!("session-{now_ms}"),
            character: identity,
            created_at: now_ms,
        };
        self.write(&format!("session_{}", record.id), &record)?;
        Ok(record)
    }

    pub fn session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        self.read(&format!("session_{session_id}"))
    }

    pub fn solutions(&self, session_id: &str) -> Result<Vec<SolutionRecord>> {
        Ok(self
            .read(&format!("solutions_{session_id}"))?
            .unwrap_or_default())
    }

    pub fn append_solution(&mut self, session_id: &str, record: SolutionRecord) -> Result<()> {
        self.append(&format!("solutions_{session_id}"), record)
    }

    pub fn conversations(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .read(&format!("conversations_{session_id}"))?
            .unwrap_or_default())
    }

    pub fn append_conversation(&mut self, session_id: &str, turn: ConversationTurn) -> Result<()> {
        self.append(&format!("conversations_{session_id}"), turn)
    }

    pub fn api_config(&self) -> Result<Option<ApiConfig>> {
        self.read(API_CONFIG_KEY)
    }

    pub fn set_api_config(&mut self, config: &ApiConfig) -> Result<()> {
        self.write(API_CONFIG_KEY, config)
    }
}
