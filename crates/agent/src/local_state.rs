use std::{fs, path::Path};

use api_types::AgentId;
use review::AgentContext;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const DEFAULT_STATE_PATH: &str = "config/agent_session.json";

/// Identity left on disk by the login flow; read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalState {
    pub user: Option<StoredUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: AgentId,
    #[serde(default)]
    pub name: Option<String>,
}

impl LocalState {
    pub fn load(path: &str) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let parent = Path::new(path).parent();
        if let Some(parent) = parent {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload)?;
        Ok(())
    }

    /// Agent to review as: `override_id` wins over the stored user.
    pub fn agent_context(&self, override_id: Option<AgentId>) -> Option<AgentContext> {
        match (override_id, &self.user) {
            (Some(id), Some(user)) if user.id == id => Some(with_name(id, user.name.as_deref())),
            (Some(id), _) => Some(AgentContext::new(id)),
            (None, Some(user)) => Some(with_name(user.id, user.name.as_deref())),
            (None, None) => None,
        }
    }

    /// Remembers `agent_id`, keeping the stored name when the agent is the same.
    pub fn remember(&mut self, agent_id: AgentId) -> bool {
        if self.user.as_ref().is_some_and(|user| user.id == agent_id) {
            return false;
        }
        self.user = Some(StoredUser {
            id: agent_id,
            name: None,
        });
        true
    }
}

fn with_name(id: AgentId, name: Option<&str>) -> AgentContext {
    match name {
        Some(name) => AgentContext::new(id).with_display_name(name),
        None => AgentContext::new(id),
    }
}

pub fn default_state_path() -> &'static str {
    DEFAULT_STATE_PATH
}
