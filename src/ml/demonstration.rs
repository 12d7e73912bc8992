use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::ActionIndex;
use crate::error::AgentError;

/// Recorded human trajectory for one episode.
///
/// Only `human_actions` is required; the remaining fields are the session
/// metadata written alongside it and are ignored by training.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Demonstration {
    pub human_actions: Vec<ActionIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub robot_actions: Vec<ActionIndex>,
}

impl Demonstration {
    pub fn from_actions(human_actions: Vec<ActionIndex>) -> Self {
        Self {
            human_actions,
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, AgentError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn len(&self) -> usize {
        self.human_actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.human_actions.is_empty()
    }
}
