//! Declarative, data-only form of an interaction's steps.
//!
//! Documents carry everything a step can express without code: triggers,
//! `name:method` action references, the once flag and timing policy. Inline
//! callbacks, enable predicates and post-hooks only exist programmatically.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{domain::StepName, error::InteractionError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_enable: Option<Vec<StepDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Vec<StepDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing: Option<Vec<StepDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Vec<StepDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback: Option<Vec<StepDocument>>,
}

impl InteractionDocument {
    pub fn from_toml_str(raw: &str) -> Result<Self, InteractionError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, InteractionError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn phase(&self, name: StepName) -> Option<&[StepDocument]> {
        let steps = match name {
            StepName::ShowEnable => &self.show_enable,
            StepName::Start => &self.start,
            StepName::Processing => &self.processing,
            StepName::End => &self.end,
            StepName::Rollback => &self.rollback,
        };
        steps.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDocument {
    pub trigger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionReference>,
    #[serde(default)]
    pub once: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce: Option<DebounceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<ThrottleOption>,
}

/// The `action` field of a step document.
///
/// Values that are neither a string nor a list of strings are kept as
/// `Unsupported`; such steps never fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionReference {
    Single(String),
    Many(Vec<String>),
    Unsupported(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceOption {
    /// Quiet window in milliseconds.
    pub wait: u64,
    #[serde(default)]
    pub immediate: bool,
}

impl DebounceOption {
    pub fn wait_duration(&self) -> Duration {
        Duration::from_millis(self.wait)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleOption {
    /// Window length in milliseconds.
    pub wait: u64,
    #[serde(default = "enabled")]
    pub leading: bool,
    #[serde(default = "enabled")]
    pub trailing: bool,
}

impl ThrottleOption {
    pub fn new(wait: u64) -> Self {
        Self {
            wait,
            leading: true,
            trailing: true,
        }
    }

    pub fn wait_duration(&self) -> Duration {
        Duration::from_millis(self.wait)
    }
}

fn enabled() -> bool {
    true
}
