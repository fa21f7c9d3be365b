use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownAction,
    MissingMethod,
    ActionFailed,
    InvalidConfig,
    InvalidDocument,
}

/// Failures surfaced by interaction engines and registries.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// A step referenced an action that is neither live in the context nor
    /// registered. Raised while the engine is being constructed.
    #[error("There is no action named {name}")]
    UnknownAction { name: String },

    /// A step fired and its resolved action has no method of that name.
    #[error("Action({action}) doesn't have a method called {method}")]
    MissingMethod { action: String, method: String },

    #[error("Action({action}) failed in {method}: {message}")]
    ActionFailed {
        action: String,
        method: String,
        message: String,
    },

    #[error("invalid configuration for action {action}: {source}")]
    InvalidConfig {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid interaction document: {message}")]
    InvalidDocument { message: String },
}

impl InteractionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            InteractionError::UnknownAction { .. } => ErrorCode::UnknownAction,
            InteractionError::MissingMethod { .. } => ErrorCode::MissingMethod,
            InteractionError::ActionFailed { .. } => ErrorCode::ActionFailed,
            InteractionError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            InteractionError::InvalidDocument { .. } => ErrorCode::InvalidDocument,
        }
    }

    pub fn unknown_action(name: impl Into<String>) -> Self {
        Self::UnknownAction { name: name.into() }
    }

    pub fn missing_method(action: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MissingMethod {
            action: action.into(),
            method: method.into(),
        }
    }

    /// Lifts an [`ActionError`] raised by `action.method` into the engine's
    /// taxonomy.
    pub fn from_action(action: &str, method: &str, err: ActionError) -> Self {
        match err {
            ActionError::UnknownMethod => Self::missing_method(action, method),
            ActionError::Failed(message) => Self::ActionFailed {
                action: action.to_string(),
                method: method.to_string(),
                message,
            },
        }
    }
}

impl From<toml::de::Error> for InteractionError {
    fn from(value: toml::de::Error) -> Self {
        Self::InvalidDocument {
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for InteractionError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidDocument {
            message: value.to_string(),
        }
    }
}

/// Failures reported by an action's own method table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("no such method")]
    UnknownMethod,
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
