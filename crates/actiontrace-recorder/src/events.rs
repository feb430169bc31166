//! Recorded actions, page events and the messages around them
//!
//! Field names match the trace format consumed by replay tooling.

use actiontrace_core::{Error, NodeId, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default `userAgent` written into exported traces
pub const DEFAULT_USER_AGENT: &str = concat!("actiontrace/", env!("CARGO_PKG_VERSION"));

/// One recorded interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Milliseconds since recording start
    pub timestamp: u64,
    /// Page URL when captured
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(flatten)]
    pub data: ActionData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionData {
    Click {
        x: i32,
        y: i32,
        text: String,
    },
    Type {
        value: String,
        #[serde(rename = "inputType")]
        input_type: String,
    },
    Keypress {
        key: String,
        #[serde(rename = "inputType")]
        input_type: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Type,
    Keypress,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self.data {
            ActionData::Click { .. } => ActionKind::Click,
            ActionData::Type { .. } => ActionKind::Type,
            ActionData::Keypress { .. } => ActionKind::Keypress,
        }
    }
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type => "type",
            Self::Keypress => "keypress",
        }
    }
}

/// A DOM event as dispatched to the page
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    Click { target: NodeId, x: i32, y: i32 },
    Input { target: NodeId },
    KeyDown { target: NodeId, key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Input,
    KeyDown,
}

impl DomEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Click { .. } => EventKind::Click,
            Self::Input { .. } => EventKind::Input,
            Self::KeyDown { .. } => EventKind::KeyDown,
        }
    }
}

/// Recorder to display layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Outbound {
    NewAction { data: Action },
    UpdateAction { data: Action, index: usize },
}

/// Display layer to recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    StartRecording,
    StopRecording,
    GetActions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<Action>>,
}

/// Exported trace file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub metadata: TraceMetadata,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceMetadata {
    pub recorded_at: DateTime<Utc>,
    pub total_actions: usize,
    pub user_agent: String,
}

impl Trace {
    pub fn new(actions: Vec<Action>, user_agent: impl Into<String>) -> Self {
        Self {
            metadata: TraceMetadata {
                recorded_at: Utc::now(),
                total_actions: actions.len(),
                user_agent: user_agent.into(),
            },
            actions,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::trace_invalid(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let trace: Trace =
            serde_json::from_str(json).map_err(|e| Error::trace_invalid(e.to_string()))?;
        if trace.metadata.total_actions != trace.actions.len() {
            tracing::warn!(
                declared = trace.metadata.total_actions,
                actual = trace.actions.len(),
                "trace metadata disagrees with action count"
            );
        }
        Ok(trace)
    }
}
