//! Action capture: turns page events into a coalesced action list
//!
//! Clicks are deduplicated, consecutive input into one field collapses into
//! a single `type` action that is updated in place, and Enter closes the
//! typing streak. Every change is mirrored to the display layer over a
//! bounded channel; a failed send is logged and otherwise ignored, the
//! in-memory list stays authoritative.

use crate::events::{Action, ActionData, Command, CommandResponse, Outbound};
use crate::timer::{TimerId, TimerQueue};
use actiontrace_core::selector::TEST_ID_ATTR;
use actiontrace_core::{generate_selector, Document, NodeId, Page};
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, TrySendError};
pub use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Tags that are clickable on their own
const CLICKABLE_TAGS: [&str; 3] = ["button", "a", "input"];

/// How the element credited with a click is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickTarget {
    /// Nearest clickable ancestor-or-self below body, else the raw target
    Clickable,
    /// Always the raw event target
    Raw,
}

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Inactivity after which a typing streak is closed
    pub typing_idle_ms: u64,
    /// Repeat clicks on the same target inside this window are dropped
    pub click_dedup_ms: u64,
    pub click_target: ClickTarget,
    /// Record a `keypress` action for Enter
    pub enter_keypress: bool,
    /// Outbound messages buffered for the display layer
    pub channel_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            typing_idle_ms: 3000,
            click_dedup_ms: 100,
            click_target: ClickTarget::Clickable,
            enter_keypress: true,
            channel_capacity: 1024,
        }
    }
}

impl RecorderConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid recorder config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Why an outbound message did not reach the display layer
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("outbound channel is full")]
    Full,
    #[error("display layer disconnected")]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Idle,
    Recording,
}

/// The ongoing, still mutable `type` action
#[derive(Debug, Clone)]
struct TypingStreak {
    index: usize,
    selector: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct LastClick {
    target: NodeId,
    at: u64,
}

/// State of one start..stop interval
#[derive(Debug, Default)]
pub struct RecordingSession {
    started_at: u64,
    actions: Vec<Action>,
    typing: Option<TypingStreak>,
    typing_element: Option<NodeId>,
    last_click: Option<LastClick>,
}

impl RecordingSession {
    fn new(started_at: u64) -> Self {
        Self {
            started_at,
            ..Default::default()
        }
    }

    fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }
}

pub struct ActionRecorder {
    config: RecorderConfig,
    state: RecorderState,
    session: RecordingSession,
    timers: TimerQueue<NodeId>,
    typing_timer: Option<TimerId>,
    tx: Sender<Outbound>,
}

impl ActionRecorder {
    /// Recorder plus the receiving end of its outbound channel
    pub fn new(config: RecorderConfig) -> (Self, Receiver<Outbound>) {
        let (tx, rx) = bounded(config.channel_capacity.max(1));
        (Self::with_sender(config, tx), rx)
    }

    pub fn with_sender(config: RecorderConfig, tx: Sender<Outbound>) -> Self {
        Self {
            config,
            state: RecorderState::Idle,
            session: RecordingSession::default(),
            timers: TimerQueue::new(),
            typing_timer: None,
            tx,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn actions(&self) -> &[Action] {
        &self.session.actions
    }

    /// Index of the `type` action still being updated, if any
    pub fn in_flight(&self) -> Option<usize> {
        self.session.typing.as_ref().map(|t| t.index)
    }

    // ========================================================================
    // Session control
    // ========================================================================

    pub fn start(&mut self, now: u64) {
        self.timers.clear();
        self.typing_timer = None;
        self.session = RecordingSession::new(now);
        self.state = RecorderState::Recording;
        info!("recording started");
    }

    /// Stop and return the finished list. When idle, returns the list as is.
    pub fn stop(&mut self) -> Vec<Action> {
        if self.state == RecorderState::Recording {
            self.timers.clear();
            self.typing_timer = None;
            self.state = RecorderState::Idle;
            info!(actions = self.session.actions.len(), "recording stopped");
        }
        self.session.actions.clone()
    }

    pub fn handle_command(&mut self, command: Command, now: u64) -> CommandResponse {
        match command {
            Command::StartRecording => {
                self.start(now);
                CommandResponse {
                    success: Some(true),
                    actions: None,
                }
            }
            Command::StopRecording => CommandResponse {
                success: Some(true),
                actions: Some(self.stop()),
            },
            Command::GetActions => CommandResponse {
                success: None,
                actions: Some(self.session.actions.clone()),
            },
        }
    }

    // ========================================================================
    // Event handlers
    // ========================================================================

    pub fn on_click(&mut self, page: &Page, target: NodeId, x: i32, y: i32, now: u64) {
        if !self.is_recording() {
            return;
        }
        let doc = &page.document;
        let resolved = match self.config.click_target {
            ClickTarget::Clickable => clickable_target(doc, target),
            ClickTarget::Raw => target,
        };

        if let Some(last) = self.session.last_click {
            if last.target == resolved && now.saturating_sub(last.at) < self.config.click_dedup_ms {
                debug!(elapsed = now.saturating_sub(last.at), "duplicate click suppressed");
                return;
            }
        }

        let text = match doc.get(resolved) {
            Some(_) => doc.text_content(resolved).trim().to_string(),
            None => String::new(),
        };
        let action = Action {
            timestamp: self.session.elapsed(now),
            url: page.url.clone(),
            selector: generate_selector(doc, resolved),
            data: ActionData::Click { x, y, text },
        };
        self.push(action);
        self.session.last_click = Some(LastClick {
            target: resolved,
            at: now,
        });
    }

    pub fn on_input(&mut self, page: &Page, target: NodeId, now: u64) {
        if !self.is_recording() {
            return;
        }
        let doc = &page.document;
        let value = input_value(doc, target);
        if value.trim().is_empty() {
            return;
        }

        self.session.typing_element = Some(target);
        self.cancel_typing_timer();

        let selector = generate_selector(doc, target);
        let timestamp = self.session.elapsed(now);
        let continuing = self
            .session
            .typing
            .as_ref()
            .filter(|streak| streak.selector == selector)
            .map(|streak| streak.index);

        match continuing {
            Some(index) => self.update_typed(index, value, timestamp),
            None => {
                let action = Action {
                    timestamp,
                    url: page.url.clone(),
                    selector: selector.clone(),
                    data: ActionData::Type {
                        value,
                        input_type: input_type(doc, target),
                    },
                };
                let index = self.push(action);
                self.session.typing = Some(TypingStreak { index, selector });
            }
        }

        let due = now.saturating_add(self.config.typing_idle_ms);
        self.typing_timer = Some(self.timers.schedule(due, target));
    }

    pub fn on_keydown(&mut self, page: &Page, target: NodeId, key: &str, now: u64) {
        if !self.is_recording() || key != "Enter" {
            return;
        }
        self.cancel_typing_timer();

        let doc = &page.document;
        let value = input_value(doc, target);
        let selector = generate_selector(doc, target);
        let input_type = input_type(doc, target);
        let timestamp = self.session.elapsed(now);

        if !value.trim().is_empty() {
            let continuing = self
                .session
                .typing
                .as_ref()
                .filter(|streak| streak.selector == selector)
                .map(|streak| streak.index);
            match continuing {
                Some(index) => self.update_typed(index, value, timestamp),
                None => {
                    self.push(Action {
                        timestamp,
                        url: page.url.clone(),
                        selector: selector.clone(),
                        data: ActionData::Type {
                            value,
                            input_type: input_type.clone(),
                        },
                    });
                }
            }
        }

        if self.config.enter_keypress {
            self.push(Action {
                timestamp,
                url: page.url.clone(),
                selector,
                data: ActionData::Keypress {
                    key: key.to_string(),
                    input_type,
                },
            });
        }

        self.session.typing = None;
        self.session.typing_element = None;
    }

    // ========================================================================
    // Timers
    // ========================================================================

    pub fn next_timer_due(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// Fire every timer due at or before `now`, returning how many fired
    pub fn fire_due_timers(&mut self, now: u64) -> usize {
        let mut fired = 0;
        while let Some((id, element)) = self.timers.pop_due(now) {
            fired += 1;
            if self.typing_timer == Some(id) {
                self.typing_timer = None;
            }
            if self.session.typing_element == Some(element) && self.session.typing.is_some() {
                debug!("typing streak closed after inactivity");
                self.session.typing = None;
            }
        }
        fired
    }

    fn cancel_typing_timer(&mut self) {
        if let Some(id) = self.typing_timer.take() {
            self.timers.cancel(id);
        }
    }

    // ========================================================================
    // List + transport
    // ========================================================================

    fn push(&mut self, action: Action) -> usize {
        let index = self.session.actions.len();
        debug!(index, kind = action.kind().name(), selector = ?action.selector, "action recorded");
        self.session.actions.push(action.clone());
        self.emit(Outbound::NewAction { data: action });
        index
    }

    fn update_typed(&mut self, index: usize, new_value: String, timestamp: u64) {
        let Some(action) = self.session.actions.get_mut(index) else {
            return;
        };
        if let ActionData::Type { value, .. } = &mut action.data {
            *value = new_value;
        }
        action.timestamp = timestamp;
        let data = action.clone();
        self.emit(Outbound::UpdateAction { data, index });
    }

    fn emit(&self, msg: Outbound) {
        match self.send(msg) {
            Ok(()) => {}
            Err(e @ TransportError::Full) => warn!("could not notify display layer: {}", e),
            Err(e @ TransportError::Disconnected) => debug!("could not notify display layer: {}", e),
        }
    }

    fn send(&self, msg: Outbound) -> std::result::Result<(), TransportError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Disconnected(_) => TransportError::Disconnected,
        })
    }
}

/// Nearest ancestor-or-self below body that looks clickable, else `target`
pub fn clickable_target(doc: &Document, target: NodeId) -> NodeId {
    let body = doc.body();
    doc.ancestors(target)
        .take_while(|n| *n != body)
        .find(|n| is_clickable(doc, *n))
        .unwrap_or(target)
}

fn is_clickable(doc: &Document, node: NodeId) -> bool {
    let Some(e) = doc.get(node) else {
        return false;
    };
    CLICKABLE_TAGS.contains(&e.tag())
        || e.has_click_handler()
        || e.attr("role") == Some("button")
        || e.non_empty_attr(TEST_ID_ATTR).is_some()
        || e.non_empty_attr("aria-label").is_some()
}

/// Current value of a form control, text of an editable element, else empty
pub fn input_value(doc: &Document, node: NodeId) -> String {
    match doc.get(node) {
        Some(e) => match e.value() {
            Some(v) => v.to_string(),
            None if e.is_content_editable() => doc.text_content(node),
            None => String::new(),
        },
        None => String::new(),
    }
}

fn input_type(doc: &Document, node: NodeId) -> String {
    doc.get(node)
        .map(|e| e.input_type())
        .unwrap_or_else(|| "text".to_string())
}
