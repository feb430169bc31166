//! Display-side mirror of a recording
//!
//! Keeps its own copy of the action list from outbound messages, can be
//! resynced from a `getActions`/`stopRecording` response, and renders the
//! list for humans or exports it as a trace.

use crate::events::{Action, ActionData, Outbound, Trace};
use crate::recorder::Receiver;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct TracePanel {
    actions: Vec<Action>,
}

impl TracePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Apply one message. Updates for an index we never saw are dropped.
    pub fn apply(&mut self, msg: Outbound) -> bool {
        match msg {
            Outbound::NewAction { data } => {
                self.actions.push(data);
                true
            }
            Outbound::UpdateAction { data, index } => match self.actions.get_mut(index) {
                Some(slot) => {
                    *slot = data;
                    true
                }
                None => {
                    debug!(index, len = self.actions.len(), "update for unknown action dropped");
                    false
                }
            },
        }
    }

    /// Apply everything waiting on `rx` without blocking
    pub fn drain(&mut self, rx: &Receiver<Outbound>) -> usize {
        let mut applied = 0;
        while let Ok(msg) = rx.try_recv() {
            if self.apply(msg) {
                applied += 1;
            }
        }
        applied
    }

    /// Replace the local list with the recorder's authoritative one
    pub fn sync(&mut self, actions: Vec<Action>) {
        self.actions = actions;
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// One line per action: time, type, details, selector
    pub fn render(&self) -> Vec<String> {
        self.actions.iter().map(render_line).collect()
    }

    /// Trace for download, `None` when there is nothing to export
    pub fn export(&self, user_agent: &str) -> Option<Trace> {
        if self.actions.is_empty() {
            return None;
        }
        Some(Trace::new(self.actions.clone(), user_agent))
    }
}

pub fn render_line(action: &Action) -> String {
    let mut line = format!(
        "{}  {:<8} {}",
        format_time(action.timestamp),
        action.kind().name(),
        describe(action)
    );
    if let Some(selector) = action.selector.as_deref().filter(|s| !s.is_empty()) {
        line.push_str("  ");
        line.push_str(selector);
    }
    line
}

/// `mm:ss` from milliseconds
pub fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn describe(action: &Action) -> String {
    match &action.data {
        ActionData::Click { text, .. } if text.is_empty() => "Clicked on element".to_string(),
        ActionData::Click { text, .. } => format!("Clicked on \"{}\"", text),
        ActionData::Type { value, .. } => format!("Typed: \"{}\"", value),
        ActionData::Keypress { key, .. } => format!("Pressed key: {}", key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn click(ts: u64, text: &str, selector: Option<&str>) -> Action {
        Action {
            timestamp: ts,
            url: "https://example.com/".to_string(),
            selector: selector.map(str::to_string),
            data: ActionData::Click { x: 0, y: 0, text: text.to_string() },
        }
    }

    fn typed(ts: u64, value: &str) -> Action {
        Action {
            timestamp: ts,
            url: "https://example.com/".to_string(),
            selector: Some("#q".to_string()),
            data: ActionData::Type { value: value.to_string(), input_type: "text".to_string() },
        }
    }

    #[test]
    fn update_replaces_existing_entry() {
        let mut panel = TracePanel::new();
        assert!(panel.apply(Outbound::NewAction { data: typed(100, "a") }));
        assert!(panel.apply(Outbound::UpdateAction { data: typed(300, "ab"), index: 0 }));
        assert_eq!(panel.actions(), &[typed(300, "ab")]);
    }

    #[test]
    fn update_to_unknown_index_is_dropped() {
        let mut panel = TracePanel::new();
        assert!(!panel.apply(Outbound::UpdateAction { data: typed(300, "ab"), index: 4 }));
        assert!(panel.is_empty());
    }

    #[test]
    fn drain_applies_in_order() {
        let (tx, rx) = unbounded();
        tx.send(Outbound::NewAction { data: typed(1, "a") }).unwrap();
        tx.send(Outbound::NewAction { data: click(2, "Go", None) }).unwrap();
        tx.send(Outbound::UpdateAction { data: typed(3, "ab"), index: 0 }).unwrap();
        tx.send(Outbound::UpdateAction { data: typed(3, "ab"), index: 9 }).unwrap();

        let mut panel = TracePanel::new();
        assert_eq!(panel.drain(&rx), 3);
        assert_eq!(panel.len(), 2);
        assert_eq!(panel.actions()[0], typed(3, "ab"));
    }

    #[test]
    fn renders_like_the_action_list() {
        let mut panel = TracePanel::new();
        panel.sync(vec![
            click(65_000, "Sign in", Some("button.primary")),
            click(1_000, "", Some("")),
            typed(2_500, "rust"),
            Action {
                timestamp: 3_000,
                url: "u".to_string(),
                selector: Some("#q".to_string()),
                data: ActionData::Keypress { key: "Enter".to_string(), input_type: "text".to_string() },
            },
        ]);
        assert_eq!(
            panel.render(),
            vec![
                "01:05  click    Clicked on \"Sign in\"  button.primary",
                "00:01  click    Clicked on element",
                "00:02  type     Typed: \"rust\"  #q",
                "00:03  keypress Pressed key: Enter  #q",
            ]
        );
    }

    #[test]
    fn export_needs_actions() {
        let mut panel = TracePanel::new();
        assert!(panel.export("agent").is_none());
        panel.sync(vec![typed(0, "x")]);
        let trace = panel.export("agent").unwrap();
        assert_eq!(trace.metadata.total_actions, 1);
        assert_eq!(trace.metadata.user_agent, "agent");
        panel.clear();
        assert!(panel.is_empty());
    }
}
