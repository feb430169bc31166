//! Single-threaded event loop around the recorder
//!
//! Events are handled synchronously in dispatch order through a registry of
//! handlers keyed by event kind. Timers due at or before the current clock
//! reading fire before the next event or command is processed.

use crate::clock::Clock;
use crate::events::{Command, CommandResponse, DomEvent, EventKind};
use crate::recorder::ActionRecorder;
use actiontrace_core::Page;
use std::collections::HashMap;

pub type Handler = fn(&mut ActionRecorder, &Page, &DomEvent, u64);

pub struct EventLoop {
    page: Page,
    recorder: ActionRecorder,
    clock: Box<dyn Clock>,
    handlers: HashMap<EventKind, Handler>,
}

impl EventLoop {
    /// Loop with the click, input and keydown listeners attached
    pub fn new(page: Page, recorder: ActionRecorder, clock: impl Clock + 'static) -> Self {
        let mut event_loop = Self {
            page,
            recorder,
            clock: Box::new(clock),
            handlers: HashMap::new(),
        };
        event_loop.on(EventKind::Click, on_click);
        event_loop.on(EventKind::Input, on_input);
        event_loop.on(EventKind::KeyDown, on_keydown);
        event_loop
    }

    /// Register `handler` for `kind`, returning the one it replaces
    pub fn on(&mut self, kind: EventKind, handler: Handler) -> Option<Handler> {
        self.handlers.insert(kind, handler)
    }

    pub fn off(&mut self, kind: EventKind) -> Option<Handler> {
        self.handlers.remove(&kind)
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Deliver one event; false if nothing listens for its kind
    pub fn dispatch(&mut self, event: DomEvent) -> bool {
        let now = self.now();
        self.recorder.fire_due_timers(now);
        match self.handlers.get(&event.kind()) {
            Some(handler) => {
                handler(&mut self.recorder, &self.page, &event, now);
                true
            }
            None => false,
        }
    }

    pub fn command(&mut self, command: Command) -> CommandResponse {
        let now = self.now();
        self.recorder.fire_due_timers(now);
        self.recorder.handle_command(command, now)
    }

    /// Fire whatever timers are due now
    pub fn run_timers(&mut self) -> usize {
        let now = self.now();
        self.recorder.fire_due_timers(now)
    }

    pub fn navigate(&mut self, url: impl Into<String>) {
        self.page.url = url.into();
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn recorder(&self) -> &ActionRecorder {
        &self.recorder
    }
}

fn on_click(recorder: &mut ActionRecorder, page: &Page, event: &DomEvent, now: u64) {
    if let DomEvent::Click { target, x, y } = event {
        recorder.on_click(page, *target, *x, *y, now);
    }
}

fn on_input(recorder: &mut ActionRecorder, page: &Page, event: &DomEvent, now: u64) {
    if let DomEvent::Input { target } = event {
        recorder.on_input(page, *target, now);
    }
}

fn on_keydown(recorder: &mut ActionRecorder, page: &Page, event: &DomEvent, now: u64) {
    if let DomEvent::KeyDown { target, key } = event {
        recorder.on_keydown(page, *target, key, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::ActionData;
    use crate::recorder::RecorderConfig;
    use actiontrace_core::{Document, Element, NodeId};

    fn setup() -> (EventLoop, ManualClock, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append(body, Element::new("input").with_attr("id", "a")).unwrap();
        let b = doc.append(body, Element::new("input").with_attr("id", "b")).unwrap();
        let clock = ManualClock::new();
        clock.set(5_000);
        let (recorder, _rx) = ActionRecorder::new(RecorderConfig::default());
        let event_loop = EventLoop::new(Page::new("https://example.com/", doc), recorder, clock.clone());
        (event_loop, clock, a, b)
    }

    fn type_value(l: &mut EventLoop, node: NodeId, value: &str) {
        l.page_mut().document.set_value(node, value).unwrap();
        l.dispatch(DomEvent::Input { target: node });
    }

    #[test]
    fn same_field_within_idle_window_is_one_action() {
        let (mut l, clock, a, _) = setup();
        l.command(Command::StartRecording);
        clock.advance(100);
        type_value(&mut l, a, "abc");
        clock.advance(2_900);
        type_value(&mut l, a, "abcd");

        let actions = l.command(Command::StopRecording).actions.unwrap();
        assert_eq!(actions.len(), 1);
        match &actions[0].data {
            ActionData::Type { value, .. } => assert_eq!(value, "abcd"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(actions[0].timestamp, 3_000);
    }

    #[test]
    fn idle_timer_fires_before_next_event() {
        let (mut l, clock, a, _) = setup();
        l.command(Command::StartRecording);
        type_value(&mut l, a, "abc");
        clock.advance(3_000);
        type_value(&mut l, a, "abcd");
        assert_eq!(l.recorder().actions().len(), 2);
    }

    #[test]
    fn two_fields_same_tick() {
        let (mut l, _clock, a, b) = setup();
        l.command(Command::StartRecording);
        type_value(&mut l, a, "x");
        type_value(&mut l, b, "y");
        let selectors: Vec<_> = l
            .recorder()
            .actions()
            .iter()
            .map(|a| a.selector.clone().unwrap())
            .collect();
        assert_eq!(selectors, vec!["#a", "#b"]);
    }

    #[test]
    fn clicks_50ms_apart_recorded_once() {
        let (mut l, clock, a, _) = setup();
        l.command(Command::StartRecording);
        l.dispatch(DomEvent::Click { target: a, x: 1, y: 1 });
        clock.advance(50);
        l.dispatch(DomEvent::Click { target: a, x: 1, y: 1 });
        assert_eq!(l.recorder().actions().len(), 1);
    }

    #[test]
    fn clicks_150ms_apart_both_recorded() {
        let (mut l, clock, a, _) = setup();
        l.command(Command::StartRecording);
        l.dispatch(DomEvent::Click { target: a, x: 1, y: 1 });
        clock.advance(150);
        l.dispatch(DomEvent::Click { target: a, x: 1, y: 1 });
        let stamps: Vec<_> = l.recorder().actions().iter().map(|a| a.timestamp).collect();
        assert_eq!(stamps, vec![0, 150]);
    }

    #[test]
    fn dedup_window_is_exclusive_at_100ms() {
        let (mut l, clock, a, _) = setup();
        l.command(Command::StartRecording);
        l.dispatch(DomEvent::Click { target: a, x: 1, y: 1 });
        clock.advance(99);
        l.dispatch(DomEvent::Click { target: a, x: 1, y: 1 });
        assert_eq!(l.recorder().actions().len(), 1);
        clock.advance(1);
        l.dispatch(DomEvent::Click { target: a, x: 1, y: 1 });
        let stamps: Vec<_> = l.recorder().actions().iter().map(|a| a.timestamp).collect();
        assert_eq!(stamps, vec![0, 100]);
    }

    #[test]
    fn unregistered_kind_is_not_handled() {
        let (mut l, _clock, a, _) = setup();
        l.command(Command::StartRecording);
        assert!(l.off(EventKind::Click).is_some());
        assert!(!l.dispatch(DomEvent::Click { target: a, x: 0, y: 0 }));
        assert!(l.recorder().actions().is_empty());
    }

    #[test]
    fn navigation_changes_recorded_url() {
        let (mut l, _clock, a, _) = setup();
        l.command(Command::StartRecording);
        l.navigate("https://example.com/next");
        l.dispatch(DomEvent::Click { target: a, x: 0, y: 0 });
        assert_eq!(l.recorder().actions()[0].url, "https://example.com/next");
    }

    #[test]
    fn restart_resets_timestamps() {
        let (mut l, clock, a, _) = setup();
        l.command(Command::StartRecording);
        clock.advance(700);
        l.dispatch(DomEvent::Click { target: a, x: 0, y: 0 });
        l.command(Command::StopRecording);

        clock.advance(10_000);
        l.command(Command::StartRecording);
        assert!(l.command(Command::GetActions).actions.unwrap().is_empty());
        clock.advance(30);
        l.dispatch(DomEvent::Click { target: a, x: 0, y: 0 });
        assert_eq!(l.recorder().actions()[0].timestamp, 30);
    }
}
