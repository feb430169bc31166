//! Timed event scripts
//!
//! A script is a list of steps, each at a millisecond offset from the start
//! of recording. Targets are selectors resolved against the page when the
//! step runs, so a script reads like the trace it produces:
//!
//! ```json
//! { "steps": [
//!     { "at": 0,    "click": { "target": "#email", "x": 10, "y": 20 } },
//!     { "at": 120,  "input": { "target": "#email", "value": "a@b.c" } },
//!     { "at": 400,  "key":   { "target": "#email", "key": "Enter" } },
//!     { "at": 900,  "navigate": "https://example.com/next" }
//! ] }
//! ```

use actiontrace_core::{Error, ErrorCode, Locator, NodeId, Page, Result};
use actiontrace_recorder::{
    Action, ActionRecorder, Command, DomEvent, EventLoop, ManualClock, RecorderConfig, TracePanel,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Milliseconds after recording starts
    pub at: u64,
    #[serde(flatten)]
    pub op: StepOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepOp {
    Click {
        target: String,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
    },
    /// Set the field's value, then fire `input`
    Input { target: String, value: String },
    Key { target: String, key: String },
    Navigate(String),
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::new(ErrorCode::ScriptInvalid, e.to_string()))
    }

    pub fn duration(&self) -> u64 {
        self.steps.last().map(|s| s.at).unwrap_or(0)
    }
}

/// Result of running a script
#[derive(Debug)]
pub struct ScriptRun {
    /// The recorder's list at stop time
    pub actions: Vec<Action>,
    /// What the display layer saw over the channel
    pub panel: TracePanel,
}

/// Start recording, play every step on a virtual clock, stop
pub fn run_script(page: Page, script: &Script, config: RecorderConfig) -> Result<ScriptRun> {
    let clock = ManualClock::new();
    let (recorder, rx) = ActionRecorder::new(config);
    let mut event_loop = EventLoop::new(page, recorder, clock.clone());
    let mut panel = TracePanel::new();

    event_loop.command(Command::StartRecording);

    let mut last_at = 0;
    for (i, step) in script.steps.iter().enumerate() {
        if step.at < last_at {
            return Err(Error::script_invalid(
                i,
                &format!("at {} comes before previous step at {}", step.at, last_at),
            ));
        }
        last_at = step.at;
        clock.set(step.at);
        event_loop.run_timers();

        debug!(step = i, at = step.at, op = ?step.op, "running step");
        run_step(&mut event_loop, i, &step.op)?;
        panel.drain(&rx);
    }

    let response = event_loop.command(Command::StopRecording);
    panel.drain(&rx);

    Ok(ScriptRun {
        actions: response.actions.unwrap_or_default(),
        panel,
    })
}

fn run_step(event_loop: &mut EventLoop, i: usize, op: &StepOp) -> Result<()> {
    match op {
        StepOp::Click { target, x, y } => {
            let target = resolve(event_loop, i, target)?;
            event_loop.dispatch(DomEvent::Click {
                target,
                x: *x,
                y: *y,
            });
        }
        StepOp::Input { target, value } => {
            let target = resolve(event_loop, i, target)?;
            event_loop
                .page_mut()
                .document
                .set_value(target, value)
                .map_err(|e| Error::script_invalid(i, &e.message))?;
            event_loop.dispatch(DomEvent::Input { target });
        }
        StepOp::Key { target, key } => {
            let target = resolve(event_loop, i, target)?;
            event_loop.dispatch(DomEvent::KeyDown {
                target,
                key: key.clone(),
            });
        }
        StepOp::Navigate(url) => event_loop.navigate(url.clone()),
    }
    Ok(())
}

fn resolve(event_loop: &EventLoop, i: usize, selector: &str) -> Result<NodeId> {
    Locator::parse(selector)
        .and_then(|loc| loc.find(&event_loop.page().document))
        .map_err(|e| {
            let mut err = Error::script_invalid(i, &e.message);
            err.context = e.context;
            err
        })
}
