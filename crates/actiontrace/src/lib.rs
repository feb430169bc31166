//! # actiontrace
//!
//! Record what a user does on a web page as a replayable JSON action trace.
//!
//! ## Features
//!
//! - **Selectors**: stable locators with an id/test-id/label/class/path fallback
//! - **Capture**: click dedup, typing coalescing, Enter handling
//! - **Trace**: exported JSON with metadata, ready for replay tooling
//! - **Scripts**: drive a recording from a timed event script
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actiontrace::prelude::*;
//!
//! let page = Page::from_json(&std::fs::read_to_string("page.json")?)?;
//! let script = Script::from_json(&std::fs::read_to_string("script.json")?)?;
//! let run = run_script(page, &script, RecorderConfig::default())?;
//! for line in run.panel.render() {
//!     println!("{}", line);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod script;

// Re-export core model
pub use actiontrace_core::*;

// Re-export recorder module
pub use actiontrace_recorder as recorder;

pub use actiontrace_recorder::{
    Action, ActionData, ActionKind, ActionRecorder, ClickTarget, Command, CommandResponse,
    DomEvent, EventLoop, ManualClock, Outbound, RecorderConfig, SystemClock, Trace, TracePanel,
    TraceStorage, DEFAULT_USER_AGENT,
};
pub use script::{run_script, Script, ScriptRun, Step, StepOp};

/// Prelude - import everything you need
pub mod prelude {
    pub use actiontrace_core::prelude::*;
    pub use actiontrace_recorder::prelude::*;

    pub use crate::script::{run_script, Script, ScriptRun, Step, StepOp};
}
