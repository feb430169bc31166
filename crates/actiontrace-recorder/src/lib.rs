//! actiontrace-recorder - capture page interactions as an action trace
//!
//! Clicks, typing and Enter presses become a deduplicated, coalesced list of
//! actions, each tagged with a selector for its target element.
//!
//! ## Pieces
//!
//! - **recorder**: the capturer and its recording session
//! - **event_loop**: dispatches page events and fires the typing timer
//! - **panel**: display-side mirror fed by outbound messages
//! - **storage**: exported trace files on disk

pub mod clock;
pub mod event_loop;
pub mod events;
pub mod panel;
pub mod recorder;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_loop::{EventLoop, Handler};
pub use events::*;
pub use panel::TracePanel;
pub use recorder::{
    ActionRecorder, ClickTarget, Receiver, RecorderConfig, RecorderState, RecordingSession,
    Sender, TransportError,
};
pub use storage::TraceStorage;
pub use timer::{TimerId, TimerQueue};

pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::event_loop::EventLoop;
    pub use crate::events::*;
    pub use crate::panel::TracePanel;
    pub use crate::recorder::{ActionRecorder, ClickTarget, RecorderConfig, RecorderState};
    pub use crate::storage::TraceStorage;
}
