//! Interview session management
//!
//! This module provides the `SessionMonitor` that owns one room connection:
//! - Guarded connect (one live connection per monitor)
//! - Leave in any state, including while a connect is in flight
//! - Transcript and progress events from the room
//! - Exactly-once termination with local media released
//!
//! `SessionContext` folds those events into what the client displays.

mod config;
mod context;
mod monitor;
mod progress;

pub use config::SessionConfig;
pub use context::{InteractionMode, Notice, Session, SessionContext};
pub use monitor::{
    ConnectOutcome, LifecycleState, SessionEvent, SessionEvents, SessionMonitor, TerminationReason,
};
pub use progress::{InterviewProgress, ProgressEvent};
