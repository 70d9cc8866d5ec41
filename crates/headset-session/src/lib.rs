//! # headset-session
//!
//! The call session orchestrator.
//!
//! - [`CallStateMachine`]: the pure state machine, `Input` in, `Effect`s out
//! - [`Orchestrator`]: the single task that owns the machine, consumes the
//!   [`SessionEvent`] queue and executes effects against the AT link, the
//!   audio route controller and the LEDs

pub mod events;
pub mod machine;
pub mod orchestrator;

pub use events::{attach_link, AtLink, LinkId, SessionEvent};
pub use machine::{CallStateMachine, Effect, Input, MachineConfig, DEFAULT_HF_FEATURES};
pub use orchestrator::{event_queue, Orchestrator, OrchestratorConfig};
