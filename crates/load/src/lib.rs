//! Resumable upload sessions and the concurrent load harness.
//!
//! A [`ResumeController`] drives one upload session through init, the chunk
//! loop and completion, resuming after simulated interruptions and transport
//! errors. A [`LoadHarness`] runs one controller per simulated user.
//!
//! # Flow per session
//!
//! 1. **Init**: obtain an upload id for the object
//! 2. **Chunks**: send each chunk in order, resuming from the first
//!    unconfirmed one after a failure
//! 3. **Complete**: ask the remote to assemble the object

pub mod controller;
pub mod error;
pub mod fault;
pub mod harness;
pub mod monitor;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use controller::{ResumeController, SessionRun};
pub use error::SessionError;
pub use fault::{FaultInjector, NoFaults, RandomInterruptions};
pub use harness::LoadHarness;
pub use monitor::{LoadCounters, ResourceMonitor};
pub use types::{
    ChunkOutcome, ControllerState, HarnessConfig, LoadReport, SessionConfig, SessionResult,
};
