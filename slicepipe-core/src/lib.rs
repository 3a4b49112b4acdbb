//! # slicepipe-core
//!
//! Lock-free exchange of fixed-size stereo frames between producer
//! ("charging") and consumer ("reading") threads.
//!
//! ## Architecture
//!
//! ```text
//! source SignalFrame ─► Charger::charge ─► SlicePipeline (S slices) ─► Reader::read ─► dest SignalFrame
//!                         one slice/call      per-slice CAS state        one slice/call
//! ```
//!
//! Neither side ever takes an OS lock: each call claims at most one slice via
//! compare-and-swap, copies its range, publishes the next state and returns.
//! `TransferEngine` wraps the pipeline with worker threads for long-running use.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod console;
pub mod engine;
pub mod error;
pub mod events;
pub mod pipeline;

// Convenience re-exports for downstream crates
pub use buffering::{Sample, SignalFrame, Tone};
pub use engine::{spawn_worker, EngineConfig, TransferEngine};
pub use error::{PipelineError, Result};
pub use events::{EngineStatus, EngineStatusEvent, FrameDelivered};
pub use pipeline::{
    AgentId, Charger, MainState, PipelineConfig, Progress, Reader, SlicePipeline, SliceSnapshot,
    SliceState, MAX_TRY,
};
