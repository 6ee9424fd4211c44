//! Task pipeline
//!
//! An action runs an ordered list of tasks over one mutable context, the
//! *passable*. Each task gets the passable and a [`Next`] continuation:
//!
//! ```text
//! task 0 ──next──▶ task 1 ──next──▶ ... ──next──▶ done
//!   │                │
//!   └── Err ─────────┴──▶ remaining tasks skipped, ActionFailed
//! ```
//!
//! A task that returns an error stops the run. A task that returns without
//! calling `next` ends it early. Either way the action fires exactly one of
//! `ActionSucceeded` or `ActionFailed`.

mod action;
mod task;

pub use action::{Action, Passable, RunContext};
pub use task::{Next, Pipeline, PipelineState, Task};
