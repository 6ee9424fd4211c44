//! Tasks and the pipeline that chains them
//!
//! A pipeline runs at most once; each task decides whether to call the rest.

use std::cell::Cell;
use std::fmt;

use tracing::debug;

use super::action::RunContext;
use crate::error::{StewardError, StewardResult};

/// Where a pipeline is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    /// Index of the task currently running
    Running(usize),
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Pending => write!(f, "pending"),
            PipelineState::Running(index) => write!(f, "running task {}", index),
            PipelineState::Succeeded => write!(f, "succeeded"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}

/// One step of a pipeline
pub trait Task<P> {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Do the work, calling `next.run(passable, ctx)` to continue
    fn handle(
        &self,
        passable: &mut P,
        ctx: &RunContext<'_>,
        next: Next<'_, P>,
    ) -> StewardResult<()>;
}

/// The rest of the pipeline after the current task
pub struct Next<'a, P> {
    tasks: &'a [Box<dyn Task<P>>],
    index: usize,
    state: &'a Cell<PipelineState>,
}

impl<P> Next<'_, P> {
    /// Run the remaining tasks
    pub fn run(self, passable: &mut P, ctx: &RunContext<'_>) -> StewardResult<()> {
        let Some(task) = self.tasks.get(self.index) else {
            return Ok(());
        };

        self.state.set(PipelineState::Running(self.index));
        debug!(task = task.name(), index = self.index, run = %ctx.run_id(), "Running task");

        task.handle(
            passable,
            ctx,
            Next {
                tasks: self.tasks,
                index: self.index + 1,
                state: self.state,
            },
        )
    }

    /// Number of tasks still to run
    pub fn remaining(&self) -> usize {
        self.tasks.len().saturating_sub(self.index)
    }
}

/// An ordered list of tasks that runs once
pub struct Pipeline<P> {
    tasks: Vec<Box<dyn Task<P>>>,
    state: Cell<PipelineState>,
}

impl<P> Default for Pipeline<P> {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            state: Cell::new(PipelineState::Pending),
        }
    }
}

impl<P> Pipeline<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task
    pub fn through(mut self, task: impl Task<P> + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state.get()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Run every task in order, stopping at the first error
    pub fn run(&self, passable: &mut P, ctx: &RunContext<'_>) -> StewardResult<()> {
        if self.state.get() != PipelineState::Pending {
            return Err(StewardError::Config(format!(
                "Pipeline cannot run again, it is {}",
                self.state.get()
            )));
        }

        let first = Next {
            tasks: &self.tasks,
            index: 0,
            state: &self.state,
        };

        let result = first.run(passable, ctx);
        self.state.set(if result.is_ok() {
            PipelineState::Succeeded
        } else {
            PipelineState::Failed
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventDispatcher;

    #[derive(Default)]
    struct Trace {
        visited: Vec<&'static str>,
    }

    struct Step(&'static str);

    impl Task<Trace> for Step {
        fn name(&self) -> &'static str {
            self.0
        }

        fn handle(
            &self,
            passable: &mut Trace,
            ctx: &RunContext<'_>,
            next: Next<'_, Trace>,
        ) -> StewardResult<()> {
            passable.visited.push(self.0);
            next.run(passable, ctx)
        }
    }

    struct Fail;

    impl Task<Trace> for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn handle(
            &self,
            passable: &mut Trace,
            _ctx: &RunContext<'_>,
            _next: Next<'_, Trace>,
        ) -> StewardResult<()> {
            passable.visited.push("fail");
            Err(StewardError::Config("stop".into()))
        }
    }

    /// Records what happened after the rest of the pipeline returned
    struct Around;

    impl Task<Trace> for Around {
        fn name(&self) -> &'static str {
            "around"
        }

        fn handle(
            &self,
            passable: &mut Trace,
            ctx: &RunContext<'_>,
            next: Next<'_, Trace>,
        ) -> StewardResult<()> {
            let result = next.run(passable, ctx);
            passable.visited.push("after");
            result
        }
    }

    #[test]
    fn test_runs_in_order() {
        let events = EventDispatcher::new();
        let ctx = RunContext::new(&events);
        let pipeline = Pipeline::new()
            .through(Step("a"))
            .through(Step("b"))
            .through(Step("c"));
        let mut trace = Trace::default();

        pipeline.run(&mut trace, &ctx).unwrap();

        assert_eq!(trace.visited, vec!["a", "b", "c"]);
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
    }

    #[test]
    fn test_error_skips_remaining_tasks() {
        let events = EventDispatcher::new();
        let ctx = RunContext::new(&events);
        let pipeline = Pipeline::new()
            .through(Step("a"))
            .through(Fail)
            .through(Step("never"));
        let mut trace = Trace::default();

        assert!(pipeline.run(&mut trace, &ctx).is_err());
        assert_eq!(trace.visited, vec!["a", "fail"]);
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[test]
    fn test_task_sees_result_of_the_rest() {
        let events = EventDispatcher::new();
        let ctx = RunContext::new(&events);
        let pipeline = Pipeline::new().through(Around).through(Fail);
        let mut trace = Trace::default();

        assert!(pipeline.run(&mut trace, &ctx).is_err());
        assert_eq!(trace.visited, vec!["fail", "after"]);
    }

    #[test]
    fn test_runs_only_once() {
        let events = EventDispatcher::new();
        let ctx = RunContext::new(&events);
        let pipeline = Pipeline::new().through(Step("a"));
        let mut trace = Trace::default();

        pipeline.run(&mut trace, &ctx).unwrap();
        let err = pipeline.run(&mut trace, &ctx).unwrap_err();
        assert!(err.is_config());
        assert_eq!(trace.visited, vec!["a"]);
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
    }

    #[test]
    fn test_empty_pipeline_succeeds() {
        let events = EventDispatcher::new();
        let ctx = RunContext::new(&events);
        let pipeline: Pipeline<Trace> = Pipeline::new();

        pipeline.run(&mut Trace::default(), &ctx).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Succeeded);
        assert!(pipeline.is_empty());
    }
}
