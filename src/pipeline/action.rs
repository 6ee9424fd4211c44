//! Actions
//!
//! An action wraps a pipeline run and reports its outcome as one event.

use serde::Serialize;
use tracing::{error, info};

use super::task::Pipeline;
use crate::error::StewardResult;
use crate::events::{Event, EventDispatcher, RunId};

/// Context threaded through a pipeline
///
/// Its serialized form is attached to the terminal events of a run.
pub trait Passable: Serialize {
    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// What every task of one run shares: the run id and the event dispatcher
pub struct RunContext<'a> {
    run_id: RunId,
    events: &'a EventDispatcher,
}

impl<'a> RunContext<'a> {
    /// A context for a new run
    pub fn new(events: &'a EventDispatcher) -> Self {
        Self {
            run_id: RunId::new(),
            events,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Dispatch an event tagged with this run's id
    pub fn emit(&self, event: Event) {
        self.events.dispatch(self.run_id, &event);
    }
}

/// A named pipeline over one kind of passable
pub trait Action {
    type Passable: Passable;

    /// Name carried by the terminal events
    fn name(&self) -> &'static str;

    /// The tasks of this action, in order
    fn pipeline(&self) -> Pipeline<Self::Passable>;

    /// Run the pipeline and fire exactly one terminal event
    ///
    /// The error of a failed run is returned after `ActionFailed` fired.
    fn execute(
        &self,
        passable: &mut Self::Passable,
        events: &EventDispatcher,
    ) -> StewardResult<RunId> {
        let ctx = RunContext::new(events);
        let pipeline = self.pipeline();

        info!(
            action = self.name(),
            run = %ctx.run_id(),
            tasks = ?pipeline.task_names(),
            "Starting action"
        );

        match pipeline.run(passable, &ctx) {
            Ok(()) => {
                info!(action = self.name(), run = %ctx.run_id(), "Action succeeded");
                ctx.emit(Event::ActionSucceeded {
                    action: self.name().to_string(),
                    context: passable.snapshot(),
                });
                Ok(ctx.run_id())
            }
            Err(err) => {
                error!(action = self.name(), run = %ctx.run_id(), error = %err, "Action failed");
                ctx.emit(Event::ActionFailed {
                    action: self.name().to_string(),
                    context: passable.snapshot(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StewardError;
    use crate::events::RecordingListener;
    use crate::pipeline::{Next, Task};
    use std::rc::Rc;

    #[derive(Default, Serialize)]
    struct Counter {
        count: u32,
    }

    impl Passable for Counter {}

    struct Increment;

    impl Task<Counter> for Increment {
        fn name(&self) -> &'static str {
            "increment"
        }

        fn handle(
            &self,
            passable: &mut Counter,
            ctx: &RunContext<'_>,
            next: Next<'_, Counter>,
        ) -> StewardResult<()> {
            passable.count += 1;
            ctx.emit(Event::ManifestCreated {
                file_count: passable.count as usize,
            });
            next.run(passable, ctx)
        }
    }

    struct Explode;

    impl Task<Counter> for Explode {
        fn name(&self) -> &'static str {
            "explode"
        }

        fn handle(
            &self,
            _passable: &mut Counter,
            _ctx: &RunContext<'_>,
            _next: Next<'_, Counter>,
        ) -> StewardResult<()> {
            Err(StewardError::Storage("disk on fire".into()))
        }
    }

    struct CountingAction {
        fail: bool,
    }

    impl Action for CountingAction {
        type Passable = Counter;

        fn name(&self) -> &'static str {
            "count"
        }

        fn pipeline(&self) -> Pipeline<Counter> {
            let pipeline = Pipeline::new().through(Increment);
            let pipeline = if self.fail {
                pipeline.through(Explode)
            } else {
                pipeline
            };
            pipeline.through(Increment)
        }
    }

    fn dispatcher() -> (EventDispatcher, Rc<RecordingListener>) {
        let recorder = Rc::new(RecordingListener::default());
        (
            EventDispatcher::new().with_listener(recorder.clone()),
            recorder,
        )
    }

    #[test]
    fn test_success_fires_one_terminal_event() {
        let (events, recorder) = dispatcher();
        let mut counter = Counter::default();

        let run_id = CountingAction { fail: false }
            .execute(&mut counter, &events)
            .unwrap();

        assert_eq!(counter.count, 2);
        assert_eq!(
            recorder.names(),
            vec!["manifest_created", "manifest_created", "action_succeeded"]
        );
        assert!(recorder.run_ids().iter().all(|id| *id == run_id));
        match recorder.events().last() {
            Some(Event::ActionSucceeded { action, context }) => {
                assert_eq!(action, "count");
                assert_eq!(context["count"], 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_failure_aborts_and_fires_failed_once() {
        let (events, recorder) = dispatcher();
        let mut counter = Counter::default();

        let err = CountingAction { fail: true }
            .execute(&mut counter, &events)
            .unwrap_err();

        assert!(err.to_string().contains("disk on fire"));
        assert_eq!(counter.count, 1);
        assert_eq!(recorder.names(), vec!["manifest_created", "action_failed"]);
        let terminal = recorder
            .events()
            .iter()
            .filter(|e| e.is_terminal())
            .count();
        assert_eq!(terminal, 1);
    }

    #[test]
    fn test_each_run_gets_its_own_id() {
        let (events, _recorder) = dispatcher();
        let action = CountingAction { fail: false };

        let first = action.execute(&mut Counter::default(), &events).unwrap();
        let second = action.execute(&mut Counter::default(), &events).unwrap();
        assert_ne!(first, second);
    }
}
