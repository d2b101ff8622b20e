// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use strobe_track::entity::{Entity, toplevel};
use strobe_track::{Tracker, trace};

use crate::clock::Clock;
use crate::executor::Executor;
use crate::types::{Component, SimError, SimResult};

/// Owns the hierarchy, the clock and the tasks of one simulation.
pub struct Engine {
    top: Rc<Entity>,
    tracker: Tracker,
    executor: Executor,
    components: RefCell<Vec<Component>>,
}

impl Engine {
    #[must_use]
    pub fn new(tracker: &Tracker) -> Self {
        let top = toplevel(tracker, "top");
        let executor = Executor::new(&top);
        Self {
            top,
            tracker: tracker.clone(),
            executor,
            components: RefCell::new(Vec::new()),
        }
    }

    /// Run `component` in the background once the simulation starts.
    pub fn register(&self, component: Component) {
        self.components.borrow_mut().push(component);
    }

    /// Spawn a foreground task. The simulation runs until all of them finish.
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.executor.spawn(future, true);
    }

    /// Spawn a task the simulation does not wait for.
    pub fn spawn_background(&self, future: impl Future<Output = SimResult> + 'static) {
        self.executor.spawn(future, false);
    }

    /// The simulation clock. The first call sets its frequency.
    pub fn clock_mhz(&self, freq_mhz: f64) -> Result<Clock, SimError> {
        self.executor.clock_mhz(freq_mhz)
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.executor.time_now_ns()
    }

    #[must_use]
    pub fn top(&self) -> &Rc<Entity> {
        &self.top
    }

    /// Start the registered components and run until every foreground task
    /// has finished.
    pub fn run(&mut self) -> SimResult {
        let components: Vec<_> = self.components.borrow_mut().drain(..).collect();
        trace!(self.top ; "Starting {} components", components.len());
        for component in components {
            self.executor
                .spawn(async move { component.run().await }, false);
        }

        let result = self.executor.run();
        self.tracker.shutdown();
        result
    }
}
