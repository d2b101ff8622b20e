// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Single-threaded executor for one clock domain.
//!
//! Woken tasks are polled in batches. A task woken while a batch runs waits
//! for the next batch of the same tick. Once a batch leaves nothing ready the
//! clock moves to the next tick a task waits for, which commits staged
//! signals before any task runs.
//!
//! Foreground tasks keep the simulation going. Background tasks (the
//! registered components) are abandoned once the last foreground task is done.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::mem::ManuallyDrop;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use strobe_track::entity::Entity;
use strobe_track::{set_time, trace};

use crate::clock::Clock;
use crate::sim_error;
use crate::types::{SimError, SimResult};

type TaskFuture = Pin<Box<dyn Future<Output = SimResult>>>;
type ReadyQueue = Rc<RefCell<VecDeque<Rc<Task>>>>;

struct Task {
    /// `None` once complete, so a stale wake does not poll it again.
    future: RefCell<Option<TaskFuture>>,
    foreground: bool,
    ready: ReadyQueue,
}

impl Task {
    fn schedule(self: Rc<Self>) {
        let ready = self.ready.clone();
        ready.borrow_mut().push_back(self);
    }

    fn waker(self: &Rc<Self>) -> Waker {
        let data = Rc::into_raw(self.clone()).cast::<()>();
        // SAFETY: `data` carries one strong count of an `Rc<Task>`, which the
        // vtable functions take over.
        unsafe { Waker::from_raw(RawWaker::new(data, &VTABLE)) }
    }
}

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_waker, wake, wake_by_ref, drop_waker);

unsafe fn clone_waker(data: *const ()) -> RawWaker {
    // SAFETY: the waker being cloned holds a strong count for `data`.
    unsafe { Rc::increment_strong_count(data.cast::<Task>()) };
    RawWaker::new(data, &VTABLE)
}

unsafe fn wake(data: *const ()) {
    // SAFETY: takes over the count held by the consumed waker.
    let task = unsafe { Rc::from_raw(data.cast::<Task>()) };
    task.schedule();
}

unsafe fn wake_by_ref(data: *const ()) {
    // SAFETY: the waker keeps its count, so this `Rc` must not be dropped.
    let task = ManuallyDrop::new(unsafe { Rc::from_raw(data.cast::<Task>()) });
    Rc::clone(&task).schedule();
}

unsafe fn drop_waker(data: *const ()) {
    // SAFETY: releases the count held by the dropped waker.
    drop(unsafe { Rc::from_raw(data.cast::<Task>()) });
}

pub struct Executor {
    entity: Rc<Entity>,
    ready: ReadyQueue,
    foreground: Cell<usize>,
    clock: RefCell<Option<Clock>>,
}

impl Executor {
    pub fn new(parent: &Rc<Entity>) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, "executor")),
            ready: Rc::new(RefCell::new(VecDeque::new())),
            foreground: Cell::new(0),
            clock: RefCell::new(None),
        }
    }

    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static, foreground: bool) {
        if foreground {
            self.foreground.set(self.foreground.get() + 1);
        }
        Rc::new(Task {
            future: RefCell::new(Some(Box::pin(future))),
            foreground,
            ready: self.ready.clone(),
        })
        .schedule();
    }

    /// The clock of this executor, created on first use.
    ///
    /// Every model shares one clock, so asking for another frequency fails.
    pub fn clock_mhz(&self, freq_mhz: f64) -> Result<Clock, SimError> {
        let mut slot = self.clock.borrow_mut();
        match slot.as_ref() {
            Some(clock) if clock.freq_mhz() == freq_mhz => Ok(clock.clone()),
            Some(clock) => sim_error!(format!(
                "{} runs at {} MHz, can't add a {freq_mhz} MHz clock",
                self.entity,
                clock.freq_mhz()
            )),
            None => Ok(slot.insert(Clock::new(freq_mhz)).clone()),
        }
    }

    pub fn time_now_ns(&self) -> f64 {
        self.clock
            .borrow()
            .as_ref()
            .map_or(0.0, Clock::time_now_ns)
    }

    /// Run until no foreground task is left or nothing can make progress.
    ///
    /// The first task error stops the run and is returned.
    pub fn run(&self) -> SimResult {
        while self.foreground.get() > 0 {
            let batch: Vec<_> = self.ready.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                if !self.advance() {
                    trace!(self.entity ; "Nothing left to wake, {} tasks blocked",
                        self.foreground.get());
                    break;
                }
                continue;
            }
            for task in batch {
                self.poll(&task)?;
            }
        }
        Ok(())
    }

    fn poll(&self, task: &Rc<Task>) -> SimResult {
        let waker = task.waker();
        let mut cx = Context::from_waker(&waker);
        let mut slot = task.future.borrow_mut();
        let Some(future) = slot.as_mut() else {
            return Ok(());
        };
        if let Poll::Ready(result) = future.as_mut().poll(&mut cx) {
            *slot = None;
            if task.foreground {
                self.foreground.set(self.foreground.get() - 1);
            }
            result?;
        }
        Ok(())
    }

    fn advance(&self) -> bool {
        let guard = self.clock.borrow();
        let Some(clock) = guard.as_ref() else {
            return false;
        };
        let Some(wakers) = clock.advance() else {
            return false;
        };
        set_time!(self.entity ; clock.time_now_ns());
        for waker in wakers {
            waker.wake();
        }
        true
    }
}
