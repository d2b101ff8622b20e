// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The link clock.
//!
//! A [`Clock`] counts rising edges (ticks). Values staged with
//! [`Clock::add_resolve`] during a tick are committed as the clock moves to
//! a later tick, before any task waiting on that tick is woken.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::future::FusedFuture;

use crate::traits::Resolve;

struct ClockState {
    tick: Cell<u64>,
    sleepers: RefCell<BTreeMap<u64, Vec<Waker>>>,
    staged: RefCell<Vec<Rc<dyn Resolve>>>,
}

/// A handle on the engine's clock. Clones share the same clock.
#[derive(Clone)]
pub struct Clock {
    freq_mhz: f64,
    state: Rc<ClockState>,
}

impl Clock {
    /// A clock at tick 0. Engines create theirs with
    /// [`Engine::clock_mhz`](crate::engine::Engine::clock_mhz).
    #[must_use]
    pub fn new(freq_mhz: f64) -> Self {
        Self {
            freq_mhz,
            state: Rc::new(ClockState {
                tick: Cell::new(0),
                sleepers: RefCell::new(BTreeMap::new()),
                staged: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn freq_mhz(&self) -> f64 {
        self.freq_mhz
    }

    #[must_use]
    pub fn period_ns(&self) -> f64 {
        1000.0 / self.freq_mhz
    }

    #[must_use]
    pub fn tick_now(&self) -> u64 {
        self.state.tick.get()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.to_ns(self.tick_now())
    }

    /// Time of `tick` in ns.
    #[must_use]
    pub fn to_ns(&self, tick: u64) -> f64 {
        tick as f64 * self.period_ns()
    }

    /// Commit `resolve` when the clock next moves on.
    pub fn add_resolve(&self, resolve: Rc<dyn Resolve>) {
        self.state.staged.borrow_mut().push(resolve);
    }

    /// Completes `ticks` edges from now. Zero ticks completes at once.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_ticks(&self, ticks: u64) -> ClockDelay {
        ClockDelay {
            state: self.state.clone(),
            until: self.tick_now() + ticks,
            scheduled: false,
            done: false,
        }
    }

    /// Move to the earliest tick anything waits for and hand back its
    /// wakers. Returns `None` when nothing waits.
    pub(crate) fn advance(&self) -> Option<Vec<Waker>> {
        let (tick, wakers) = self.state.sleepers.borrow_mut().pop_first()?;
        if tick != self.state.tick.get() {
            // A resolve may stage again for the following tick
            let staged = self.state.staged.take();
            for resolve in staged {
                resolve.resolve();
            }
            self.state.tick.set(tick);
        }
        Some(wakers)
    }
}

/// Returned by [`Clock::wait_ticks`].
///
/// Only completes once the clock has reached the target tick, so an early
/// wake has no effect.
pub struct ClockDelay {
    state: Rc<ClockState>,
    until: u64,
    scheduled: bool,
    done: bool,
}

impl Future for ClockDelay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.state.tick.get() >= self.until {
            self.done = true;
            return Poll::Ready(());
        }
        if !self.scheduled {
            self.state
                .sleepers
                .borrow_mut()
                .entry(self.until)
                .or_default()
                .push(cx.waker().clone());
            self.scheduled = true;
        }
        Poll::Pending
    }
}

impl FusedFuture for ClockDelay {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use futures::task::noop_waker_ref;

    use super::*;

    #[test]
    fn link_clock_periods() {
        let clock = Clock::new(125.0);
        assert_eq!(clock.period_ns(), 8.0);
        assert_eq!(clock.to_ns(4), 32.0);
        assert_eq!(Clock::new(1000.0).to_ns(1), 1.0);
    }

    struct Flag(Cell<bool>);

    impl Resolve for Flag {
        fn resolve(&self) {
            self.0.set(true);
        }
    }

    #[test]
    fn staged_values_commit_on_the_next_tick() {
        let clock = Clock::new(125.0);
        let mut cx = Context::from_waker(noop_waker_ref());
        let flag = Rc::new(Flag(Cell::new(false)));
        clock.add_resolve(flag.clone());

        let mut now = clock.wait_ticks(0);
        assert!(Pin::new(&mut now).poll(&mut cx).is_ready());
        let mut later = clock.wait_ticks(2);
        assert!(Pin::new(&mut later).poll(&mut cx).is_pending());
        assert!(!flag.0.get());

        let wakers = clock.advance().unwrap();
        assert_eq!(wakers.len(), 1);
        assert_eq!(clock.tick_now(), 2);
        assert!(flag.0.get());
        assert!(Pin::new(&mut later).poll(&mut cx).is_ready());
        assert!(later.is_terminated());
        assert!(clock.advance().is_none());
    }

    #[test]
    fn polled_twice_sleeps_once() {
        let clock = Clock::new(125.0);
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut delay = clock.wait_ticks(1);
        assert!(Pin::new(&mut delay).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut delay).poll(&mut cx).is_pending());
        assert_eq!(clock.advance().map(|wakers| wakers.len()), Some(1));
    }
}
