// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! A registered wire.
//!
//! A [`Signal`] holds a committed value that every reader sees for the whole
//! of a clock tick. Calling [`drive`](Signal::drive) stages a new value that
//! is committed when the clock advances to its next tick. If a signal is
//! driven more than once in a tick the last value wins.
//!
//! ```rust
//! # use strobe_engine::signal::Signal;
//! # use strobe_engine::test_helpers::start_test;
//! let mut engine = start_test(file!());
//! let clock = engine.clock_mhz(125.0).unwrap();
//! let valid = Signal::new(engine.top(), "valid", &clock, false);
//! {
//!     let valid = valid.clone();
//!     let clock = clock.clone();
//!     engine.spawn(async move {
//!         valid.drive(true);
//!         assert!(!valid.value());
//!         clock.wait_ticks(1).await;
//!         assert!(valid.value());
//!         Ok(())
//!     });
//! }
//! engine.run().unwrap();
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use strobe_track::entity::Entity;
use strobe_track::value;

use crate::clock::Clock;
use crate::sim_error;
use crate::traits::Resolve;
use crate::types::SimResult;

/// Types that can be carried by a [`Signal`].
pub trait SignalValue: Copy + PartialEq + fmt::Debug + 'static {
    /// The value as emitted in track events.
    fn as_u64(self) -> u64;
}

impl SignalValue for bool {
    fn as_u64(self) -> u64 {
        u64::from(self)
    }
}

macro_rules! unsigned_signal_value {
    ($($t:ty),*) => {
        $(
        impl SignalValue for $t {
            fn as_u64(self) -> u64 {
                u64::from(self)
            }
        }
        )*
    };
}

unsigned_signal_value!(u8, u16, u32, u64);

struct SignalState<T>
where
    T: SignalValue,
{
    entity: Rc<Entity>,
    value: Cell<T>,
    pending: Cell<Option<T>>,
    driver: RefCell<Option<String>>,
}

impl<T> Resolve for SignalState<T>
where
    T: SignalValue,
{
    fn resolve(&self) {
        if let Some(value) = self.pending.take() {
            if value != self.value.get() {
                self.value.set(value);
                value!(self.entity ; value.as_u64());
            }
        }
    }
}

#[derive(Clone)]
pub struct Signal<T>
where
    T: SignalValue,
{
    clock: Clock,
    state: Rc<SignalState<T>>,
}

impl<T> Signal<T>
where
    T: SignalValue,
{
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str, clock: &Clock, initial: T) -> Self {
        let entity = Rc::new(Entity::new(parent, name));
        Self {
            clock: clock.clone(),
            state: Rc::new(SignalState {
                entity,
                value: Cell::new(initial),
                pending: Cell::new(None),
                driver: RefCell::new(None),
            }),
        }
    }

    /// The value committed at the current tick.
    #[must_use]
    pub fn value(&self) -> T {
        self.state.value.get()
    }

    /// Stage a value to be committed at the next tick.
    pub fn drive(&self, value: T) {
        if self.state.pending.replace(Some(value)).is_none() {
            self.clock.add_resolve(self.state.clone());
        }
    }

    /// Register `driver` as the only entity allowed to drive this signal.
    pub fn claim_driver(&self, driver: &Entity) -> SimResult {
        let mut guard = self.state.driver.borrow_mut();
        if let Some(existing) = guard.as_ref() {
            return sim_error!(format!(
                "{} already driven by {existing}, can't be driven by {driver}",
                self.state.entity
            ));
        }
        *guard = Some(driver.full_name().to_string());
        Ok(())
    }

    /// The full name of the entity driving this signal, if claimed.
    #[must_use]
    pub fn driver(&self) -> Option<String> {
        self.state.driver.borrow().clone()
    }

    #[must_use]
    pub fn entity(&self) -> &Rc<Entity> {
        &self.state.entity
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}

impl<T> fmt::Display for Signal<T>
where
    T: SignalValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.state.entity, self.value())
    }
}
