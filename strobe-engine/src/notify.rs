// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Wake waiting tasks when something happens, such as a sink completing a
//! frame.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::future::FusedFuture;

#[derive(Default)]
struct NotifyState {
    count: Cell<u64>,
    waiters: RefCell<Vec<Waker>>,
}

/// Clones share the same notifications.
#[derive(Clone, Default)]
pub struct Notify {
    state: Rc<NotifyState>,
}

impl Notify {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete every [`Notified`] created before this call.
    pub fn notify(&self) {
        self.state.count.set(self.state.count.get() + 1);
        let waiters = self.state.waiters.take();
        for waker in waiters {
            waker.wake();
        }
    }

    /// How many times [`Notify::notify`] has been called.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.state.count.get()
    }

    /// Completes on the first notify after this call.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn notified(&self) -> Notified {
        Notified {
            state: self.state.clone(),
            seen: self.count(),
            done: false,
        }
    }
}

/// Returned by [`Notify::notified`].
pub struct Notified {
    state: Rc<NotifyState>,
    seen: u64,
    done: bool,
}

impl Future for Notified {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.state.count.get() != self.seen {
            self.done = true;
            return Poll::Ready(());
        }
        let mut waiters = self.state.waiters.borrow_mut();
        if !waiters.iter().any(|waker| waker.will_wake(cx.waker())) {
            waiters.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl FusedFuture for Notified {
    fn is_terminated(&self) -> bool {
        self.done
    }
}
