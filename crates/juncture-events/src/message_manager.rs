//! The message queue and dispatch loop.
//!
//! Any thread may post work; the thread running the dispatch loop executes
//! it in posting order. Each dispatch round also polls the application
//! timers of the installed application (see [`crate::application`]).

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::application;
use crate::call_async;
use crate::native;

/// How long the dispatch loop sleeps when idle and no timer is due sooner.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(10);

#[derive(Default)]
struct Queue {
    messages: VecDeque<Box<dyn native::CallAsyncCallback>>,
    stop_requested: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
}

/// A message queue feeding one dispatch loop.
///
/// Cloning is cheap and every clone feeds the same queue.
#[derive(Clone, Default)]
pub struct MessageManager {
    shared: Arc<Shared>,
}

impl MessageManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `message`. Returns `false`, dropping the message, once the
    /// dispatch loop has been told to stop.
    pub fn post_message(&self, message: Box<dyn native::CallAsyncCallback>) -> bool {
        let mut queue = self.queue();
        if queue.stop_requested {
            log::debug!("message dropped: dispatch loop is stopping");
            return false;
        }
        queue.messages.push_back(message);
        drop(queue);
        self.shared.wake.notify_one();
        true
    }

    /// Queues a closure to run on the message thread.
    pub fn call_async(&self, callback: impl FnOnce() + Send + 'static) -> bool {
        self.post_message(call_async::boxed(callback))
    }

    pub fn num_pending(&self) -> usize {
        self.queue().messages.len()
    }

    /// Runs the messages queued so far, oldest first, and returns how many
    /// ran. Messages posted while dispatching wait for the next round.
    pub fn dispatch_pending(&self) -> usize {
        let pending = std::mem::take(&mut self.queue().messages);
        let count = pending.len();
        for mut message in pending {
            message.call();
        }
        count
    }

    /// Dispatches messages and polls timers until
    /// [`stop_dispatch_loop`](Self::stop_dispatch_loop) is called.
    pub fn run_dispatch_loop(&self) {
        self.run_dispatch_loop_with(DEFAULT_IDLE_WAIT);
    }

    /// [`run_dispatch_loop`](Self::run_dispatch_loop) with a custom idle
    /// wait.
    pub fn run_dispatch_loop_with(&self, idle_wait: Duration) {
        log::debug!("dispatch loop started");
        loop {
            self.dispatch_pending();
            let wait = application::poll_app_timers()
                .map_or(idle_wait, |next_timer| next_timer.min(idle_wait));

            let queue = self.queue();
            if queue.stop_requested {
                break;
            }
            if queue.messages.is_empty() && !wait.is_zero() {
                let _unused = self
                    .shared
                    .wake
                    .wait_timeout(queue, wait)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        log::debug!("dispatch loop stopped");
    }

    /// Asks the dispatch loop to return. Messages still queued are not run.
    pub fn stop_dispatch_loop(&self) {
        self.queue().stop_requested = true;
        self.shared.wake.notify_all();
    }

    pub fn has_stop_message_been_sent(&self) -> bool {
        self.queue().stop_requested
    }
}

impl std::fmt::Debug for MessageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue();
        f.debug_struct("MessageManager")
            .field("pending", &queue.messages.len())
            .field("stop_requested", &queue.stop_requested)
            .finish()
    }
}
