//! Runtime guard and message thread identity.
//!
//! The framework has exactly one message thread per process: the thread
//! that first initialises the runtime. Further guards may be created on that
//! thread (they are reference counted); creating one on any other thread
//! while the runtime is alive fails.

use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use crate::error::{Error, Result};

struct RuntimeState {
    message_thread: Option<ThreadId>,
    guards: usize,
}

static STATE: Mutex<RuntimeState> = Mutex::new(RuntimeState {
    message_thread: None,
    guards: 0,
});

fn state() -> MutexGuard<'static, RuntimeState> {
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps the runtime alive. Not `Send`: it belongs to the message thread.
#[derive(Debug)]
pub struct Runtime {
    _not_send: PhantomData<*const ()>,
}

impl Runtime {
    /// Initialises the runtime on the calling thread.
    pub fn initialise() -> Result<Self> {
        let current = thread::current().id();
        let mut state = state();
        match state.message_thread {
            Some(thread) if thread != current => Err(Error::RuntimeOnOtherThread),
            _ => {
                if state.guards == 0 {
                    log::debug!("runtime initialised on {current:?}");
                }
                state.message_thread = Some(current);
                state.guards += 1;
                Ok(Self {
                    _not_send: PhantomData,
                })
            }
        }
    }

    /// The message thread, if the runtime is alive.
    pub fn message_thread() -> Option<ThreadId> {
        state().message_thread
    }

    pub fn is_this_the_message_thread() -> bool {
        Self::message_thread() == Some(thread::current().id())
    }
}

impl Clone for Runtime {
    fn clone(&self) -> Self {
        state().guards += 1;
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let mut state = state();
        state.guards = state.guards.saturating_sub(1);
        if state.guards == 0 {
            state.message_thread = None;
            log::debug!("runtime shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_belongs_to_one_thread() {
        let first = Runtime::initialise().unwrap();
        let second = Runtime::initialise().unwrap();
        assert!(Runtime::is_this_the_message_thread());

        let elsewhere = thread::spawn(|| {
            (
                Runtime::initialise().map(drop),
                Runtime::is_this_the_message_thread(),
            )
        })
        .join()
        .unwrap();
        assert_eq!(elsewhere, (Err(Error::RuntimeOnOtherThread), false));

        let third = second.clone();
        drop(first);
        drop(second);
        assert!(Runtime::is_this_the_message_thread());
        drop(third);
        assert_eq!(Runtime::message_thread(), None);

        let elsewhere = thread::spawn(|| Runtime::initialise().map(drop))
            .join()
            .unwrap();
        assert_eq!(elsewhere, Ok(()));
        assert_eq!(Runtime::message_thread(), None);
    }
}
