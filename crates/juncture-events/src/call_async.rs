//! Deferred calls.

use crate::native;

/// Work posted to the message thread.
pub trait CallAsyncCallback: Send {
    fn call(&mut self);
}

juncture_core::capability! {
    /// Owned handle to a foreign [`CallAsyncCallback`].
    pub type BoxDynCallAsyncCallback = dyn CallAsyncCallback as "CallAsyncCallback";
    wrap = CallAsyncCallbackAdapter => dyn native::CallAsyncCallback;
}

/// Runs a closure the first time it is called and ignores later calls.
pub struct OnceCallback<F> {
    callback: Option<F>,
}

impl<F: FnOnce() + Send> OnceCallback<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback: Some(callback),
        }
    }
}

impl<F: FnOnce() + Send> CallAsyncCallback for OnceCallback<F> {
    fn call(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

impl<F> std::fmt::Debug for OnceCallback<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnceCallback")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

/// Native deferred call backed by a foreign [`CallAsyncCallback`].
#[derive(Debug)]
pub struct CallAsyncCallbackAdapter {
    callback: BoxDynCallAsyncCallback,
}

impl CallAsyncCallbackAdapter {
    pub fn new(callback: BoxDynCallAsyncCallback) -> Self {
        Self { callback }
    }
}

impl native::CallAsyncCallback for CallAsyncCallbackAdapter {
    fn call(&mut self) {
        self.callback.forward_mut("call", (), |callback| callback.call());
    }
}

/// Boxes a closure as a native deferred call.
pub fn boxed(callback: impl FnOnce() + Send + 'static) -> Box<dyn native::CallAsyncCallback> {
    let callback: Box<dyn CallAsyncCallback> = Box::new(OnceCallback::new(callback));
    callback.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_once_callback_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut callback = boxed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        callback.call();
        callback.call();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let mut callback = boxed(|| panic!("deferred failure"));
        callback.call();
    }

    #[test]
    fn test_dropping_uncalled_callback_releases_captures() {
        let captured = Arc::new(());
        let held = Arc::clone(&captured);
        let callback = boxed(move || drop(held));
        assert_eq!(Arc::strong_count(&captured), 2);

        drop(callback);
        assert_eq!(Arc::strong_count(&captured), 1);
    }
}
