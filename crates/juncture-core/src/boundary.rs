//! Panic barrier for calls crossing the native boundary.
//!
//! Panics must never unwind into the framework. Every capability call made
//! by an adapter runs inside [`guard`], which stops the panic, logs it with
//! the capability and operation names, and substitutes the native default.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs `call`, returning `default` if it panics.
pub fn guard<R>(capability: &str, operation: &str, default: R, call: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => value,
        Err(payload) => {
            log::error!(
                "{capability}::{operation} panicked: {}",
                panic_message(payload.as_ref())
            );
            default
        }
    }
}

/// Extracts the message of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_passes_value_through() {
        assert_eq!(guard("Test", "value", 0, || 42), 42);
    }

    #[test]
    fn test_guard_returns_default_on_panic() {
        let value = guard("Test", "panic", -1, || -> i32 { panic!("boom") });
        assert_eq!(value, -1);
    }

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(17_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
