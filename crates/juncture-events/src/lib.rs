//! Message thread services for juncture.
//!
//! - [`MessageManager`]: a FIFO queue of deferred calls ([`CallAsyncCallback`])
//!   drained by a dispatch loop on the message thread.
//! - [`MultiTimer`]: numbered timers polled by the dispatch loop.
//! - [`ApplicationBase`]: the application capability. One application may be
//!   installed per thread; its timers are driven through
//!   [`start_app_timer`] and [`stop_app_timer`].
//! - [`App`] and [`run_app`]: a typed application with an [`AppHandle`] that
//!   other threads use to send it messages.

pub mod app;
pub mod application;
pub mod call_async;
pub mod message_manager;
pub mod native;
pub mod timer;

pub use app::{run_app, with_app, App, AppConfig, AppHandle, AppTimerId, On};
pub use application::{
    install, is_installed, poll_app_timers, start_app_timer, stop_app_timer, uninstall,
    with_instance, ApplicationBase, ApplicationBaseAdapter, BoxDynApplicationBase,
};
pub use call_async::{
    BoxDynCallAsyncCallback, CallAsyncCallback, CallAsyncCallbackAdapter, OnceCallback,
};
pub use message_manager::{MessageManager, DEFAULT_IDLE_WAIT};
pub use timer::MultiTimer;
