//! Typed applications on top of [`ApplicationBase`].
//!
//! An [`App`] is driven by [`run_app`] on the calling thread, which becomes
//! the message thread. Other threads talk to it through an [`AppHandle`]:
//! every request is posted to the message queue and handled in order.
//!
//! ```no_run
//! use std::time::Duration;
//! use juncture_events::{run_app, App, AppConfig, AppHandle, AppTimerId, On};
//!
//! struct Ticker {
//!     ticks: u32,
//! }
//!
//! struct Reset;
//!
//! impl App for Ticker {
//!     fn name(&self) -> String {
//!         "Ticker".to_string()
//!     }
//!
//!     fn version(&self) -> String {
//!         "0.1.0".to_string()
//!     }
//!
//!     fn initialise(&mut self, handle: AppHandle<Self>) {
//!         handle.start_timer(Duration::from_millis(500));
//!     }
//!
//!     fn shutdown(&mut self) {}
//!
//!     fn timer_callback(&mut self, handle: AppHandle<Self>, _timer: AppTimerId) {
//!         self.ticks += 1;
//!         if self.ticks == 10 {
//!             handle.quit();
//!         }
//!     }
//! }
//!
//! impl On<Reset> for Ticker {
//!     fn on(&mut self, _message: Reset) {
//!         self.ticks = 0;
//!     }
//! }
//!
//! let exit_code = run_app(&AppConfig::new(), || Ticker { ticks: 0 })?;
//! # Ok::<(), juncture_core::Error>(())
//! ```

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use juncture_core::{NativeString, Result, Runtime};

use crate::application::{self, ApplicationBase};
use crate::message_manager::{MessageManager, DEFAULT_IDLE_WAIT};
use crate::native;

// =============================================================================
// Configuration
// =============================================================================

/// Settings for [`run_app`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    command_line: String,
    idle_wait: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub const fn new() -> Self {
        Self {
            command_line: String::new(),
            idle_wait: DEFAULT_IDLE_WAIT,
        }
    }

    /// The command line handed to [`ApplicationBase::initialise`].
    pub fn with_command_line(mut self, command_line: impl Into<String>) -> Self {
        self.command_line = command_line.into();
        self
    }

    /// The longest the dispatch loop sleeps between rounds when nothing is
    /// posted.
    pub const fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub const fn idle_wait(&self) -> Duration {
        self.idle_wait
    }
}

// =============================================================================
// App
// =============================================================================

/// Identifies a timer started with [`AppHandle::start_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppTimerId(i32);

impl AppTimerId {
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

/// An application run by [`run_app`].
pub trait App: 'static {
    fn name(&self) -> String;
    fn version(&self) -> String;

    /// Called on the message thread before the dispatch loop starts.
    fn initialise(&mut self, handle: AppHandle<Self>);

    /// Called on the message thread after the dispatch loop has stopped.
    fn shutdown(&mut self);

    fn timer_callback(&mut self, _handle: AppHandle<Self>, _timer: AppTimerId) {}

    /// The platform asked the application to quit. The default quits.
    fn system_requested_quit(&mut self, handle: AppHandle<Self>) {
        handle.quit();
    }
}

/// Handles messages of type `M` sent through [`AppHandle::send`].
pub trait On<M>: App {
    fn on(&mut self, message: M);
}

#[derive(Debug)]
struct AppState {
    next_timer_id: AtomicI32,
    exit_code: AtomicI32,
}

/// A thread-safe way to reach a running [`App`].
pub struct AppHandle<A: ?Sized> {
    messages: MessageManager,
    state: Arc<AppState>,
    _app: PhantomData<fn() -> A>,
}

impl<A: ?Sized> Clone for AppHandle<A> {
    fn clone(&self) -> Self {
        Self {
            messages: self.messages.clone(),
            state: Arc::clone(&self.state),
            _app: PhantomData,
        }
    }
}

impl<A: ?Sized> fmt::Debug for AppHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppHandle")
            .field("messages", &self.messages)
            .field("state", &self.state)
            .finish()
    }
}

impl<A: App> AppHandle<A> {
    fn new(messages: MessageManager) -> Self {
        Self {
            messages,
            state: Arc::new(AppState {
                next_timer_id: AtomicI32::new(1),
                exit_code: AtomicI32::new(0),
            }),
            _app: PhantomData,
        }
    }

    /// Delivers `message` to the application's [`On<M>`] handler on the
    /// message thread.
    pub fn send<M>(&self, message: M)
    where
        A: On<M>,
        M: Send + 'static,
    {
        self.messages.call_async(move || {
            with_app(|app: &mut A| app.on(message));
        });
    }

    /// Starts a repeating timer. The application's
    /// [`timer_callback`](App::timer_callback) receives the returned id.
    pub fn start_timer(&self, interval: Duration) -> AppTimerId {
        let timer_id = self.state.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let interval_ms = i32::try_from(interval.as_millis()).unwrap_or(i32::MAX);
        self.messages
            .call_async(move || application::start_app_timer(timer_id, interval_ms));
        AppTimerId(timer_id)
    }

    pub fn stop_timer(&self, timer: AppTimerId) {
        self.messages
            .call_async(move || application::stop_app_timer(timer.0));
    }

    /// Runs `f` with the application on the message thread.
    pub fn call_on_main_thread(&self, f: impl FnOnce(&mut A, AppHandle<A>) + Send + 'static) {
        self.messages.call_async(move || {
            with_wrapper(|wrapper: &mut AppWrapper<A>| f(&mut wrapper.app, wrapper.handle.clone()));
        });
    }

}

impl<A: ?Sized> AppHandle<A> {
    /// Stops the dispatch loop; [`run_app`] then shuts the application down.
    pub fn quit(&self) {
        self.messages.stop_dispatch_loop();
    }

    /// Sets the value [`run_app`] returns.
    pub fn set_exit_code(&self, exit_code: i32) {
        self.state.exit_code.store(exit_code, Ordering::Relaxed);
    }

    pub fn is_quitting(&self) -> bool {
        self.messages.has_stop_message_been_sent()
    }
}

struct AppWrapper<A: App> {
    app: A,
    handle: AppHandle<A>,
}

impl<A: App> ApplicationBase for AppWrapper<A> {
    fn name(&self) -> String {
        self.app.name()
    }

    fn version(&self) -> String {
        self.app.version()
    }

    fn initialise(&mut self, _command_line: &str) {
        self.app.initialise(self.handle.clone());
    }

    fn shutdown(&mut self) {
        self.app.shutdown();
    }

    fn system_requested_quit(&mut self) {
        self.app.system_requested_quit(self.handle.clone());
    }

    fn timer_callback(&mut self, timer_id: i32) {
        self.app
            .timer_callback(self.handle.clone(), AppTimerId(timer_id));
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}

fn with_wrapper<A: App, R>(f: impl FnOnce(&mut AppWrapper<A>) -> R) -> Option<R> {
    application::with_instance(|adapter| {
        let wrapper = adapter
            .application_mut()?
            .as_any_mut()?
            .downcast_mut::<AppWrapper<A>>()?;
        Some(f(wrapper))
    })
    .flatten()
}

/// Runs `f` with this thread's application if it is an `A`.
pub fn with_app<A: App, R>(f: impl FnOnce(&mut A) -> R) -> Option<R> {
    with_wrapper(|wrapper: &mut AppWrapper<A>| f(&mut wrapper.app))
}

/// Runs an application on the calling thread until it quits.
///
/// Initialises the runtime, installs the application created by `create`,
/// calls its `initialise`, runs the dispatch loop, then calls `shutdown`
/// and uninstalls it. Returns the exit code set through
/// [`AppHandle::set_exit_code`] (0 by default).
pub fn run_app<A: App>(config: &AppConfig, create: impl FnOnce() -> A) -> Result<i32> {
    let _runtime = Runtime::initialise()?;
    let messages = MessageManager::new();
    let handle = AppHandle::new(messages.clone());
    let state = Arc::clone(&handle.state);

    application::install(Box::new(AppWrapper {
        app: create(),
        handle,
    }))?;

    let command_line = NativeString::new(config.command_line());
    application::with_instance(|adapter| native::ApplicationBase::initialise(adapter, &command_line));
    messages.run_dispatch_loop_with(config.idle_wait());
    application::with_instance(|adapter| native::ApplicationBase::shutdown(adapter));

    application::uninstall();
    log::debug!("application uninstalled");
    Ok(state.exit_code.load(Ordering::Relaxed))
}
