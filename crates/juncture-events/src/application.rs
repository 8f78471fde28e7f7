//! The application capability and the per-thread application slot.
//!
//! At most one application is installed on a thread. Application timers are
//! addressed by id through [`start_app_timer`] and [`stop_app_timer`]; with
//! no application installed both are no-ops.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use juncture_core::{Error, NativeString, Result};

use crate::native;
use crate::timer::MultiTimer;

/// An application implemented outside the framework.
///
/// Only [`name`](Self::name), [`version`](Self::version),
/// [`initialise`](Self::initialise) and [`shutdown`](Self::shutdown) are
/// required.
pub trait ApplicationBase {
    fn name(&self) -> String;
    fn version(&self) -> String;

    /// Called once the message thread is running.
    fn initialise(&mut self, command_line: &str);

    /// Called after the dispatch loop has stopped.
    fn shutdown(&mut self);

    fn more_than_one_instance_allowed(&self) -> bool {
        true
    }

    fn another_instance_started(&mut self, _command_line: &str) {}

    fn system_requested_quit(&mut self) {}

    fn suspended(&mut self) {}

    fn resumed(&mut self) {}

    fn unhandled_exception(&mut self, message: &str) {
        log::error!("unhandled exception in {}: {message}", self.name());
    }

    fn timer_callback(&mut self, _timer_id: i32) {}

    /// Access to the concrete application, for callers that know its type.
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

juncture_core::capability! {
    /// Owned handle to a foreign [`ApplicationBase`].
    pub type BoxDynApplicationBase = dyn ApplicationBase as "ApplicationBase";
    wrap = ApplicationBaseAdapter => dyn native::ApplicationBase;
}

/// Native application backed by a foreign [`ApplicationBase`], together
/// with its timers.
#[derive(Debug)]
pub struct ApplicationBaseAdapter {
    app: BoxDynApplicationBase,
    timers: Rc<MultiTimer>,
}

impl ApplicationBaseAdapter {
    pub fn new(app: BoxDynApplicationBase) -> Self {
        Self {
            app,
            timers: Rc::default(),
        }
    }

    /// The foreign application, unless the handle is empty.
    pub fn application_mut(&mut self) -> Option<&mut (dyn ApplicationBase + 'static)> {
        self.app.get_mut()
    }

    pub fn timers(&self) -> &MultiTimer {
        &self.timers
    }
}

impl native::ApplicationBase for ApplicationBaseAdapter {
    fn application_name(&self) -> NativeString {
        self.app.forward("name", NativeString::empty(), |app| app.name().into())
    }

    fn application_version(&self) -> NativeString {
        self.app
            .forward("version", NativeString::empty(), |app| app.version().into())
    }

    fn more_than_one_instance_allowed(&self) -> bool {
        self.app.forward("more_than_one_instance_allowed", true, |app| {
            app.more_than_one_instance_allowed()
        })
    }

    fn initialise(&mut self, command_line: &NativeString) {
        self.app
            .forward_mut("initialise", (), |app| app.initialise(command_line.as_str()));
    }

    fn shutdown(&mut self) {
        self.app.forward_mut("shutdown", (), |app| app.shutdown());
    }

    fn another_instance_started(&mut self, command_line: &NativeString) {
        self.app.forward_mut("another_instance_started", (), |app| {
            app.another_instance_started(command_line.as_str())
        });
    }

    fn system_requested_quit(&mut self) {
        self.app
            .forward_mut("system_requested_quit", (), |app| app.system_requested_quit());
    }

    fn suspended(&mut self) {
        self.app.forward_mut("suspended", (), |app| app.suspended());
    }

    fn resumed(&mut self) {
        self.app.forward_mut("resumed", (), |app| app.resumed());
    }

    fn unhandled_exception(&mut self, message: &NativeString) {
        self.app.forward_mut("unhandled_exception", (), |app| {
            app.unhandled_exception(message.as_str())
        });
    }

    fn timer_callback(&mut self, timer_id: i32) {
        self.app
            .forward_mut("timer_callback", (), |app| app.timer_callback(timer_id));
    }
}

// =============================================================================
// Application slot
// =============================================================================

struct Installed {
    adapter: RefCell<ApplicationBaseAdapter>,
    // Outside the adapter's cell so timers can change while the
    // application is borrowed.
    timers: Rc<MultiTimer>,
}

thread_local! {
    static INSTANCE: RefCell<Option<Rc<Installed>>> = const { RefCell::new(None) };
}

fn installed() -> Option<Rc<Installed>> {
    INSTANCE.with(|slot| slot.borrow().clone())
}

/// Installs `app` as this thread's application.
///
/// Fails with [`Error::ApplicationAlreadyInstalled`] if one is installed.
pub fn install(app: Box<dyn ApplicationBase>) -> Result<()> {
    INSTANCE.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            return Err(Error::ApplicationAlreadyInstalled);
        }
        let adapter = ApplicationBaseAdapter::new(BoxDynApplicationBase::new(app));
        let timers = Rc::clone(&adapter.timers);
        log::debug!("installed application {}", native::ApplicationBase::application_name(&adapter));
        *slot = Some(Rc::new(Installed {
            adapter: RefCell::new(adapter),
            timers,
        }));
        Ok(())
    })
}

/// Removes and drops this thread's application. Returns `false` if none
/// was installed.
pub fn uninstall() -> bool {
    // Dropped outside the slot borrow; the application may look at the
    // slot from its destructor.
    let removed = INSTANCE.with(|slot| slot.borrow_mut().take());
    removed.is_some()
}

pub fn is_installed() -> bool {
    INSTANCE.with(|slot| slot.borrow().is_some())
}

/// Runs `f` with this thread's application.
///
/// Returns `None` if no application is installed, or if the application is
/// already borrowed further up the stack.
pub fn with_instance<R>(f: impl FnOnce(&mut ApplicationBaseAdapter) -> R) -> Option<R> {
    let installed = installed()?;
    let Ok(mut adapter) = installed.adapter.try_borrow_mut() else {
        log::warn!("the application is already in use on this thread");
        return None;
    };
    Some(f(&mut adapter))
}

/// Starts (or restarts) application timer `timer_id`. No-op if no
/// application is installed.
pub fn start_app_timer(timer_id: i32, interval_ms: i32) {
    match installed() {
        Some(installed) => installed.timers.start_timer(timer_id, interval_ms),
        None => log::debug!("start_app_timer({timer_id}) ignored: no application"),
    }
}

/// Stops application timer `timer_id`. No-op if no application is
/// installed.
pub fn stop_app_timer(timer_id: i32) {
    if let Some(installed) = installed() {
        installed.timers.stop_timer(timer_id);
    }
}

/// Fires the due application timers and returns the time until the next
/// one, if any is running.
pub fn poll_app_timers() -> Option<Duration> {
    poll_app_timers_at(Instant::now())
}

/// [`poll_app_timers`] at an explicit time.
pub fn poll_app_timers_at(now: Instant) -> Option<Duration> {
    let installed = installed()?;
    installed.timers.poll(now, |timer_id| {
        match installed.adapter.try_borrow_mut() {
            Ok(mut adapter) => native::ApplicationBase::timer_callback(&mut *adapter, timer_id),
            Err(_) => log::warn!("timer {timer_id} skipped: the application is in use"),
        }
    });
    installed
        .timers
        .next_due()
        .map(|next_due| next_due.saturating_duration_since(now))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records application callbacks.
    #[derive(Debug, Clone, Default)]
    pub struct CallLog(Arc<Mutex<Vec<String>>>);

    impl CallLog {
        pub fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        pub fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    pub struct RecordingApp {
        log: CallLog,
    }

    impl RecordingApp {
        pub fn new(log: &CallLog) -> Self {
            Self { log: log.clone() }
        }
    }

    impl ApplicationBase for RecordingApp {
        fn name(&self) -> String {
            "Recorder".to_string()
        }

        fn version(&self) -> String {
            "1.0.0".to_string()
        }

        fn initialise(&mut self, command_line: &str) {
            self.log.push(format!("initialise {command_line}"));
        }

        fn shutdown(&mut self) {
            self.log.push("shutdown");
        }

        fn timer_callback(&mut self, timer_id: i32) {
            self.log.push(format!("timer {timer_id}"));
        }

        fn suspended(&mut self) {
            panic!("suspend failed");
        }
    }

    impl Drop for RecordingApp {
        fn drop(&mut self) {
            self.log.push("drop");
        }
    }

    #[test]
    fn test_app_timers_without_application_are_ignored() {
        assert!(!is_installed());
        start_app_timer(1, 100);
        start_app_timer(2, 100);
        stop_app_timer(1);
        assert_eq!(poll_app_timers(), None);

        // Nothing was remembered for a later application.
        let log = CallLog::default();
        install(Box::new(RecordingApp::new(&log))).unwrap();
        let later = Instant::now() + Duration::from_millis(200);
        assert_eq!(poll_app_timers_at(later), None);
        assert!(log.entries().is_empty());
        assert!(with_instance(|adapter| adapter.timers().num_running() == 0).unwrap());
        assert!(uninstall());
    }

    #[test]
    fn test_app_timer_fires_once_per_interval() {
        let log = CallLog::default();
        install(Box::new(RecordingApp::new(&log))).unwrap();

        start_app_timer(1, 100);
        let started = Instant::now();
        for elapsed in [100, 200, 300] {
            poll_app_timers_at(started + Duration::from_millis(elapsed));
        }
        stop_app_timer(1);
        assert_eq!(poll_app_timers_at(started + Duration::from_millis(400)), None);

        assert_eq!(log.entries(), ["timer 1", "timer 1", "timer 1"]);
        assert!(uninstall());
        assert_eq!(log.entries().last().map(String::as_str), Some("drop"));
    }

    #[test]
    fn test_single_installation_per_thread() {
        let log = CallLog::default();
        install(Box::new(RecordingApp::new(&log))).unwrap();
        assert_eq!(
            install(Box::new(RecordingApp::new(&log))),
            Err(Error::ApplicationAlreadyInstalled)
        );
        // The rejected application was dropped.
        assert_eq!(log.entries(), ["drop"]);

        let other_thread = std::thread::spawn(is_installed).join().unwrap();
        assert!(!other_thread);

        assert!(uninstall());
        assert!(!uninstall());
    }

    #[test]
    fn test_adapter_forwards_and_contains_panics() {
        let log = CallLog::default();
        let app: Box<dyn ApplicationBase> = Box::new(RecordingApp::new(&log));
        let mut native: Box<dyn native::ApplicationBase> = app.into();

        assert_eq!(native.application_name(), "Recorder");
        assert_eq!(native.application_version(), "1.0.0");
        assert!(native.more_than_one_instance_allowed());
        native.initialise(&NativeString::new("--verbose"));
        native.suspended();
        native.timer_callback(4);
        native.shutdown();
        drop(native);

        assert_eq!(
            log.entries(),
            ["initialise --verbose", "timer 4", "shutdown", "drop"]
        );
    }

    #[test]
    fn test_reentrant_access_is_refused() {
        let log = CallLog::default();
        install(Box::new(RecordingApp::new(&log))).unwrap();

        let inner = with_instance(|_| with_instance(|_| ()));
        assert_eq!(inner, Some(None));
        assert!(uninstall());
    }
}
