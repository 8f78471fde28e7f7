//! Native message thread interfaces.
//!
//! The message manager queues [`CallAsyncCallback`]s and the application
//! slot holds an [`ApplicationBase`]. Adapters in this crate implement both
//! by forwarding to foreign capability objects.

use juncture_core::NativeString;

/// A unit of deferred work, run once on the message thread.
pub trait CallAsyncCallback: Send {
    fn call(&mut self);
}

/// The application object driven by the message thread.
pub trait ApplicationBase {
    fn application_name(&self) -> NativeString;
    fn application_version(&self) -> NativeString;
    fn more_than_one_instance_allowed(&self) -> bool;

    /// Called once the message thread is running, before any message is
    /// dispatched.
    fn initialise(&mut self, command_line: &NativeString);

    /// Called after the dispatch loop has stopped.
    fn shutdown(&mut self);

    fn another_instance_started(&mut self, command_line: &NativeString);
    fn system_requested_quit(&mut self);
    fn suspended(&mut self);
    fn resumed(&mut self);
    fn unhandled_exception(&mut self, message: &NativeString);

    /// Called each time the application timer `timer_id` elapses.
    fn timer_callback(&mut self, timer_id: i32);
}
