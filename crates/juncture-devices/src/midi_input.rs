//! MIDI inputs and foreign MIDI input callbacks.

use juncture_core::MidiMessage;

use crate::midi_device_info::MidiDeviceInfo;
use crate::native;

/// Receiver of incoming MIDI messages, called on the MIDI input thread.
///
/// Any `FnMut(&MidiMessage) + Send` closure is a callback.
pub trait MidiInputCallback: Send {
    /// Called for each incoming message.
    fn handle_incoming_midi_message(&mut self, message: &MidiMessage);
}

impl<F> MidiInputCallback for F
where
    F: FnMut(&MidiMessage) + Send,
{
    fn handle_incoming_midi_message(&mut self, message: &MidiMessage) {
        self(message);
    }
}

juncture_core::capability! {
    /// Owned handle to a foreign [`MidiInputCallback`].
    pub type BoxDynMidiInputCallback = dyn MidiInputCallback as "MidiInputCallback";
    wrap = MidiInputCallbackAdapter => dyn native::MidiInputCallback;
}

/// Native MIDI callback backed by a foreign [`MidiInputCallback`].
#[derive(Debug)]
pub struct MidiInputCallbackAdapter {
    callback: BoxDynMidiInputCallback,
}

impl MidiInputCallbackAdapter {
    pub fn new(callback: BoxDynMidiInputCallback) -> Self {
        Self { callback }
    }
}

impl native::MidiInputCallback for MidiInputCallbackAdapter {
    fn handle_incoming_midi_message(&mut self, message: &MidiMessage) {
        self.callback
            .forward_mut("handle_incoming_midi_message", (), |callback| {
                callback.handle_incoming_midi_message(message)
            });
    }
}

/// An open MIDI input device with its callback attached.
///
/// Messages are delivered to the callback only between [`start`](Self::start)
/// and [`stop`](Self::stop).
pub struct MidiInput {
    info: MidiDeviceInfo,
    callback: Box<dyn native::MidiInputCallback>,
    started: bool,
}

impl MidiInput {
    /// Opens a MIDI input device and registers a callback for incoming
    /// messages.
    pub fn open(info: MidiDeviceInfo, callback: impl MidiInputCallback + 'static) -> Self {
        let callback: Box<dyn MidiInputCallback> = Box::new(callback);
        Self::open_with(info, callback.into())
    }

    /// Opens a MIDI input device with an already wrapped native callback.
    pub fn open_with(info: MidiDeviceInfo, callback: Box<dyn native::MidiInputCallback>) -> Self {
        log::debug!("opened MIDI input {info}");
        Self {
            info,
            callback,
            started: false,
        }
    }

    /// Returns the device info for this input.
    pub fn device_info(&self) -> &MidiDeviceInfo {
        &self.info
    }

    /// Starts listening for MIDI input.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Stops listening for MIDI input.
    pub fn stop(&mut self) {
        self.started = false;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Delivers one message from the device. Returns `false` if the input is
    /// stopped and the message was dropped.
    pub fn handle_incoming(&mut self, message: &MidiMessage) -> bool {
        if !self.started {
            return false;
        }
        self.callback.handle_incoming_midi_message(message);
        true
    }
}

impl Drop for MidiInput {
    fn drop(&mut self) {
        log::debug!("closed MIDI input {}", self.info);
    }
}
