//! Audio and MIDI device capabilities for juncture.
//!
//! Each foreign trait here ([`AudioDevice`], [`AudioDeviceType`],
//! [`AudioDeviceCallback`], [`MidiInputCallback`]) has a matching native
//! interface in [`native`] and an adapter that implements the native
//! interface by forwarding to a [`BoxDyn`](juncture_core::BoxDyn) handle.
//! Converting a `Box<dyn AudioDevice>` into a `Box<dyn native::AudioIODevice>`
//! with `into()` performs the wrap.
//!
//! [`AudioDeviceManager`] ties them together: it owns the device types and
//! the open device and fans each audio block out to the registered
//! callbacks.
//!
//! # Example
//!
//! ```no_run
//! use juncture_devices::{AudioDeviceManager, InputAudioSampleBuffer, OutputAudioSampleBuffer};
//!
//! let mut manager = AudioDeviceManager::new();
//! // manager.add_audio_device_type(MyBackend::new());
//! manager.initialise(0, 2)?;
//!
//! let _handle = manager.add_audio_callback(
//!     |_input: &InputAudioSampleBuffer<'_>, output: &mut OutputAudioSampleBuffer<'_>| {
//!         output.clear();
//!     },
//! );
//! # Ok::<(), juncture_core::Error>(())
//! ```

pub mod device;
pub mod device_callback;
pub mod device_type;
pub mod manager;
pub mod midi_device_info;
pub mod midi_input;
pub mod native;
pub mod setup;

pub use device::{AudioDevice, AudioDeviceAdapter, BoxDynAudioDevice};
pub use device_callback::{AudioDeviceCallback, AudioDeviceCallbackAdapter, BoxDynAudioDeviceCallback};
pub use device_type::{AudioDeviceType, AudioDeviceTypeAdapter, BoxDynAudioDeviceType};
pub use manager::{AudioCallbackHandle, AudioDeviceManager};
pub use midi_device_info::{MidiDeviceInfo, MidiDeviceInfoArray};
pub use midi_input::{BoxDynMidiInputCallback, MidiInput, MidiInputCallback, MidiInputCallbackAdapter};
pub use setup::{AudioDeviceSetup, ChannelCount};

pub use juncture_core::{InputAudioSampleBuffer, MidiMessage, OutputAudioSampleBuffer};
