//! # Juncture
//!
//! Rust implementations of an audio framework's extension points.
//!
//! Each extension point is a *capability*: a Rust trait (audio device,
//! device type, audio callback, MIDI input callback, plugin format, plugin
//! instance, application, deferred call) whose objects travel into the
//! framework inside a [`BoxDyn`](core::BoxDyn) handle and are driven
//! through an adapter implementing the framework's native interface.
//!
//! ## Architecture
//!
//! ```text
//! Your type (implements AudioDevice, AudioPlugin, App, ...)
//!        ↓
//! BoxDyn<dyn Capability> (owning handle, panic barrier)
//!        ↓
//! Adapter (implements the native interface)
//!        ↓
//! AudioDeviceManager / AudioPluginFormatManager / MessageManager
//! ```
//!
//! ## Features
//!
//! - `devices`: audio devices, device types, callbacks and MIDI input
//! - `processors`: plugin formats and hosted plugin instances
//! - `events`: message thread, timers and applications
//!
//! All three are enabled by default.
//!
//! ```rust,ignore
//! use juncture::prelude::*;
//!
//! let mut devices = AudioDeviceManager::new();
//! devices.add_audio_device_type(MyDeviceType::default());
//! devices.initialise(0, 2)?;
//! let _callback = devices.add_audio_callback(MySynth::default());
//! ```

pub use juncture_core as core;

#[cfg(feature = "devices")]
pub use juncture_devices as devices;

#[cfg(feature = "processors")]
pub use juncture_processors as processors;

#[cfg(feature = "events")]
pub use juncture_events as events;

pub use juncture_core::{capability, Error, Result, Runtime};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use juncture::prelude::*;
/// ```
pub mod prelude {
    pub use juncture_core::{
        // Audio and MIDI
        AudioBuffer, InputAudioSampleBuffer, MidiBuffer, MidiEvent, MidiMessage,
        OutputAudioSampleBuffer,
        // Native values
        BigInteger, NativeString, StringArray, Time,
        // Handles
        BoxDyn,
        // Errors and runtime
        Error, Result, Runtime,
    };

    #[cfg(feature = "devices")]
    pub use juncture_devices::{
        AudioCallbackHandle, AudioDevice, AudioDeviceCallback, AudioDeviceManager,
        AudioDeviceSetup, AudioDeviceType, ChannelCount, MidiDeviceInfo, MidiInput,
        MidiInputCallback,
    };

    #[cfg(feature = "processors")]
    pub use juncture_processors::{
        AudioPlugin, AudioPluginFormat, AudioPluginFormatManager, FileSearchPath,
        PluginDescription,
    };

    #[cfg(feature = "events")]
    pub use juncture_events::{
        run_app, App, AppConfig, AppHandle, AppTimerId, ApplicationBase, CallAsyncCallback,
        MessageManager, MultiTimer, On,
    };
}
