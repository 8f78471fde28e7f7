//! Native audio device interfaces.
//!
//! These are the interfaces the framework drives. They speak native value
//! types only ([`NativeString`], [`StringArray`], [`DoubleArray`],
//! [`IntArray`], [`BigInteger`]) and report failure the native way: a
//! non-empty status string, an empty result, or a default value. Foreign
//! implementations reach them through the adapters in this crate.

use juncture_core::{
    BigInteger, DoubleArray, IntArray, MidiMessage, NativeString, StringArray,
};

/// An audio I/O device.
pub trait AudioIODevice: Send {
    fn name(&self) -> NativeString;
    fn type_name(&self) -> NativeString;

    fn output_channel_names(&mut self) -> StringArray;
    fn input_channel_names(&mut self) -> StringArray;

    fn available_sample_rates(&mut self) -> DoubleArray;
    fn available_buffer_sizes(&mut self) -> IntArray;
    fn default_buffer_size(&mut self) -> i32;

    /// Opens the device. Returns an empty string on success, otherwise an
    /// error message.
    fn open(
        &mut self,
        input_channels: &BigInteger,
        output_channels: &BigInteger,
        sample_rate: f64,
        buffer_size_samples: i32,
    ) -> NativeString;
    fn close(&mut self);
    fn is_open(&mut self) -> bool;

    fn start(&mut self);
    fn stop(&mut self);
    fn is_playing(&mut self) -> bool;

    fn last_error(&mut self) -> NativeString;

    fn current_buffer_size_samples(&mut self) -> i32;
    fn current_sample_rate(&mut self) -> f64;
    fn current_bit_depth(&mut self) -> i32;

    fn active_output_channels(&self) -> BigInteger;
    fn active_input_channels(&self) -> BigInteger;

    fn output_latency_in_samples(&mut self) -> i32;
    fn input_latency_in_samples(&mut self) -> i32;

    fn has_control_panel(&self) -> bool;
    fn show_control_panel(&mut self) -> bool;

    fn set_audio_preprocessing_enabled(&mut self, enabled: bool) -> bool;

    /// Number of buffer under/overruns, or -1 if unknown.
    fn xrun_count(&self) -> i32;
}

/// A device driver backend that enumerates and creates devices.
pub trait AudioIODeviceType: Send {
    fn type_name(&self) -> NativeString;
    fn scan_for_devices(&mut self);

    /// Device names for inputs or outputs.
    fn device_names(&self, want_input_names: bool) -> StringArray;
    fn default_device_index(&self, for_input: bool) -> i32;
    fn has_separate_inputs_and_outputs(&self) -> bool;

    /// Creates a device, or returns `None` on failure.
    fn create_device(
        &mut self,
        output_device_name: &NativeString,
        input_device_name: &NativeString,
    ) -> Option<Box<dyn AudioIODevice>>;
}

/// Receiver of audio blocks from a running device.
pub trait AudioIODeviceCallback: Send {
    /// Called before the first block. `None` means the framework had no
    /// device to pass.
    fn audio_device_about_to_start(&mut self, device: Option<&mut dyn AudioIODevice>);

    /// Processes one block.
    ///
    /// # Safety
    ///
    /// Unless null, `input_channel_data` must point to `num_input_channels`
    /// pointers and `output_channel_data` to `num_output_channels` pointers;
    /// each channel pointer must be null or valid for `num_samples` samples
    /// (writable for outputs) for the duration of the call.
    unsafe fn audio_device_io_callback(
        &mut self,
        input_channel_data: *const *const f32,
        num_input_channels: i32,
        output_channel_data: *const *mut f32,
        num_output_channels: i32,
        num_samples: i32,
    );

    fn audio_device_stopped(&mut self);
}

/// Receiver of incoming MIDI messages.
pub trait MidiInputCallback: Send {
    fn handle_incoming_midi_message(&mut self, message: &MidiMessage);
}
