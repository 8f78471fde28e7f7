//! Foreign audio devices.
//!
//! Implement [`AudioDevice`] to provide a device the framework can open and
//! run. The device is boxed into a [`BoxDynAudioDevice`] and wrapped in an
//! [`AudioDeviceAdapter`], which implements [`native::AudioIODevice`] by
//! forwarding every call.

use juncture_core::{BigInteger, DoubleArray, IntArray, NativeString, Result, StringArray};

use crate::native;

/// An audio device implemented outside the framework.
pub trait AudioDevice: Send {
    /// The name of the device.
    fn name(&self) -> &str;

    /// The type of the device.
    fn type_name(&self) -> &str;

    /// The current sample rate.
    fn sample_rate(&mut self) -> f64;

    /// The current buffer size.
    fn buffer_size(&mut self) -> i32;

    /// The available sample rates.
    fn available_sample_rates(&mut self) -> Vec<f64>;

    /// The available buffer sizes.
    fn available_buffer_sizes(&mut self) -> Vec<i32>;

    /// The buffer size to use when none is requested.
    fn default_buffer_size(&mut self) -> i32 {
        self.available_buffer_sizes()
            .first()
            .copied()
            .unwrap_or(512)
    }

    /// Tries to open the device with the given configuration.
    fn open(&mut self, sample_rate: f64, buffer_size: i32) -> Result<()>;

    /// Closes the device.
    fn close(&mut self);

    fn is_open(&mut self) -> bool;

    fn start(&mut self) {}

    fn stop(&mut self) {}

    fn is_playing(&mut self) -> bool {
        false
    }

    /// The last error reported by the device, empty if none.
    fn last_error(&mut self) -> String {
        String::new()
    }

    fn bit_depth(&mut self) -> i32 {
        32
    }

    /// The number of input channels.
    fn input_channels(&self) -> i32;

    /// The number of output channels.
    fn output_channels(&self) -> i32;

    fn input_channel_names(&mut self) -> Vec<String> {
        (1..=self.input_channels())
            .map(|channel| format!("Input {channel}"))
            .collect()
    }

    fn output_channel_names(&mut self) -> Vec<String> {
        (1..=self.output_channels())
            .map(|channel| format!("Output {channel}"))
            .collect()
    }

    fn input_latency(&mut self) -> i32 {
        0
    }

    fn output_latency(&mut self) -> i32 {
        0
    }

    fn has_control_panel(&self) -> bool {
        false
    }

    /// Shows the control panel. Returns `true` if settings changed.
    fn show_control_panel(&mut self) -> bool {
        false
    }

    /// Returns `true` if the setting was applied.
    fn set_audio_preprocessing_enabled(&mut self, _enabled: bool) -> bool {
        false
    }

    /// Number of buffer under/overruns, or -1 if unknown.
    fn xrun_count(&self) -> i32 {
        -1
    }
}

juncture_core::capability! {
    /// Owned handle to a foreign [`AudioDevice`].
    pub type BoxDynAudioDevice = dyn AudioDevice as "AudioDevice";
    wrap = AudioDeviceAdapter => dyn native::AudioIODevice;
}

/// Native device backed by a foreign [`AudioDevice`].
#[derive(Debug)]
pub struct AudioDeviceAdapter {
    device: BoxDynAudioDevice,
}

impl AudioDeviceAdapter {
    pub fn new(device: BoxDynAudioDevice) -> Self {
        Self { device }
    }
}

fn strings(names: Vec<String>) -> StringArray {
    names.into_iter().collect()
}

impl native::AudioIODevice for AudioDeviceAdapter {
    fn name(&self) -> NativeString {
        self.device
            .forward("name", NativeString::empty(), |device| device.name().into())
    }

    fn type_name(&self) -> NativeString {
        self.device.forward("type_name", NativeString::empty(), |device| {
            device.type_name().into()
        })
    }

    fn output_channel_names(&mut self) -> StringArray {
        self.device
            .forward_mut("output_channel_names", StringArray::new(), |device| {
                strings(device.output_channel_names())
            })
    }

    fn input_channel_names(&mut self) -> StringArray {
        self.device
            .forward_mut("input_channel_names", StringArray::new(), |device| {
                strings(device.input_channel_names())
            })
    }

    fn available_sample_rates(&mut self) -> DoubleArray {
        self.device
            .forward_mut("available_sample_rates", DoubleArray::new(), |device| {
                let mut rates = DoubleArray::new();
                rates.extend(device.available_sample_rates());
                rates
            })
    }

    fn available_buffer_sizes(&mut self) -> IntArray {
        self.device
            .forward_mut("available_buffer_sizes", IntArray::new(), |device| {
                let mut sizes = IntArray::new();
                sizes.extend(device.available_buffer_sizes());
                sizes
            })
    }

    fn default_buffer_size(&mut self) -> i32 {
        self.device
            .forward_mut("default_buffer_size", 0, |device| device.default_buffer_size())
    }

    fn open(
        &mut self,
        _input_channels: &BigInteger,
        _output_channels: &BigInteger,
        sample_rate: f64,
        buffer_size_samples: i32,
    ) -> NativeString {
        self.device.forward_mut(
            "open",
            NativeString::from("device panicked while opening"),
            |device| match device.open(sample_rate, buffer_size_samples) {
                Ok(()) => NativeString::empty(),
                Err(err) => err.to_string().into(),
            },
        )
    }

    fn close(&mut self) {
        self.device.forward_mut("close", (), |device| device.close());
    }

    fn is_open(&mut self) -> bool {
        self.device.forward_mut("is_open", false, |device| device.is_open())
    }

    fn start(&mut self) {
        self.device.forward_mut("start", (), |device| device.start());
    }

    fn stop(&mut self) {
        self.device.forward_mut("stop", (), |device| device.stop());
    }

    fn is_playing(&mut self) -> bool {
        self.device
            .forward_mut("is_playing", false, |device| device.is_playing())
    }

    fn last_error(&mut self) -> NativeString {
        self.device
            .forward_mut("last_error", NativeString::empty(), |device| {
                device.last_error().into()
            })
    }

    fn current_buffer_size_samples(&mut self) -> i32 {
        self.device
            .forward_mut("buffer_size", 0, |device| device.buffer_size())
    }

    fn current_sample_rate(&mut self) -> f64 {
        self.device
            .forward_mut("sample_rate", 0.0, |device| device.sample_rate())
    }

    fn current_bit_depth(&mut self) -> i32 {
        self.device.forward_mut("bit_depth", 0, |device| device.bit_depth())
    }

    fn active_output_channels(&self) -> BigInteger {
        let channels = self
            .device
            .forward("output_channels", 0, |device| device.output_channels());
        BigInteger::with_low_bits(channels)
    }

    fn active_input_channels(&self) -> BigInteger {
        let channels = self
            .device
            .forward("input_channels", 0, |device| device.input_channels());
        BigInteger::with_low_bits(channels)
    }

    fn output_latency_in_samples(&mut self) -> i32 {
        self.device
            .forward_mut("output_latency", 0, |device| device.output_latency())
    }

    fn input_latency_in_samples(&mut self) -> i32 {
        self.device
            .forward_mut("input_latency", 0, |device| device.input_latency())
    }

    fn has_control_panel(&self) -> bool {
        self.device
            .forward("has_control_panel", false, |device| device.has_control_panel())
    }

    fn show_control_panel(&mut self) -> bool {
        self.device
            .forward_mut("show_control_panel", false, |device| device.show_control_panel())
    }

    fn set_audio_preprocessing_enabled(&mut self, enabled: bool) -> bool {
        self.device
            .forward_mut("set_audio_preprocessing_enabled", false, |device| {
                device.set_audio_preprocessing_enabled(enabled)
            })
    }

    fn xrun_count(&self) -> i32 {
        self.device.forward("xrun_count", -1, |device| device.xrun_count())
    }
}
