//! Audio device setup.

use juncture_core::{BigInteger, NativeString, Result};
use serde::{Deserialize, Serialize};

/// The number of channels to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCount {
    /// Use the default number of channels for the device.
    Default,

    /// Use a custom number of channels.
    Custom(i32),
}

/// The properties of an audio device.
///
/// A sample rate or buffer size of zero means "use the device default".
#[repr(C)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioDeviceSetup {
    pub output_device_name: NativeString,
    pub input_device_name: NativeString,
    pub sample_rate: f64,
    pub buffer_size: i32,
    pub input_channels: BigInteger,
    pub use_default_input_channels: bool,
    pub output_channels: BigInteger,
    pub use_default_output_channels: bool,
}

juncture_core::layout_contract! {
    /// Declared layout of [`AudioDeviceSetup`].
    pub const AUDIO_DEVICE_SETUP_LAYOUT: AudioDeviceSetup {
        size = 96,
        align = 8,
        output_device_name = 0,
        input_device_name = 8,
        sample_rate = 16,
        buffer_size = 24,
        input_channels = 32,
        use_default_input_channels = 56,
        output_channels = 64,
        use_default_output_channels = 88,
    }
}

impl Default for AudioDeviceSetup {
    fn default() -> Self {
        Self {
            output_device_name: NativeString::empty(),
            input_device_name: NativeString::empty(),
            sample_rate: 0.0,
            buffer_size: 0,
            input_channels: BigInteger::new(),
            use_default_input_channels: true,
            output_channels: BigInteger::new(),
            use_default_output_channels: true,
        }
    }
}

impl AudioDeviceSetup {
    pub fn output_device_name(&self) -> &str {
        self.output_device_name.as_str()
    }

    pub fn with_output_device_name(mut self, name: impl AsRef<str>) -> Self {
        self.output_device_name = NativeString::new(name.as_ref());
        self
    }

    pub fn input_device_name(&self) -> &str {
        self.input_device_name.as_str()
    }

    pub fn with_input_device_name(mut self, name: impl AsRef<str>) -> Self {
        self.input_device_name = NativeString::new(name.as_ref());
        self
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size.max(0) as usize
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = i32::try_from(buffer_size).unwrap_or(i32::MAX);
        self
    }

    pub fn input_channels(&self) -> ChannelCount {
        if self.use_default_input_channels {
            ChannelCount::Default
        } else {
            ChannelCount::Custom(self.input_channels.count_number_of_set_bits())
        }
    }

    pub fn with_input_channels(mut self, channels: ChannelCount) -> Self {
        match channels {
            ChannelCount::Default => {
                self.use_default_input_channels = true;
            }
            ChannelCount::Custom(count) => {
                self.use_default_input_channels = false;
                self.input_channels.clear().set_range(0, count, true);
            }
        }
        self
    }

    pub fn output_channels(&self) -> ChannelCount {
        if self.use_default_output_channels {
            ChannelCount::Default
        } else {
            ChannelCount::Custom(self.output_channels.count_number_of_set_bits())
        }
    }

    pub fn with_output_channels(mut self, channels: ChannelCount) -> Self {
        match channels {
            ChannelCount::Default => {
                self.use_default_output_channels = true;
            }
            ChannelCount::Custom(count) => {
                self.use_default_output_channels = false;
                self.output_channels.clear().set_range(0, count, true);
            }
        }
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
