//! Foreign audio device types (driver backends).

use juncture_core::{NativeString, Result, StringArray};

use crate::device::AudioDevice;
use crate::native;

/// A type of audio driver (e.g. CoreAudio, ASIO) implemented outside the
/// framework.
pub trait AudioDeviceType: Send {
    /// The name of the type of driver.
    fn name(&self) -> String;

    /// Refreshes the driver's cached list of known devices.
    fn scan_for_devices(&mut self);

    /// Returns a list of known input devices.
    fn input_devices(&self) -> Vec<String>;

    /// Returns a list of the known output devices.
    fn output_devices(&self) -> Vec<String>;

    /// Returns the index of the default device.
    fn default_device_index(&self, _for_input: bool) -> i32 {
        0
    }

    /// Returns true if the device type has separate inputs and outputs.
    fn has_separate_inputs_and_outputs(&self) -> bool {
        true
    }

    /// Creates an [`AudioDevice`].
    fn create_device(
        &mut self,
        input_device_name: &str,
        output_device_name: &str,
    ) -> Result<Box<dyn AudioDevice>>;
}

juncture_core::capability! {
    /// Owned handle to a foreign [`AudioDeviceType`].
    pub type BoxDynAudioDeviceType = dyn AudioDeviceType as "AudioDeviceType";
    wrap = AudioDeviceTypeAdapter => dyn native::AudioIODeviceType;
}

/// Native device type backed by a foreign [`AudioDeviceType`].
#[derive(Debug)]
pub struct AudioDeviceTypeAdapter {
    device_type: BoxDynAudioDeviceType,
}

impl AudioDeviceTypeAdapter {
    pub fn new(device_type: BoxDynAudioDeviceType) -> Self {
        Self { device_type }
    }
}

impl native::AudioIODeviceType for AudioDeviceTypeAdapter {
    fn type_name(&self) -> NativeString {
        self.device_type
            .forward("name", NativeString::empty(), |device_type| device_type.name().into())
    }

    fn scan_for_devices(&mut self) {
        self.device_type
            .forward_mut("scan_for_devices", (), |device_type| device_type.scan_for_devices());
    }

    fn device_names(&self, want_input_names: bool) -> StringArray {
        let operation = if want_input_names {
            "input_devices"
        } else {
            "output_devices"
        };
        self.device_type
            .forward(operation, StringArray::new(), |device_type| {
                let names = if want_input_names {
                    device_type.input_devices()
                } else {
                    device_type.output_devices()
                };
                names.into_iter().collect()
            })
    }

    fn default_device_index(&self, for_input: bool) -> i32 {
        self.device_type.forward("default_device_index", 0, |device_type| {
            device_type.default_device_index(for_input)
        })
    }

    fn has_separate_inputs_and_outputs(&self) -> bool {
        self.device_type
            .forward("has_separate_inputs_and_outputs", false, |device_type| {
                device_type.has_separate_inputs_and_outputs()
            })
    }

    fn create_device(
        &mut self,
        output_device_name: &NativeString,
        input_device_name: &NativeString,
    ) -> Option<Box<dyn native::AudioIODevice>> {
        let (input, output) = (input_device_name.view(), output_device_name.view());
        let created = self.device_type.forward_mut("create_device", None, |device_type| {
            Some(device_type.create_device(input.as_str(), output.as_str()))
        })?;
        match created {
            Ok(device) => Some(device.into()),
            Err(err) => {
                log::warn!(
                    "could not create audio device (input {:?}, output {:?}): {err}",
                    input.as_str(),
                    output.as_str()
                );
                None
            }
        }
    }
}
