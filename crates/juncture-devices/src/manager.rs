//! Audio device management.
//!
//! [`AudioDeviceManager`] owns the registered device types, the open device
//! and an ordered list of audio callbacks. Blocks are pushed into the manager
//! by whoever drives the device (see [`AudioDeviceManager::process_block`]).
//!
//! # Callback Ordering
//!
//! For every callback the manager guarantees this order:
//!
//! 1. `about_to_start` before the first block it sees, either when the device
//!    starts or when the callback is added to a running device.
//! 2. Any number of blocks.
//! 3. `stopped` when the device stops or when the callback is removed from a
//!    running device.
//!
//! # Mixing
//!
//! The first callback renders straight into the device's output channels.
//! Every later callback renders into preallocated scratch channels which are
//! then summed into the output. With no callbacks the output is silenced.

use std::sync::atomic::{AtomicU64, Ordering};

use juncture_core::{
    AudioBuffer, BigInteger, Error, InputAudioSampleBuffer, NativeString, OutputAudioSampleBuffer, Result,
};
use serde::{Deserialize, Serialize};

use crate::device_callback::AudioDeviceCallback;
use crate::device_type::AudioDeviceType;
use crate::native;
use crate::setup::AudioDeviceSetup;

/// Sample rate picked when the setup leaves it unspecified and the device
/// offers it.
const PREFERRED_SAMPLE_RATE: f64 = 44100.0;

/// Identifies a callback registered with an [`AudioDeviceManager`].
#[must_use = "the handle is needed to remove the callback again"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioCallbackHandle(u64);

impl AudioCallbackHandle {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Persisted form of the manager's configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DeviceManagerState {
    device_type: Option<String>,
    setup: AudioDeviceSetup,
}

/// Manages the state of the audio devices.
pub struct AudioDeviceManager {
    device_types: Vec<Box<dyn native::AudioIODeviceType>>,
    current_type: Option<usize>,
    current_device: Option<Box<dyn native::AudioIODevice>>,
    setup: AudioDeviceSetup,
    callbacks: Vec<(AudioCallbackHandle, Box<dyn native::AudioIODeviceCallback>)>,
    running: bool,
    scratch: AudioBuffer,
}

impl Default for AudioDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDeviceManager {
    /// Creates a manager with no device types.
    pub fn new() -> Self {
        Self {
            device_types: Vec::new(),
            current_type: None,
            current_device: None,
            setup: AudioDeviceSetup::default(),
            callbacks: Vec::new(),
            running: false,
            scratch: AudioBuffer::default(),
        }
    }

    // =========================================================================
    // Device types
    // =========================================================================

    /// Registers a foreign device type. The first type registered becomes
    /// the current one.
    pub fn add_audio_device_type(&mut self, device_type: impl AudioDeviceType + 'static) {
        let device_type: Box<dyn AudioDeviceType> = Box::new(device_type);
        self.add_native_audio_device_type(device_type.into());
    }

    /// Registers a native device type.
    pub fn add_native_audio_device_type(&mut self, device_type: Box<dyn native::AudioIODeviceType>) {
        log::debug!("registered audio device type {}", device_type.type_name());
        self.device_types.push(device_type);
        if self.current_type.is_none() {
            self.current_type = Some(0);
        }
    }

    /// The names of the registered device types, in registration order.
    pub fn device_type_names(&self) -> Vec<String> {
        self.device_types
            .iter()
            .map(|device_type| device_type.type_name().to_string())
            .collect()
    }

    pub fn current_device_type(&self) -> Option<&dyn native::AudioIODeviceType> {
        let index = self.current_type?;
        let device_type = self.device_types.get(index)?;
        Some(&**device_type)
    }

    pub fn current_device_type_mut(&mut self) -> Option<&mut dyn native::AudioIODeviceType> {
        let index = self.current_type?;
        let device_type = self.device_types.get_mut(index)?;
        Some(&mut **device_type)
    }

    /// Switches to another registered device type.
    ///
    /// Closes the current device and rescans the new type. The setup's
    /// device names are reset to the new type's defaults; nothing is opened.
    pub fn set_current_audio_device_type(&mut self, name: &str) -> Result<()> {
        let index = self
            .device_types
            .iter()
            .position(|device_type| device_type.type_name() == name)
            .ok_or_else(|| Error::UnknownDeviceType(name.to_string()))?;

        if self.current_type == Some(index) {
            return Ok(());
        }

        self.close_audio_device();
        self.current_type = Some(index);

        let device_type = &mut self.device_types[index];
        device_type.scan_for_devices();
        self.setup.output_device_name = default_device_name(&**device_type, false);
        self.setup.input_device_name = default_device_name(&**device_type, true);
        log::debug!("current audio device type is now {name}");
        Ok(())
    }

    // =========================================================================
    // Device lifecycle
    // =========================================================================

    /// Opens the current type's default devices with the given channel counts.
    pub fn initialise(&mut self, num_input_channels: i32, num_output_channels: i32) -> Result<()> {
        let device_type = self
            .current_device_type_mut()
            .ok_or_else(|| Error::from("no audio device types registered"))?;
        device_type.scan_for_devices();

        let mut setup = AudioDeviceSetup {
            output_device_name: default_device_name(device_type, false),
            use_default_input_channels: false,
            use_default_output_channels: false,
            ..AudioDeviceSetup::default()
        };
        if num_input_channels > 0 {
            setup.input_device_name = default_device_name(device_type, true);
        }
        setup.input_channels.set_range(0, num_input_channels, true);
        setup.output_channels.set_range(0, num_output_channels, true);

        self.set_audio_device_setup(&setup)
    }

    /// The current setup. Sample rate and buffer size hold the values the
    /// device was actually opened with.
    pub fn audio_device_setup(&self) -> AudioDeviceSetup {
        self.setup.clone()
    }

    /// Closes the current device, then creates, opens and starts the device
    /// described by `setup`.
    ///
    /// A setup naming no devices just closes the current one.
    pub fn set_audio_device_setup(&mut self, setup: &AudioDeviceSetup) -> Result<()> {
        let index = self
            .current_type
            .ok_or_else(|| Error::from("no audio device types registered"))?;

        self.close_audio_device();

        if setup.output_device_name.is_empty() && setup.input_device_name.is_empty() {
            self.setup = setup.clone();
            return Ok(());
        }

        let mut device = self.device_types[index]
            .create_device(&setup.output_device_name, &setup.input_device_name)
            .ok_or_else(|| Error::DeviceCreationFailed {
                input: setup.input_device_name.to_string(),
                output: setup.output_device_name.to_string(),
            })?;

        let sample_rate = if setup.sample_rate == 0.0 {
            choose_sample_rate(device.as_mut())
        } else {
            setup.sample_rate
        };
        let buffer_size = if setup.buffer_size > 0 {
            setup.buffer_size
        } else {
            device.default_buffer_size()
        };
        let input_channels = if setup.use_default_input_channels {
            BigInteger::with_low_bits(device.input_channel_names().len() as i32)
        } else {
            setup.input_channels.clone()
        };
        let output_channels = if setup.use_default_output_channels {
            BigInteger::with_low_bits(device.output_channel_names().len() as i32)
        } else {
            setup.output_channels.clone()
        };

        device
            .open(&input_channels, &output_channels, sample_rate, buffer_size)
            .into_result()?;

        let mut opened = setup.clone();
        opened.sample_rate = device.current_sample_rate();
        opened.buffer_size = device.current_buffer_size_samples();
        let block_size = buffer_size.max(opened.buffer_size).max(0) as usize;
        self.setup = opened;

        // Sized for the larger of the requested and reported block sizes, so
        // the audio thread never has to grow it.
        let num_outputs = (output_channels.highest_bit() + 1).max(0) as usize;
        self.scratch.set_size(num_outputs, block_size);

        log::debug!(
            "opened audio device {} at {sample_rate} Hz, {buffer_size} samples",
            device.name()
        );
        self.current_device = Some(device);
        self.start_device();
        Ok(())
    }

    fn start_device(&mut self) {
        let Some(device) = self.current_device.as_mut() else {
            return;
        };
        for (_, callback) in &mut self.callbacks {
            callback.audio_device_about_to_start(Some(&mut **device));
        }
        device.start();
        self.running = true;
    }

    /// Stops and closes the current device, if any.
    pub fn close_audio_device(&mut self) {
        let Some(mut device) = self.current_device.take() else {
            return;
        };
        if self.running {
            device.stop();
            for (_, callback) in &mut self.callbacks {
                callback.audio_device_stopped();
            }
            self.running = false;
        }
        device.close();
        log::debug!("closed audio device {}", device.name());
    }

    pub fn current_device(&self) -> Option<&dyn native::AudioIODevice> {
        let device = self.current_device.as_ref()?;
        Some(&**device)
    }

    pub fn current_device_mut(&mut self) -> Option<&mut dyn native::AudioIODevice> {
        let device = self.current_device.as_mut()?;
        Some(&mut **device)
    }

    /// Whether a device is open and started.
    pub fn is_running(&self) -> bool {
        self.running
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Registers a foreign audio callback.
    pub fn add_audio_callback(&mut self, callback: impl AudioDeviceCallback + 'static) -> AudioCallbackHandle {
        let callback: Box<dyn AudioDeviceCallback> = Box::new(callback);
        self.add_native_audio_callback(callback.into())
    }

    /// Registers a native audio callback. If a device is running the callback
    /// is told it is about to start before this returns.
    pub fn add_native_audio_callback(
        &mut self,
        mut callback: Box<dyn native::AudioIODeviceCallback>,
    ) -> AudioCallbackHandle {
        if self.running {
            if let Some(device) = self.current_device.as_mut() {
                callback.audio_device_about_to_start(Some(&mut **device));
            }
        }
        let handle = AudioCallbackHandle::next();
        self.callbacks.push((handle, callback));
        handle
    }

    /// Removes a callback. It is told the device stopped if one is running.
    /// Returns `false` for an unknown handle.
    pub fn remove_audio_callback(&mut self, handle: AudioCallbackHandle) -> bool {
        let Some(position) = self.callbacks.iter().position(|(registered, _)| *registered == handle) else {
            return false;
        };
        let (_, mut callback) = self.callbacks.remove(position);
        if self.running {
            callback.audio_device_stopped();
        }
        true
    }

    pub fn num_audio_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    // =========================================================================
    // Processing
    // =========================================================================

    /// Processes one block from the device.
    ///
    /// Does not allocate as long as the block fits the larger of the
    /// requested and reported buffer sizes the device was opened with.
    ///
    /// # Safety
    ///
    /// Same contract as
    /// [`native::AudioIODeviceCallback::audio_device_io_callback`].
    pub unsafe fn audio_device_io_callback(
        &mut self,
        input_channel_data: *const *const f32,
        num_input_channels: i32,
        output_channel_data: *const *mut f32,
        num_output_channels: i32,
        num_samples: i32,
    ) {
        let Self {
            callbacks,
            scratch,
            running,
            ..
        } = self;

        let Some(((_, first), rest)) = callbacks.split_first_mut().filter(|_| *running) else {
            // SAFETY: guaranteed by the caller.
            let mut output =
                unsafe { OutputAudioSampleBuffer::from_raw(output_channel_data, num_output_channels, num_samples) };
            output.clear();
            return;
        };

        // SAFETY: guaranteed by the caller.
        unsafe {
            first.audio_device_io_callback(
                input_channel_data,
                num_input_channels,
                output_channel_data,
                num_output_channels,
                num_samples,
            );
        }

        if rest.is_empty() {
            return;
        }

        // Every callback runs even without outputs; only the mix is skipped.
        let (channels, samples) = (num_output_channels.max(0) as usize, num_samples.max(0) as usize);
        if channels > 0 && (scratch.channels() < channels || scratch.samples() < samples) {
            scratch.set_size(scratch.channels().max(channels), scratch.samples().max(samples));
        }
        let scratch_pointers = scratch.write_pointers().as_ptr();

        for (_, callback) in rest {
            scratch.clear();
            // SAFETY: the scratch buffer holds at least `channels` channels of
            // at least `samples` samples and is not otherwise borrowed. With
            // no channels the callback builds an empty output view.
            unsafe {
                callback.audio_device_io_callback(
                    input_channel_data,
                    num_input_channels,
                    scratch_pointers,
                    channels as i32,
                    num_samples,
                );
            }

            if channels == 0 {
                continue;
            }

            // SAFETY: guaranteed by the caller; no other view of the output
            // is alive.
            let mut output =
                unsafe { OutputAudioSampleBuffer::from_raw(output_channel_data, num_output_channels, num_samples) };
            for channel in 0..channels {
                if let Some(mixed) = output.channel_mut(channel) {
                    for (out, sample) in mixed.iter_mut().zip(scratch.channel(channel)) {
                        *out += sample;
                    }
                }
            }
        }
    }

    /// Processes one block given as buffer views.
    pub fn process_block(&mut self, input: &InputAudioSampleBuffer<'_>, output: &mut OutputAudioSampleBuffer<'_>) {
        let inputs = input.channel_pointers();
        let num_samples = match (input.is_empty(), output.is_empty()) {
            (true, _) => output.samples(),
            (false, true) => input.samples(),
            (false, false) => output.samples().min(input.samples()),
        };
        let outputs = output.channel_pointers();
        // SAFETY: each view guarantees its channel pointers are valid for its
        // own sample count, which is at least `num_samples`.
        unsafe {
            self.audio_device_io_callback(
                inputs.as_ptr(),
                inputs.len() as i32,
                outputs.as_ptr(),
                outputs.len() as i32,
                num_samples as i32,
            );
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Serializes the current device type and setup as JSON.
    pub fn create_state_json(&self) -> Result<String> {
        let state = DeviceManagerState {
            device_type: self
                .current_device_type()
                .map(|device_type| device_type.type_name().to_string()),
            setup: self.setup.clone(),
        };
        Ok(serde_json::to_string(&state)?)
    }

    /// Restores a state produced by [`create_state_json`](Self::create_state_json)
    /// and opens the device it describes.
    pub fn initialise_from_state(&mut self, json: &str) -> Result<()> {
        let state: DeviceManagerState = serde_json::from_str(json)?;
        if let Some(name) = &state.device_type {
            self.set_current_audio_device_type(name)?;
        }
        self.set_audio_device_setup(&state.setup)
    }
}

impl Drop for AudioDeviceManager {
    fn drop(&mut self) {
        self.close_audio_device();
    }
}

impl std::fmt::Debug for AudioDeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDeviceManager")
            .field("device_types", &self.device_type_names())
            .field("current_type", &self.current_type)
            .field("setup", &self.setup)
            .field("callbacks", &self.callbacks.len())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

fn default_device_name(device_type: &dyn native::AudioIODeviceType, for_input: bool) -> NativeString {
    let names = device_type.device_names(for_input);
    let index = device_type.default_device_index(for_input).max(0) as usize;
    names.get(index).or_else(|| names.get(0)).cloned().unwrap_or_default()
}

fn choose_sample_rate(device: &mut dyn native::AudioIODevice) -> f64 {
    let rates = device.available_sample_rates();
    if rates.contains(&PREFERRED_SAMPLE_RATE) {
        PREFERRED_SAMPLE_RATE
    } else {
        rates.first().copied().unwrap_or(PREFERRED_SAMPLE_RATE)
    }
}
