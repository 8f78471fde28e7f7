//! Foreign audio callbacks.
//!
//! # Real-Time Safety
//!
//! [`AudioDeviceCallbackAdapter`] runs on the audio thread. For each block it
//! builds an [`InputAudioSampleBuffer`] and an [`OutputAudioSampleBuffer`]
//! directly over the framework's channel pointers and forwards them to
//! [`AudioDeviceCallback::process_block`]. Nothing is copied, allocated or
//! locked on that path, and nothing is logged unless the callback panics.

use juncture_core::{InputAudioSampleBuffer, OutputAudioSampleBuffer};

use crate::native;

/// A trait that can be implemented to receive audio callbacks.
///
/// Callbacks are registered with
/// [`AudioDeviceManager::add_audio_callback`](crate::AudioDeviceManager::add_audio_callback).
/// Implementors must be [`Send`] because blocks arrive on the audio thread.
///
/// Any `FnMut(&InputAudioSampleBuffer, &mut OutputAudioSampleBuffer) + Send`
/// closure is a callback that only processes blocks.
pub trait AudioDeviceCallback: Send {
    /// Called when the audio device is about to start.
    fn about_to_start(&mut self, _device: &mut dyn native::AudioIODevice) {}

    /// Process a block of incoming and outgoing audio.
    fn process_block(
        &mut self,
        input: &InputAudioSampleBuffer<'_>,
        output: &mut OutputAudioSampleBuffer<'_>,
    );

    /// Called when the audio device has stopped.
    fn stopped(&mut self) {}
}

impl<F> AudioDeviceCallback for F
where
    F: FnMut(&InputAudioSampleBuffer<'_>, &mut OutputAudioSampleBuffer<'_>) + Send,
{
    fn process_block(
        &mut self,
        input: &InputAudioSampleBuffer<'_>,
        output: &mut OutputAudioSampleBuffer<'_>,
    ) {
        self(input, output);
    }
}

juncture_core::capability! {
    /// Owned handle to a foreign [`AudioDeviceCallback`].
    pub type BoxDynAudioDeviceCallback = dyn AudioDeviceCallback as "AudioDeviceCallback";
    wrap = AudioDeviceCallbackAdapter => dyn native::AudioIODeviceCallback;
}

/// Native audio callback backed by a foreign [`AudioDeviceCallback`].
#[derive(Debug)]
pub struct AudioDeviceCallbackAdapter {
    callback: BoxDynAudioDeviceCallback,
}

impl AudioDeviceCallbackAdapter {
    pub fn new(callback: BoxDynAudioDeviceCallback) -> Self {
        Self { callback }
    }
}

impl native::AudioIODeviceCallback for AudioDeviceCallbackAdapter {
    fn audio_device_about_to_start(&mut self, device: Option<&mut dyn native::AudioIODevice>) {
        let Some(device) = device else {
            return;
        };
        self.callback
            .forward_mut("about_to_start", (), |callback| callback.about_to_start(device));
    }

    unsafe fn audio_device_io_callback(
        &mut self,
        input_channel_data: *const *const f32,
        num_input_channels: i32,
        output_channel_data: *const *mut f32,
        num_output_channels: i32,
        num_samples: i32,
    ) {
        // SAFETY: the caller guarantees the channel arrays are valid for
        // this call (see `native::AudioIODeviceCallback`).
        let input = unsafe {
            InputAudioSampleBuffer::from_raw(input_channel_data, num_input_channels, num_samples)
        };
        // SAFETY: as above.
        let mut output = unsafe {
            OutputAudioSampleBuffer::from_raw(output_channel_data, num_output_channels, num_samples)
        };
        self.callback.forward_mut("process_block", (), |callback| {
            callback.process_block(&input, &mut output)
        });
    }

    fn audio_device_stopped(&mut self) {
        self.callback
            .forward_mut("stopped", (), |callback| callback.stopped());
    }
}
