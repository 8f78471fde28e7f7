//! Zero-copy audio sample buffer views and owned sample storage.
//!
//! The framework hands audio callbacks raw arrays of channel pointers. The
//! views in this module wrap those arrays without copying or allocating:
//! channel `n` of a view is a slice over the framework's own memory.
//!
//! # Null Handling
//!
//! - A null channel-pointer array gives an empty view (zero channels).
//! - A null pointer for one channel gives an empty slice for that channel.
//!
//! # Real-Time Safety
//!
//! - Building a view never allocates.
//! - [`AudioBuffer`] allocates only in [`AudioBuffer::new`] and
//!   [`AudioBuffer::set_size`]; producing views reuses reserved pointer storage.

use std::ops::{Index, IndexMut};
use std::slice;

// =============================================================================
// InputAudioSampleBuffer
// =============================================================================

/// Read-only view over non-interleaved input channels.
#[derive(Clone, Copy)]
pub struct InputAudioSampleBuffer<'a> {
    channels: &'a [*const f32],
    num_samples: usize,
}

impl<'a> InputAudioSampleBuffer<'a> {
    /// A view with no channels.
    pub const fn empty() -> Self {
        Self {
            channels: &[],
            num_samples: 0,
        }
    }

    /// Wraps a raw channel-pointer array.
    ///
    /// # Safety
    ///
    /// Unless `channels` is null, it must point to `num_channels` channel
    /// pointers, each null or valid for reads of `num_samples` samples, for
    /// the lifetime `'a`.
    pub unsafe fn from_raw(channels: *const *const f32, num_channels: i32, num_samples: i32) -> Self {
        if channels.is_null() || num_channels <= 0 {
            return Self::empty();
        }
        Self {
            // SAFETY: guaranteed by the caller.
            channels: unsafe { slice::from_raw_parts(channels, num_channels as usize) },
            num_samples: num_samples.max(0) as usize,
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel.
    pub fn samples(&self) -> usize {
        self.num_samples
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, index: usize) -> Option<&'a [f32]> {
        let ptr = *self.channels.get(index)?;
        if ptr.is_null() {
            return Some(&[]);
        }
        // SAFETY: non-null channel pointers are valid for `num_samples`
        // reads (see `from_raw`).
        Some(unsafe { slice::from_raw_parts(ptr, self.num_samples) })
    }

    /// The raw channel pointers the view was built from.
    pub fn channel_pointers(&self) -> &'a [*const f32] {
        self.channels
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [f32]> + '_ {
        (0..self.channels()).filter_map(|index| self.channel(index))
    }
}

impl Index<usize> for InputAudioSampleBuffer<'_> {
    type Output = [f32];

    fn index(&self, index: usize) -> &[f32] {
        match self.channel(index) {
            Some(channel) => channel,
            None => panic!(
                "channel {index} out of range for a {}-channel buffer",
                self.channels()
            ),
        }
    }
}

// =============================================================================
// OutputAudioSampleBuffer
// =============================================================================

/// Writable view over non-interleaved output channels.
pub struct OutputAudioSampleBuffer<'a> {
    channels: &'a [*mut f32],
    num_samples: usize,
}

impl<'a> OutputAudioSampleBuffer<'a> {
    /// A view with no channels.
    pub const fn empty() -> Self {
        Self {
            channels: &[],
            num_samples: 0,
        }
    }

    /// Wraps a raw channel-pointer array.
    ///
    /// # Safety
    ///
    /// Unless `channels` is null, it must point to `num_channels` channel
    /// pointers, each null or valid for reads and writes of `num_samples`
    /// samples, for the lifetime `'a`. Channels must not overlap, and nothing
    /// else may access them while the view is alive.
    pub unsafe fn from_raw(channels: *const *mut f32, num_channels: i32, num_samples: i32) -> Self {
        if channels.is_null() || num_channels <= 0 {
            return Self::empty();
        }
        Self {
            // SAFETY: guaranteed by the caller.
            channels: unsafe { slice::from_raw_parts(channels, num_channels as usize) },
            num_samples: num_samples.max(0) as usize,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    pub fn samples(&self) -> usize {
        self.num_samples
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        let ptr = *self.channels.get(index)?;
        if ptr.is_null() {
            return Some(&[]);
        }
        // SAFETY: see `from_raw`.
        Some(unsafe { slice::from_raw_parts(ptr, self.num_samples) })
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let ptr = *self.channels.get(index)?;
        if ptr.is_null() {
            return Some(&mut []);
        }
        // SAFETY: see `from_raw`; `&mut self` keeps the borrow exclusive.
        Some(unsafe { slice::from_raw_parts_mut(ptr, self.num_samples) })
    }

    /// The raw channel pointers the view was built from.
    pub fn channel_pointers(&self) -> &[*mut f32] {
        self.channels
    }

    /// Zeroes every channel.
    pub fn clear(&mut self) {
        for index in 0..self.channels() {
            if let Some(channel) = self.channel_mut(index) {
                channel.fill(0.0);
            }
        }
    }

    /// Reborrows the view for a shorter lifetime.
    pub fn reborrow(&mut self) -> OutputAudioSampleBuffer<'_> {
        OutputAudioSampleBuffer {
            channels: self.channels,
            num_samples: self.num_samples,
        }
    }
}

impl Index<usize> for OutputAudioSampleBuffer<'_> {
    type Output = [f32];

    fn index(&self, index: usize) -> &[f32] {
        match self.channel(index) {
            Some(channel) => channel,
            None => panic!(
                "channel {index} out of range for a {}-channel buffer",
                self.channels()
            ),
        }
    }
}

impl IndexMut<usize> for OutputAudioSampleBuffer<'_> {
    fn index_mut(&mut self, index: usize) -> &mut [f32] {
        let channels = self.channels();
        match self.channel_mut(index) {
            Some(channel) => channel,
            None => panic!("channel {index} out of range for a {channels}-channel buffer"),
        }
    }
}

// =============================================================================
// AudioBuffer
// =============================================================================

/// Owned non-interleaved sample storage that produces views.
#[derive(Clone, Default)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    num_channels: usize,
    num_samples: usize,
    read_pointers: Vec<*const f32>,
    write_pointers: Vec<*mut f32>,
}

// SAFETY: the pointer caches only ever point into `samples`, which the
// buffer owns.
unsafe impl Send for AudioBuffer {}

impl AudioBuffer {
    /// Allocates zeroed storage.
    pub fn new(num_channels: usize, num_samples: usize) -> Self {
        let mut buffer = Self::default();
        buffer.set_size(num_channels, num_samples);
        buffer
    }

    /// Reallocates to a new shape. Contents are zeroed.
    pub fn set_size(&mut self, num_channels: usize, num_samples: usize) {
        self.samples.clear();
        self.samples.resize(num_channels * num_samples, 0.0);
        self.num_channels = num_channels;
        self.num_samples = num_samples;
        self.read_pointers = Vec::with_capacity(num_channels);
        self.write_pointers = Vec::with_capacity(num_channels);
    }

    pub fn channels(&self) -> usize {
        self.num_channels
    }

    pub fn samples(&self) -> usize {
        self.num_samples
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index * self.num_samples..(index + 1) * self.num_samples]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index * self.num_samples..(index + 1) * self.num_samples]
    }

    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Channel read pointers, refreshed in place.
    pub fn read_pointers(&mut self) -> &[*const f32] {
        self.read_pointers.clear();
        let base = self.samples.as_ptr();
        for channel in 0..self.num_channels {
            // SAFETY: `channel * num_samples` is within `samples`.
            self.read_pointers.push(unsafe { base.add(channel * self.num_samples) });
        }
        &self.read_pointers
    }

    /// Channel write pointers, refreshed in place.
    pub fn write_pointers(&mut self) -> &[*mut f32] {
        self.write_pointers.clear();
        let base = self.samples.as_mut_ptr();
        for channel in 0..self.num_channels {
            // SAFETY: as above.
            self.write_pointers.push(unsafe { base.add(channel * self.num_samples) });
        }
        &self.write_pointers
    }

    pub fn input_view(&mut self) -> InputAudioSampleBuffer<'_> {
        let (channels, samples) = (self.num_channels as i32, self.num_samples as i32);
        let pointers = self.read_pointers().as_ptr();
        // SAFETY: the pointers were just refreshed and address disjoint
        // channels of `samples`, which stays borrowed through the view.
        unsafe { InputAudioSampleBuffer::from_raw(pointers, channels, samples) }
    }

    pub fn output_view(&mut self) -> OutputAudioSampleBuffer<'_> {
        let (channels, samples) = (self.num_channels as i32, self.num_samples as i32);
        let pointers = self.write_pointers().as_ptr();
        // SAFETY: as above, with the buffer mutably borrowed.
        unsafe { OutputAudioSampleBuffer::from_raw(pointers, channels, samples) }
    }
}
