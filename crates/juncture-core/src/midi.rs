//! MIDI messages and sample-stamped MIDI buffers.

use std::fmt;

// =============================================================================
// MidiMessage
// =============================================================================

/// One MIDI message with a timestamp in seconds.
///
/// Messages of up to three bytes are stored inline; longer ones (SysEx) own
/// a heap copy.
#[derive(Clone, PartialEq)]
pub struct MidiMessage {
    data: MessageData,
    timestamp: f64,
}

#[derive(Clone, PartialEq, Eq)]
enum MessageData {
    Short { bytes: [u8; 3], len: u8 },
    Long(Box<[u8]>),
}

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROLLER: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const PITCH_WHEEL: u8 = 0xE0;
const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

fn status(kind: u8, channel: u8) -> u8 {
    kind | (channel.clamp(1, 16) - 1)
}

impl MidiMessage {
    /// Copies raw message bytes.
    pub fn from_bytes(bytes: &[u8], timestamp: f64) -> Self {
        let data = if bytes.len() <= 3 {
            let mut short = [0; 3];
            short[..bytes.len()].copy_from_slice(bytes);
            MessageData::Short {
                bytes: short,
                len: bytes.len() as u8,
            }
        } else {
            MessageData::Long(bytes.into())
        };
        Self { data, timestamp }
    }

    /// Note-on. `channel` is 1 to 16.
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::from_bytes(&[status(NOTE_ON, channel), note & 0x7F, velocity & 0x7F], 0.0)
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::from_bytes(&[status(NOTE_OFF, channel), note & 0x7F, velocity & 0x7F], 0.0)
    }

    pub fn controller_event(channel: u8, controller: u8, value: u8) -> Self {
        Self::from_bytes(
            &[status(CONTROLLER, channel), controller & 0x7F, value & 0x7F],
            0.0,
        )
    }

    pub fn all_notes_off(channel: u8) -> Self {
        Self::controller_event(channel, 123, 0)
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::from_bytes(&[status(PROGRAM_CHANGE, channel), program & 0x7F], 0.0)
    }

    /// Pitch wheel; `position` is 0 to 16383, centre 8192.
    pub fn pitch_wheel(channel: u8, position: u16) -> Self {
        let position = position.min(0x3FFF);
        Self::from_bytes(
            &[
                status(PITCH_WHEEL, channel),
                (position & 0x7F) as u8,
                (position >> 7) as u8,
            ],
            0.0,
        )
    }

    /// Wraps `payload` in SysEx start and end bytes.
    pub fn sysex(payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 2);
        bytes.push(SYSEX_START);
        bytes.extend_from_slice(payload);
        bytes.push(SYSEX_END);
        Self::from_bytes(&bytes, 0.0)
    }

    pub fn raw_data(&self) -> &[u8] {
        match &self.data {
            MessageData::Short { bytes, len } => &bytes[..*len as usize],
            MessageData::Long(bytes) => &bytes[..],
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: f64) {
        self.timestamp = timestamp;
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    fn status_byte(&self) -> u8 {
        self.raw_data().first().copied().unwrap_or(0)
    }

    fn data_byte(&self, index: usize) -> u8 {
        self.raw_data().get(index).copied().unwrap_or(0)
    }

    /// Channel 1 to 16, or 0 for system messages.
    pub fn channel(&self) -> u8 {
        let status = self.status_byte();
        if (0x80..0xF0).contains(&status) {
            (status & 0x0F) + 1
        } else {
            0
        }
    }

    pub fn is_note_on(&self) -> bool {
        self.status_byte() & 0xF0 == NOTE_ON && self.data_byte(2) != 0
    }

    /// Note-off, including note-on with zero velocity.
    pub fn is_note_off(&self) -> bool {
        let kind = self.status_byte() & 0xF0;
        kind == NOTE_OFF || (kind == NOTE_ON && self.data_byte(2) == 0)
    }

    pub fn is_controller(&self) -> bool {
        self.status_byte() & 0xF0 == CONTROLLER
    }

    pub fn is_sysex(&self) -> bool {
        self.status_byte() == SYSEX_START
    }

    pub fn note_number(&self) -> u8 {
        self.data_byte(1)
    }

    pub fn velocity(&self) -> u8 {
        self.data_byte(2)
    }

    pub fn controller_number(&self) -> u8 {
        self.data_byte(1)
    }

    pub fn controller_value(&self) -> u8 {
        self.data_byte(2)
    }

    /// SysEx payload without the start and end bytes.
    pub fn sysex_data(&self) -> &[u8] {
        if !self.is_sysex() {
            return &[];
        }
        let data = &self.raw_data()[1..];
        data.strip_suffix(&[SYSEX_END]).unwrap_or(data)
    }
}

impl fmt::Debug for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MidiMessage({:02x?} @ {})", self.raw_data(), self.timestamp)
    }
}

// =============================================================================
// MidiBuffer
// =============================================================================

const HEADER_SIZE: usize = 6;

/// Sequence of MIDI events stamped with sample positions.
///
/// Events are packed into one byte vector as
/// `[position: i32 LE][length: u16 LE][bytes]` and kept ordered by position;
/// events at the same position keep insertion order.
///
/// # Real-Time Safety
///
/// Adding events allocates only when the reserved capacity is exceeded. Use
/// [`MidiBuffer::with_capacity`] or [`MidiBuffer::ensure_size`] before
/// processing starts.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MidiBuffer {
    data: Vec<u8>,
}

/// One event of a [`MidiBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent<'a> {
    pub sample_position: i32,
    pub data: &'a [u8],
}

impl MidiEvent<'_> {
    pub fn message(&self) -> MidiMessage {
        MidiMessage::from_bytes(self.data, f64::from(self.sample_position))
    }
}

fn read_header(data: &[u8], offset: usize) -> Option<(i32, usize)> {
    let header = data.get(offset..offset + HEADER_SIZE)?;
    let position = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let len = u16::from_le_bytes([header[4], header[5]]) as usize;
    Some((position, len))
}

impl MidiBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `bytes` bytes of event storage.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
        }
    }

    pub fn ensure_size(&mut self, bytes: usize) {
        self.data.reserve(bytes.saturating_sub(self.data.len()));
    }

    /// Inserts an event. Empty events and events over 65535 bytes are
    /// rejected.
    pub fn add_event(&mut self, bytes: &[u8], sample_position: i32) -> bool {
        let Ok(len) = u16::try_from(bytes.len()) else {
            return false;
        };
        if len == 0 {
            return false;
        }

        let offset = self.insertion_offset(sample_position);
        let mut header = [0; HEADER_SIZE];
        header[..4].copy_from_slice(&sample_position.to_le_bytes());
        header[4..].copy_from_slice(&len.to_le_bytes());
        self.data
            .splice(offset..offset, header.into_iter().chain(bytes.iter().copied()));
        true
    }

    pub fn add_message(&mut self, message: &MidiMessage, sample_position: i32) -> bool {
        self.add_event(message.raw_data(), sample_position)
    }

    fn insertion_offset(&self, sample_position: i32) -> usize {
        let mut offset = 0;
        while let Some((position, len)) = read_header(&self.data, offset) {
            if position > sample_position {
                break;
            }
            offset += HEADER_SIZE + len;
        }
        offset
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn num_events(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> MidiBufferIter<'_> {
        MidiBufferIter {
            data: &self.data,
            offset: 0,
        }
    }

    pub fn first_event_time(&self) -> Option<i32> {
        self.iter().next().map(|event| event.sample_position)
    }

    pub fn last_event_time(&self) -> Option<i32> {
        self.iter().last().map(|event| event.sample_position)
    }
}

impl fmt::Debug for MidiBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a MidiBuffer {
    type Item = MidiEvent<'a>;
    type IntoIter = MidiBufferIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the events of a [`MidiBuffer`].
pub struct MidiBufferIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for MidiBufferIter<'a> {
    type Item = MidiEvent<'a>;

    fn next(&mut self) -> Option<MidiEvent<'a>> {
        let (sample_position, len) = read_header(self.data, self.offset)?;
        let start = self.offset + HEADER_SIZE;
        let data = self.data.get(start..start + len)?;
        self.offset = start + len;
        Some(MidiEvent {
            sample_position,
            data,
        })
    }
}
