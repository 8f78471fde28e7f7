//! MIDI device descriptions.

use std::fmt;

use juncture_core::{NativeArray, NativeString};
use serde::{Deserialize, Serialize};

/// Information about a MIDI device.
#[repr(C)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiDeviceInfo {
    pub name: NativeString,
    pub identifier: NativeString,
}

/// Native array of MIDI device descriptions.
pub type MidiDeviceInfoArray = NativeArray<MidiDeviceInfo>;

juncture_core::layout_contract! {
    /// Declared layout of [`MidiDeviceInfo`].
    pub const MIDI_DEVICE_INFO_LAYOUT: MidiDeviceInfo {
        size = 16,
        align = 8,
        name = 0,
        identifier = 8,
    }
}

impl MidiDeviceInfo {
    pub fn new(name: impl Into<NativeString>, identifier: impl Into<NativeString>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for MidiDeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let info = MidiDeviceInfo::default();
        assert_eq!(info.name, "");
        assert_eq!(info.identifier, "");
    }

    #[test]
    fn test_display() {
        let info = MidiDeviceInfo::new("Keystation", "usb-1");
        assert_eq!(info.to_string(), "Keystation (usb-1)");
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_layout_matches_contract() {
        assert_eq!(
            MIDI_DEVICE_INFO_LAYOUT.check(
                std::mem::size_of::<MidiDeviceInfo>(),
                std::mem::align_of::<MidiDeviceInfo>(),
                &[
                    ("name", std::mem::offset_of!(MidiDeviceInfo, name)),
                    ("identifier", std::mem::offset_of!(MidiDeviceInfo, identifier)),
                ],
            ),
            Ok(())
        );
    }
}
