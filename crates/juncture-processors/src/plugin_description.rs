//! Plugin descriptions.

use std::time::SystemTime;

use juncture_core::{NativeString, OwnedArray, Result, Time};
use serde::{Deserialize, Serialize};

/// Description of a plugin.
#[repr(C)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginDescription {
    /// The plugin name.
    pub name: NativeString,
    /// A more descriptive name for the plugin.
    pub descriptive_name: NativeString,
    /// The name of the plugin format (e.g. "VST3", "AudioUnit").
    pub plugin_format_name: NativeString,
    /// The plugin category.
    pub category: NativeString,
    /// The plugin manufacturer name.
    pub manufacturer_name: NativeString,
    /// The plugin version string.
    pub version: NativeString,
    /// The file path or unique identifier of the plugin.
    pub file_or_identifier: NativeString,
    /// The last modification time of the plugin file.
    pub last_file_mod_time: Time,
    /// The last time the plugin info was updated.
    pub last_info_update_time: Time,
    #[serde(skip)]
    deprecated_uid: i32,
    /// The unique ID of the plugin.
    pub unique_id: i32,
    /// Whether the plugin is an instrument.
    pub is_instrument: bool,
    /// The number of input channels.
    pub num_input_channels: i32,
    /// The number of output channels.
    pub num_output_channels: i32,
    /// Whether the plugin has a shared container.
    pub has_shared_container: bool,
    /// Whether the plugin has an ARA extension.
    pub has_ara_extension: bool,
}

/// Owned array of plugin descriptions, as filled in by plugin formats.
pub type OwnedArrayPluginDescription = OwnedArray<PluginDescription>;

juncture_core::layout_contract! {
    /// Declared layout of [`PluginDescription`].
    pub const PLUGIN_DESCRIPTION_LAYOUT: PluginDescription {
        size = 96,
        align = 8,
        name = 0,
        descriptive_name = 8,
        plugin_format_name = 16,
        category = 24,
        manufacturer_name = 32,
        version = 40,
        file_or_identifier = 48,
        last_file_mod_time = 56,
        last_info_update_time = 64,
        deprecated_uid = 72,
        unique_id = 76,
        is_instrument = 80,
        num_input_channels = 84,
        num_output_channels = 88,
        has_shared_container = 92,
        has_ara_extension = 93,
    }
}

macro_rules! string_builders {
    ($($field:ident => $with:ident),* $(,)?) => {
        $(
            pub fn $with(mut self, value: impl Into<NativeString>) -> Self {
                self.$field = value.into();
                self
            }
        )*
    };
}

impl PluginDescription {
    string_builders! {
        name => with_name,
        descriptive_name => with_descriptive_name,
        plugin_format_name => with_plugin_format_name,
        category => with_category,
        manufacturer_name => with_manufacturer_name,
        version => with_version,
        file_or_identifier => with_file_or_identifier,
    }

    pub fn with_last_file_mod_time(mut self, time: impl Into<Time>) -> Self {
        self.last_file_mod_time = time.into();
        self
    }

    pub fn with_last_info_update_time(mut self, time: impl Into<Time>) -> Self {
        self.last_info_update_time = time.into();
        self
    }

    pub fn with_unique_id(mut self, unique_id: i32) -> Self {
        self.unique_id = unique_id;
        self
    }

    pub fn with_is_instrument(mut self, is_instrument: bool) -> Self {
        self.is_instrument = is_instrument;
        self
    }

    pub fn with_num_input_channels(mut self, channels: i32) -> Self {
        self.num_input_channels = channels;
        self
    }

    pub fn with_num_output_channels(mut self, channels: i32) -> Self {
        self.num_output_channels = channels;
        self
    }

    pub fn with_has_shared_container(mut self, has_shared_container: bool) -> Self {
        self.has_shared_container = has_shared_container;
        self
    }

    pub fn with_has_ara_extension(mut self, has_ara_extension: bool) -> Self {
        self.has_ara_extension = has_ara_extension;
        self
    }

    pub fn last_file_mod_time(&self) -> SystemTime {
        self.last_file_mod_time.into()
    }

    /// A string that uniquely identifies this plugin:
    /// `{format}-{name}-{file hash:x}-{unique id:x}`.
    ///
    /// The file hash is stable across runs so identifiers can be persisted.
    pub fn create_identifier_string(&self) -> String {
        format!(
            "{}-{}-{:x}-{:x}",
            self.plugin_format_name,
            self.name,
            string_hash(self.file_or_identifier.as_str()),
            self.unique_id
        )
    }

    /// Whether two descriptions refer to the same plugin.
    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.file_or_identifier == other.file_or_identifier && self.unique_id == other.unique_id
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 32-bit FNV-1a.
fn string_hash(text: &str) -> u32 {
    text.bytes()
        .fold(0x811c_9dc5_u32, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_owned_array_of_descriptions() {
        let mut array = OwnedArrayPluginDescription::new();
        array.add(PluginDescription::default().with_name("A"));
        array.add(PluginDescription::default().with_name("B"));
        array.add(PluginDescription::default().with_name("C"));

        assert_eq!(array.get(0).unwrap().name, "A");
        assert_eq!(array.get(1).unwrap().name, "B");
        assert_eq!(array.get(2).unwrap().name, "C");
    }

    #[test]
    fn test_modification_time() {
        for offset in [0_i64, 100, -100] {
            let time = if offset >= 0 {
                UNIX_EPOCH + Duration::from_millis(offset as u64)
            } else {
                UNIX_EPOCH - Duration::from_millis(offset.unsigned_abs())
            };
            let description = PluginDescription::default().with_last_file_mod_time(time);
            assert_eq!(description.last_file_mod_time, Time::from(time));
            assert_eq!(description.last_file_mod_time(), time);
        }
    }

    #[test]
    fn test_identifier_string() {
        let description = PluginDescription::default()
            .with_plugin_format_name("Test")
            .with_name("Gain")
            .with_file_or_identifier("gain")
            .with_unique_id(0x2a);
        let identifier = description.create_identifier_string();
        assert!(identifier.starts_with("Test-Gain-"));
        assert!(identifier.ends_with("-2a"));
        assert_eq!(identifier, description.clone().create_identifier_string());

        let other = description.clone().with_file_or_identifier("other");
        assert_ne!(other.create_identifier_string(), identifier);
        assert!(!other.is_duplicate_of(&description));
    }

    #[test]
    fn test_json() {
        let description = PluginDescription::default()
            .with_name("Gain")
            .with_manufacturer_name("Juncture")
            .with_is_instrument(true)
            .with_num_output_channels(2);
        let json = description.to_json().unwrap();
        assert!(json.contains(r#""name":"Gain""#));
        assert_eq!(PluginDescription::from_json(&json).unwrap(), description);

        let partial = PluginDescription::from_json(r#"{"unique_id":7}"#).unwrap();
        assert_eq!(partial.unique_id, 7);
        assert_eq!(partial.name, "");
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_layout_matches_contract() {
        use std::mem::{align_of, offset_of, size_of};

        assert_eq!(
            PLUGIN_DESCRIPTION_LAYOUT.check(
                size_of::<PluginDescription>(),
                align_of::<PluginDescription>(),
                &[
                    ("name", offset_of!(PluginDescription, name)),
                    ("file_or_identifier", offset_of!(PluginDescription, file_or_identifier)),
                    ("last_file_mod_time", offset_of!(PluginDescription, last_file_mod_time)),
                    ("deprecated_uid", offset_of!(PluginDescription, deprecated_uid)),
                    ("unique_id", offset_of!(PluginDescription, unique_id)),
                    ("is_instrument", offset_of!(PluginDescription, is_instrument)),
                    ("has_ara_extension", offset_of!(PluginDescription, has_ara_extension)),
                ],
            ),
            Ok(())
        );
    }
}
