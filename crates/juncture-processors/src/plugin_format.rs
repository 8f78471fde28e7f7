//! Foreign plugin formats.
//!
//! Implement [`AudioPluginFormat`] to teach the host a new plugin technology:
//! how to find plugins inside a file and how to instantiate them. The format
//! is wrapped in an [`AudioPluginFormatAdapter`] and registered with an
//! [`AudioPluginFormatManager`](crate::AudioPluginFormatManager).

use juncture_core::{NativeString, Result, StringArray};

use crate::file_search_path::FileSearchPath;
use crate::native;
use crate::plugin_description::{OwnedArrayPluginDescription, PluginDescription};
use crate::plugin_instance::AudioPlugin;

/// A plugin technology implemented outside the framework.
pub trait AudioPluginFormat: Send {
    /// The format name, e.g. "VST3".
    fn name(&self) -> String;

    /// Describes every plugin inside `file_or_identifier`.
    fn find_all_types_for_file(&mut self, file_or_identifier: &str) -> Vec<PluginDescription>;

    /// Instantiates the plugin described by `description`.
    fn create_plugin_instance(
        &mut self,
        description: &PluginDescription,
        sample_rate: f64,
        buffer_size: i32,
    ) -> Result<Box<dyn AudioPlugin>>;

    /// A quick check, without loading anything, of whether the file could
    /// hold plugins of this format.
    fn file_might_contain_this_plugin_type(&mut self, _file_or_identifier: &str) -> bool {
        true
    }

    fn name_of_plugin_from_identifier(&mut self, file_or_identifier: &str) -> String {
        file_or_identifier.to_string()
    }

    fn plugin_needs_rescanning(&mut self, _description: &PluginDescription) -> bool {
        false
    }

    fn does_plugin_still_exist(&mut self, _description: &PluginDescription) -> bool {
        true
    }

    fn can_scan_for_plugins(&self) -> bool {
        true
    }

    fn is_trivial_to_scan(&self) -> bool {
        false
    }

    /// Lists the files or identifiers of plugins found in `directories`.
    fn search_paths_for_plugins(
        &mut self,
        _directories: &FileSearchPath,
        _recursive: bool,
        _allow_async: bool,
    ) -> Vec<String> {
        Vec::new()
    }

    fn default_locations_to_search(&mut self) -> FileSearchPath {
        FileSearchPath::new()
    }

    /// Whether instantiation needs the message thread to keep running, which
    /// rules out synchronous creation.
    fn requires_unblocked_message_thread_during_creation(&self, _description: &PluginDescription) -> bool {
        false
    }
}

juncture_core::capability! {
    /// Owned handle to a foreign [`AudioPluginFormat`].
    pub type BoxDynAudioPluginFormat = dyn AudioPluginFormat as "AudioPluginFormat";
    wrap = AudioPluginFormatAdapter => dyn native::AudioPluginFormat;
}

/// Native plugin format backed by a foreign [`AudioPluginFormat`].
#[derive(Debug)]
pub struct AudioPluginFormatAdapter {
    format: BoxDynAudioPluginFormat,
}

impl AudioPluginFormatAdapter {
    pub fn new(format: BoxDynAudioPluginFormat) -> Self {
        Self { format }
    }
}

impl native::AudioPluginFormat for AudioPluginFormatAdapter {
    fn name(&self) -> NativeString {
        self.format
            .forward("name", NativeString::empty(), |format| format.name().into())
    }

    fn find_all_types_for_file(
        &mut self,
        results: &mut OwnedArrayPluginDescription,
        file_or_identifier: &NativeString,
    ) {
        let file = file_or_identifier.view();
        let found = self
            .format
            .forward_mut("find_all_types_for_file", Vec::new(), |format| {
                format.find_all_types_for_file(file.as_str())
            });
        for description in found {
            results.add(description);
        }
    }

    fn file_might_contain_this_plugin_type(&mut self, file_or_identifier: &NativeString) -> bool {
        let file = file_or_identifier.view();
        self.format
            .forward_mut("file_might_contain_this_plugin_type", false, |format| {
                format.file_might_contain_this_plugin_type(file.as_str())
            })
    }

    fn name_of_plugin_from_identifier(&mut self, file_or_identifier: &NativeString) -> NativeString {
        let file = file_or_identifier.view();
        self.format
            .forward_mut("name_of_plugin_from_identifier", NativeString::empty(), |format| {
                format.name_of_plugin_from_identifier(file.as_str()).into()
            })
    }

    fn plugin_needs_rescanning(&mut self, description: &PluginDescription) -> bool {
        self.format.forward_mut("plugin_needs_rescanning", false, |format| {
            format.plugin_needs_rescanning(description)
        })
    }

    fn does_plugin_still_exist(&mut self, description: &PluginDescription) -> bool {
        self.format.forward_mut("does_plugin_still_exist", false, |format| {
            format.does_plugin_still_exist(description)
        })
    }

    fn can_scan_for_plugins(&self) -> bool {
        self.format
            .forward("can_scan_for_plugins", false, |format| format.can_scan_for_plugins())
    }

    fn is_trivial_to_scan(&self) -> bool {
        self.format
            .forward("is_trivial_to_scan", false, |format| format.is_trivial_to_scan())
    }

    fn search_paths_for_plugins(
        &mut self,
        directories_to_search: &FileSearchPath,
        recursive: bool,
        allow_plugins_which_require_asynchronous_instantiation: bool,
    ) -> StringArray {
        self.format
            .forward_mut("search_paths_for_plugins", Vec::new(), |format| {
                format.search_paths_for_plugins(
                    directories_to_search,
                    recursive,
                    allow_plugins_which_require_asynchronous_instantiation,
                )
            })
            .into_iter()
            .collect()
    }

    fn default_locations_to_search(&mut self) -> FileSearchPath {
        self.format
            .forward_mut("default_locations_to_search", FileSearchPath::new(), |format| {
                format.default_locations_to_search()
            })
    }

    fn requires_unblocked_message_thread_during_creation(&self, description: &PluginDescription) -> bool {
        self.format.forward(
            "requires_unblocked_message_thread_during_creation",
            false,
            |format| format.requires_unblocked_message_thread_during_creation(description),
        )
    }

    fn create_plugin_instance(
        &mut self,
        description: &PluginDescription,
        initial_sample_rate: f64,
        initial_buffer_size: i32,
        callback: native::PluginCreationCallback,
    ) {
        let created = self.format.forward_mut("create_plugin_instance", None, |format| {
            Some(format.create_plugin_instance(description, initial_sample_rate, initial_buffer_size))
        });
        match created {
            Some(Ok(plugin)) => callback(Some(plugin.into()), NativeString::empty()),
            Some(Err(err)) => {
                log::warn!("could not create plugin {}: {err}", description.name);
                callback(None, err.to_string().into());
            }
            None => callback(None, "plugin format panicked while creating an instance".into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::plugin_instance::tests::{CallLog, GainPlugin};
    use juncture_core::Error;
    use std::sync::{Arc, Mutex};

    /// Format whose files are `*.gain` and contain one [`GainPlugin`] each.
    pub(crate) struct GainFormat {
        pub log: CallLog,
    }

    impl GainFormat {
        pub(crate) fn new(log: &CallLog) -> Self {
            Self { log: Arc::clone(log) }
        }
    }

    impl AudioPluginFormat for GainFormat {
        fn name(&self) -> String {
            "Gain".to_string()
        }

        fn find_all_types_for_file(&mut self, file_or_identifier: &str) -> Vec<PluginDescription> {
            if !self.file_might_contain_this_plugin_type(file_or_identifier) {
                return Vec::new();
            }
            vec![PluginDescription::default()
                .with_name("Gain")
                .with_plugin_format_name("Gain")
                .with_file_or_identifier(file_or_identifier)
                .with_num_input_channels(2)
                .with_num_output_channels(2)]
        }

        fn create_plugin_instance(
            &mut self,
            description: &PluginDescription,
            sample_rate: f64,
            buffer_size: i32,
        ) -> Result<Box<dyn AudioPlugin>> {
            if description.name != "Gain" {
                return Err(Error::from(format!("no plugin named {:?}", description.name.as_str())));
            }
            let mut plugin = GainPlugin::new(&self.log);
            plugin.prepare_to_play(sample_rate, buffer_size);
            Ok(Box::new(plugin))
        }

        fn file_might_contain_this_plugin_type(&mut self, file_or_identifier: &str) -> bool {
            file_or_identifier.ends_with(".gain")
        }

        fn default_locations_to_search(&mut self) -> FileSearchPath {
            FileSearchPath::parse("/usr/lib/gain;~/.gain")
        }

        fn search_paths_for_plugins(
            &mut self,
            directories: &FileSearchPath,
            _recursive: bool,
            _allow_async: bool,
        ) -> Vec<String> {
            directories.iter().map(|directory| format!("{directory}/default.gain")).collect()
        }
    }

    pub(crate) fn wrapped(log: &CallLog) -> Box<dyn native::AudioPluginFormat> {
        let format: Box<dyn AudioPluginFormat> = Box::new(GainFormat::new(log));
        format.into()
    }

    type Created = Arc<Mutex<Option<(Option<Box<dyn native::AudioPluginInstance>>, NativeString)>>>;

    fn create(format: &mut dyn native::AudioPluginFormat, description: &PluginDescription) -> Created {
        let created = Created::default();
        let slot = Arc::clone(&created);
        format.create_plugin_instance(
            description,
            44100.0,
            512,
            Box::new(move |instance, error| {
                *slot.lock().unwrap() = Some((instance, error));
            }),
        );
        created
    }

    #[test]
    fn test_find_all_types_appends() {
        let log = CallLog::default();
        let mut format = wrapped(&log);
        let mut results = OwnedArrayPluginDescription::new();
        results.add(PluginDescription::default().with_name("Existing"));

        format.find_all_types_for_file(&mut results, &NativeString::from("/plugins/a.gain"));
        format.find_all_types_for_file(&mut results, &NativeString::from("/plugins/readme.txt"));

        assert_eq!(results.len(), 2);
        assert_eq!(results.get(1).unwrap().file_or_identifier, "/plugins/a.gain");
    }

    #[test]
    fn test_forwards_queries() {
        let log = CallLog::default();
        let mut format = wrapped(&log);

        assert_eq!(format.name(), "Gain");
        assert!(format.file_might_contain_this_plugin_type(&"x.gain".into()));
        assert_eq!(format.name_of_plugin_from_identifier(&"x.gain".into()), "x.gain");
        assert!(format.can_scan_for_plugins());
        assert!(!format.is_trivial_to_scan());
        assert!(format.does_plugin_still_exist(&PluginDescription::default()));
        assert!(!format.plugin_needs_rescanning(&PluginDescription::default()));
        assert!(!format.requires_unblocked_message_thread_during_creation(&PluginDescription::default()));

        let locations = format.default_locations_to_search();
        assert_eq!(locations.to_string(), "/usr/lib/gain;~/.gain");
        let found = format.search_paths_for_plugins(&locations, true, false);
        assert_eq!(found.to_vec(), ["/usr/lib/gain/default.gain", "~/.gain/default.gain"]);
    }

    #[test]
    fn test_create_plugin_instance_calls_back_once() {
        let log = CallLog::default();
        let mut format = wrapped(&log);
        let description = PluginDescription::default().with_name("Gain");

        let created = create(format.as_mut(), &description);
        let (instance, error) = created.lock().unwrap().take().unwrap();
        assert_eq!(error, "");
        assert_eq!(instance.unwrap().name(), "Gain");
        assert_eq!(*log.lock().unwrap(), ["prepare 44100 512", "drop"]);
    }

    #[test]
    fn test_create_plugin_instance_error_is_reported() {
        let log = CallLog::default();
        let mut format = wrapped(&log);
        let description = PluginDescription::default().with_name("Reverb");

        let created = create(format.as_mut(), &description);
        let (instance, error) = created.lock().unwrap().take().unwrap();
        assert!(instance.is_none());
        assert_eq!(error, "no plugin named \"Reverb\"");
    }

    #[test]
    fn test_panicking_format_yields_defaults() {
        struct Broken;

        impl AudioPluginFormat for Broken {
            fn name(&self) -> String {
                panic!("nameless")
            }
            fn find_all_types_for_file(&mut self, _: &str) -> Vec<PluginDescription> {
                panic!("cannot scan")
            }
            fn create_plugin_instance(
                &mut self,
                _: &PluginDescription,
                _: f64,
                _: i32,
            ) -> Result<Box<dyn AudioPlugin>> {
                panic!("cannot create")
            }
        }

        let format: Box<dyn AudioPluginFormat> = Box::new(Broken);
        let mut format: Box<dyn native::AudioPluginFormat> = format.into();

        assert_eq!(format.name(), "");
        let mut results = OwnedArrayPluginDescription::new();
        format.find_all_types_for_file(&mut results, &"a".into());
        assert!(results.is_empty());

        let created = create(format.as_mut(), &PluginDescription::default());
        let (instance, error) = created.lock().unwrap().take().unwrap();
        assert!(instance.is_none());
        assert!(!error.is_empty());
    }
}
