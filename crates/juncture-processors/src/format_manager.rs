//! The plugin format registry.

use std::sync::{Arc, Mutex, PoisonError};

use juncture_core::{Error, NativeString, Result};

use crate::native;
use crate::plugin_description::{OwnedArrayPluginDescription, PluginDescription};
use crate::plugin_format::AudioPluginFormat;

/// The outcome of an asynchronous instantiation.
pub type PluginCreationResult = Result<Box<dyn native::AudioPluginInstance>>;

/// Keeps the set of registered plugin formats and instantiates plugins with
/// the format their description names.
pub struct AudioPluginFormatManager {
    formats: Vec<Box<dyn native::AudioPluginFormat>>,
    #[cfg(debug_assertions)]
    _leak_detector: juncture_core::LeakedObjectDetector<AudioPluginFormatManager>,
}

juncture_core::leak_tracked!(AudioPluginFormatManager);

impl Default for AudioPluginFormatManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPluginFormatManager {
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
            #[cfg(debug_assertions)]
            _leak_detector: juncture_core::LeakedObjectDetector::new(),
        }
    }

    /// Registers a foreign plugin format.
    pub fn add_format(&mut self, format: impl AudioPluginFormat + 'static) {
        let format: Box<dyn AudioPluginFormat> = Box::new(format);
        self.add_native_format(format.into());
    }

    /// Registers a native plugin format.
    pub fn add_native_format(&mut self, format: Box<dyn native::AudioPluginFormat>) {
        log::debug!("registered plugin format {}", format.name());
        self.formats.push(format);
    }

    pub fn num_formats(&self) -> usize {
        self.formats.len()
    }

    pub fn format(&self, index: usize) -> Option<&dyn native::AudioPluginFormat> {
        let format = self.formats.get(index)?;
        Some(&**format)
    }

    pub fn format_mut(&mut self, index: usize) -> Option<&mut dyn native::AudioPluginFormat> {
        let format = self.formats.get_mut(index)?;
        Some(&mut **format)
    }

    pub fn format_names(&self) -> Vec<String> {
        self.formats.iter().map(|format| format.name().to_string()).collect()
    }

    /// Finds a registered format by name.
    pub fn find_format(&mut self, name: &str) -> Option<&mut dyn native::AudioPluginFormat> {
        let format = self.formats.iter_mut().find(|format| format.name() == name)?;
        Some(&mut **format)
    }

    /// Describes every plugin in `file_or_identifier`, asking each format
    /// that might understand the file.
    pub fn find_all_types_for_file(&mut self, file_or_identifier: &str) -> OwnedArrayPluginDescription {
        let file = NativeString::new(file_or_identifier);
        let mut results = OwnedArrayPluginDescription::new();
        for format in &mut self.formats {
            if format.file_might_contain_this_plugin_type(&file) {
                format.find_all_types_for_file(&mut results, &file);
            }
        }
        results
    }

    /// Whether the format named by `description` still finds the plugin.
    /// `false` if no such format is registered.
    pub fn does_plugin_still_exist(&mut self, description: &PluginDescription) -> bool {
        self.find_format(description.plugin_format_name.as_str())
            .is_some_and(|format| format.does_plugin_still_exist(description))
    }

    /// Instantiates a plugin synchronously.
    ///
    /// Fails with [`Error::UnknownPluginFormat`] if the description's format
    /// is not registered, and with [`Error::PluginCreationFailed`] if the
    /// format reports an error, needs asynchronous creation, or does not
    /// call back before returning.
    pub fn create_plugin_instance(
        &mut self,
        description: &PluginDescription,
        initial_sample_rate: f64,
        initial_buffer_size: i32,
    ) -> PluginCreationResult {
        let format = self.format_for(description)?;
        if format.requires_unblocked_message_thread_during_creation(description) {
            return Err(Error::PluginCreationFailed(
                "this plugin cannot be instantiated synchronously".to_string(),
            ));
        }

        let slot: Arc<Mutex<Option<PluginCreationResult>>> = Arc::default();
        let sink = Arc::clone(&slot);
        format.create_plugin_instance(
            description,
            initial_sample_rate,
            initial_buffer_size,
            Box::new(move |instance, error| {
                *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(creation_result(instance, error));
            }),
        );

        let result = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        result.unwrap_or_else(|| {
            Err(Error::PluginCreationFailed(
                "the plugin format did not complete the instantiation".to_string(),
            ))
        })
    }

    /// Instantiates a plugin, delivering the result to `callback` whenever
    /// the format finishes. An unknown format is reported to the callback
    /// before this returns.
    pub fn create_plugin_instance_async(
        &mut self,
        description: &PluginDescription,
        initial_sample_rate: f64,
        initial_buffer_size: i32,
        callback: impl FnOnce(PluginCreationResult) + Send + 'static,
    ) {
        match self.format_for(description) {
            Ok(format) => format.create_plugin_instance(
                description,
                initial_sample_rate,
                initial_buffer_size,
                Box::new(move |instance, error| callback(creation_result(instance, error))),
            ),
            Err(err) => callback(Err(err)),
        }
    }

    fn format_for(&mut self, description: &PluginDescription) -> Result<&mut dyn native::AudioPluginFormat> {
        let name = description.plugin_format_name.as_str();
        self.find_format(name)
            .ok_or_else(|| Error::UnknownPluginFormat(name.to_string()))
    }
}

impl std::fmt::Debug for AudioPluginFormatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPluginFormatManager")
            .field("formats", &self.format_names())
            .finish()
    }
}

fn creation_result(instance: Option<Box<dyn native::AudioPluginInstance>>, error: NativeString) -> PluginCreationResult {
    match instance {
        Some(instance) => Ok(instance),
        None if error.is_empty() => Err(Error::PluginCreationFailed("no instance was created".to_string())),
        None => Err(Error::PluginCreationFailed(error.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin_format::tests::GainFormat;
    use crate::plugin_instance::tests::CallLog;
    use crate::plugin_instance::AudioPlugin;

    fn manager(log: &CallLog) -> AudioPluginFormatManager {
        let mut manager = AudioPluginFormatManager::new();
        manager.add_format(GainFormat::new(log));
        manager
    }

    fn gain_description() -> PluginDescription {
        PluginDescription::default()
            .with_name("Gain")
            .with_plugin_format_name("Gain")
    }

    #[test]
    fn test_formats_by_index_and_name() {
        let log = CallLog::default();
        let mut manager = manager(&log);

        assert_eq!(manager.num_formats(), 1);
        assert_eq!(manager.format(0).unwrap().name(), "Gain");
        assert!(manager.format(1).is_none());
        assert!(manager.find_format("Gain").is_some());
        assert!(manager.find_format("VST3").is_none());
        assert_eq!(manager.format_names(), ["Gain"]);
    }

    #[test]
    fn test_find_all_types_for_file() {
        let log = CallLog::default();
        let mut manager = manager(&log);

        let found = manager.find_all_types_for_file("/plugins/stereo.gain");
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(0).unwrap().plugin_format_name, "Gain");
        assert!(manager.find_all_types_for_file("/plugins/readme.txt").is_empty());
    }

    #[test]
    fn test_create_plugin_instance() {
        let log = CallLog::default();
        let mut manager = manager(&log);

        let mut instance = manager.create_plugin_instance(&gain_description(), 48000.0, 256).unwrap();
        assert_eq!(instance.name(), "Gain");
        assert_eq!(instance.num_programs(), 2);
        assert!(manager.does_plugin_still_exist(&gain_description()));
    }

    #[test]
    fn test_create_plugin_instance_errors() {
        let log = CallLog::default();
        let mut manager = manager(&log);

        let unknown = gain_description().with_plugin_format_name("VST3");
        assert_eq!(
            manager.create_plugin_instance(&unknown, 44100.0, 512).err(),
            Some(Error::UnknownPluginFormat("VST3".to_string()))
        );
        assert!(!manager.does_plugin_still_exist(&unknown));

        let missing = gain_description().with_name("Reverb");
        assert_eq!(
            manager.create_plugin_instance(&missing, 44100.0, 512).err(),
            Some(Error::PluginCreationFailed("no plugin named \"Reverb\"".to_string()))
        );
    }

    #[test]
    fn test_asynchronous_only_formats() {
        struct Deferred {
            pending: Arc<Mutex<Option<native::PluginCreationCallback>>>,
        }

        impl native::AudioPluginFormat for Deferred {
            fn name(&self) -> NativeString {
                "Deferred".into()
            }
            fn find_all_types_for_file(&mut self, _: &mut OwnedArrayPluginDescription, _: &NativeString) {}
            fn file_might_contain_this_plugin_type(&mut self, _: &NativeString) -> bool {
                false
            }
            fn name_of_plugin_from_identifier(&mut self, identifier: &NativeString) -> NativeString {
                identifier.clone()
            }
            fn plugin_needs_rescanning(&mut self, _: &PluginDescription) -> bool {
                false
            }
            fn does_plugin_still_exist(&mut self, _: &PluginDescription) -> bool {
                true
            }
            fn can_scan_for_plugins(&self) -> bool {
                false
            }
            fn is_trivial_to_scan(&self) -> bool {
                true
            }
            fn search_paths_for_plugins(
                &mut self,
                _: &crate::FileSearchPath,
                _: bool,
                _: bool,
            ) -> juncture_core::StringArray {
                juncture_core::StringArray::new()
            }
            fn default_locations_to_search(&mut self) -> crate::FileSearchPath {
                crate::FileSearchPath::new()
            }
            fn requires_unblocked_message_thread_during_creation(&self, _: &PluginDescription) -> bool {
                true
            }
            fn create_plugin_instance(
                &mut self,
                _: &PluginDescription,
                _: f64,
                _: i32,
                callback: native::PluginCreationCallback,
            ) {
                *self.pending.lock().unwrap() = Some(callback);
            }
        }

        let pending = Arc::new(Mutex::new(None));
        let mut manager = AudioPluginFormatManager::new();
        manager.add_native_format(Box::new(Deferred {
            pending: Arc::clone(&pending),
        }));
        let description = PluginDescription::default().with_plugin_format_name("Deferred");

        assert!(matches!(
            manager.create_plugin_instance(&description, 44100.0, 512),
            Err(Error::PluginCreationFailed(_))
        ));

        let result = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&result);
        manager.create_plugin_instance_async(&description, 44100.0, 512, move |created| {
            *sink.lock().unwrap() = Some(created.map(|instance| instance.name().to_string()));
        });
        assert!(result.lock().unwrap().is_none());

        let log = CallLog::default();
        let plugin: Box<dyn AudioPlugin> = Box::new(crate::plugin_instance::tests::GainPlugin::new(&log));
        let callback = pending.lock().unwrap().take().unwrap();
        callback(Some(plugin.into()), NativeString::empty());
        assert_eq!(*result.lock().unwrap(), Some(Ok("Gain".to_string())));
    }

    #[test]
    fn test_async_unknown_format_reports_immediately() {
        let mut manager = AudioPluginFormatManager::new();
        let result = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&result);
        manager.create_plugin_instance_async(&gain_description(), 44100.0, 512, move |created| {
            *sink.lock().unwrap() = Some(created.err());
        });
        assert_eq!(
            *result.lock().unwrap(),
            Some(Some(Error::UnknownPluginFormat("Gain".to_string())))
        );
    }
}
