//! Native plugin hosting interfaces.
//!
//! These are the interfaces the plugin host calls. Adapters in this crate
//! implement them by forwarding to foreign capability objects.

use juncture_core::{AudioBuffer, MidiBuffer, NativeString, StringArray};

use crate::file_search_path::FileSearchPath;
use crate::plugin_description::{OwnedArrayPluginDescription, PluginDescription};

/// Receives the result of an instantiation: the instance, or `None` and an
/// error message.
pub type PluginCreationCallback =
    Box<dyn FnOnce(Option<Box<dyn AudioPluginInstance>>, NativeString) + Send>;

/// A plugin technology that can find and instantiate plugins.
pub trait AudioPluginFormat: Send {
    fn name(&self) -> NativeString;

    /// Appends a description for every plugin inside `file_or_identifier`.
    fn find_all_types_for_file(
        &mut self,
        results: &mut OwnedArrayPluginDescription,
        file_or_identifier: &NativeString,
    );

    fn file_might_contain_this_plugin_type(&mut self, file_or_identifier: &NativeString) -> bool;
    fn name_of_plugin_from_identifier(&mut self, file_or_identifier: &NativeString) -> NativeString;
    fn plugin_needs_rescanning(&mut self, description: &PluginDescription) -> bool;
    fn does_plugin_still_exist(&mut self, description: &PluginDescription) -> bool;
    fn can_scan_for_plugins(&self) -> bool;
    fn is_trivial_to_scan(&self) -> bool;

    fn search_paths_for_plugins(
        &mut self,
        directories_to_search: &FileSearchPath,
        recursive: bool,
        allow_plugins_which_require_asynchronous_instantiation: bool,
    ) -> StringArray;

    fn default_locations_to_search(&mut self) -> FileSearchPath;
    fn requires_unblocked_message_thread_during_creation(&self, description: &PluginDescription) -> bool;

    /// Instantiates a plugin. `callback` is invoked exactly once, possibly
    /// before this returns.
    fn create_plugin_instance(
        &mut self,
        description: &PluginDescription,
        initial_sample_rate: f64,
        initial_buffer_size: i32,
        callback: PluginCreationCallback,
    );
}

/// A hosted plugin instance.
pub trait AudioPluginInstance: Send {
    fn name(&self) -> NativeString;
    fn prepare_to_play(&mut self, sample_rate: f64, maximum_expected_samples_per_block: i32);
    fn release_resources(&mut self);

    /// Processes `buffer` in place.
    fn process_block(&mut self, buffer: &mut AudioBuffer, midi_messages: &mut MidiBuffer);

    fn tail_length_seconds(&self) -> f64;
    fn accepts_midi(&self) -> bool;
    fn produces_midi(&self) -> bool;
    fn has_editor(&self) -> bool;

    fn num_programs(&mut self) -> i32;
    fn current_program(&mut self) -> i32;
    fn set_current_program(&mut self, index: i32);
    fn program_name(&mut self, index: i32) -> NativeString;
    fn change_program_name(&mut self, index: i32, new_name: &NativeString);

    /// Replaces `dest_data` with the plugin's serialised state.
    fn state_information(&mut self, dest_data: &mut Vec<u8>);
    fn set_state_information(&mut self, data: &[u8]);

    fn fill_in_plugin_description(&self, description: &mut PluginDescription);
}
