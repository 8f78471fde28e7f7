//! Plugin hosting capabilities for juncture.
//!
//! Two capabilities live here:
//!
//! - [`AudioPluginFormat`]: a plugin technology. It describes the plugins in
//!   a file and creates instances from a [`PluginDescription`].
//! - [`AudioPlugin`]: a hosted plugin instance. Its adapter forwards the whole
//!   native instance interface: processing, programs, state and description.
//!
//! [`AudioPluginFormatManager`] keeps the registered formats and picks the
//! right one when a plugin is instantiated.
//!
//! # Example
//!
//! ```no_run
//! use juncture_processors::{AudioPluginFormatManager, PluginDescription};
//!
//! let mut manager = AudioPluginFormatManager::new();
//! // manager.add_format(MyFormat::default());
//! let description = PluginDescription::default()
//!     .with_name("Gain")
//!     .with_plugin_format_name("MyFormat");
//! let mut plugin = manager.create_plugin_instance(&description, 48000.0, 512)?;
//! plugin.prepare_to_play(48000.0, 512);
//! # Ok::<(), juncture_core::Error>(())
//! ```

pub mod file_search_path;
pub mod format_manager;
pub mod native;
pub mod plugin_description;
pub mod plugin_format;
pub mod plugin_instance;

pub use file_search_path::FileSearchPath;
pub use format_manager::{AudioPluginFormatManager, PluginCreationResult};
pub use plugin_description::{OwnedArrayPluginDescription, PluginDescription};
pub use plugin_format::{AudioPluginFormat, AudioPluginFormatAdapter, BoxDynAudioPluginFormat};
pub use plugin_instance::{AudioPlugin, AudioPluginAdapter, BoxDynAudioPlugin};
