//! Foreign plugin instances.
//!
//! [`AudioPluginAdapter`] implements every method of
//! [`native::AudioPluginInstance`] by forwarding to the foreign
//! [`AudioPlugin`]; nothing is answered by the adapter itself.

use juncture_core::{AudioBuffer, MidiBuffer, NativeString, OutputAudioSampleBuffer};

use crate::native;
use crate::plugin_description::PluginDescription;

/// A plugin instance implemented outside the framework.
pub trait AudioPlugin: Send {
    /// Get the plugin name.
    fn name(&self) -> String;

    /// Called before playback starts, with the block size the host will not
    /// exceed.
    fn prepare_to_play(&mut self, sample_rate: f64, maximum_expected_samples_per_block: i32);

    /// Called after playback has stopped.
    fn release_resources(&mut self);

    /// Processes a block of audio in place, along with its MIDI events.
    fn process_block(&mut self, buffer: &mut OutputAudioSampleBuffer<'_>, midi_messages: &mut MidiBuffer);

    fn tail_length_seconds(&self) -> f64 {
        0.0
    }

    fn accepts_midi(&self) -> bool {
        false
    }

    fn produces_midi(&self) -> bool {
        false
    }

    fn has_editor(&self) -> bool {
        false
    }

    fn num_programs(&mut self) -> i32 {
        1
    }

    fn current_program(&mut self) -> i32 {
        0
    }

    fn set_current_program(&mut self, _index: i32) {}

    fn program_name(&mut self, _index: i32) -> String {
        String::new()
    }

    fn change_program_name(&mut self, _index: i32, _new_name: &str) {}

    /// The plugin's state, restored later through
    /// [`set_state_information`](Self::set_state_information).
    fn state_information(&mut self) -> Vec<u8> {
        Vec::new()
    }

    fn set_state_information(&mut self, _data: &[u8]) {}

    /// Fills in the fields of `description` this plugin knows about. The
    /// default sets the name.
    fn fill_in_plugin_description(&self, description: &mut PluginDescription) {
        description.name = self.name().into();
    }
}

juncture_core::capability! {
    /// Owned handle to a foreign [`AudioPlugin`].
    pub type BoxDynAudioPlugin = dyn AudioPlugin as "AudioPlugin";
    wrap = AudioPluginAdapter => dyn native::AudioPluginInstance;
}

/// Native plugin instance backed by a foreign [`AudioPlugin`].
#[derive(Debug)]
pub struct AudioPluginAdapter {
    plugin: BoxDynAudioPlugin,
}

impl AudioPluginAdapter {
    pub fn new(plugin: BoxDynAudioPlugin) -> Self {
        Self { plugin }
    }
}

impl native::AudioPluginInstance for AudioPluginAdapter {
    fn name(&self) -> NativeString {
        self.plugin
            .forward("name", NativeString::empty(), |plugin| plugin.name().into())
    }

    fn prepare_to_play(&mut self, sample_rate: f64, maximum_expected_samples_per_block: i32) {
        self.plugin.forward_mut("prepare_to_play", (), |plugin| {
            plugin.prepare_to_play(sample_rate, maximum_expected_samples_per_block)
        });
    }

    fn release_resources(&mut self) {
        self.plugin
            .forward_mut("release_resources", (), |plugin| plugin.release_resources());
    }

    fn process_block(&mut self, buffer: &mut AudioBuffer, midi_messages: &mut MidiBuffer) {
        let mut view = buffer.output_view();
        self.plugin.forward_mut("process_block", (), |plugin| {
            plugin.process_block(&mut view, midi_messages)
        });
    }

    fn tail_length_seconds(&self) -> f64 {
        self.plugin
            .forward("tail_length_seconds", 0.0, |plugin| plugin.tail_length_seconds())
    }

    fn accepts_midi(&self) -> bool {
        self.plugin.forward("accepts_midi", false, |plugin| plugin.accepts_midi())
    }

    fn produces_midi(&self) -> bool {
        self.plugin.forward("produces_midi", false, |plugin| plugin.produces_midi())
    }

    fn has_editor(&self) -> bool {
        self.plugin.forward("has_editor", false, |plugin| plugin.has_editor())
    }

    fn num_programs(&mut self) -> i32 {
        self.plugin.forward_mut("num_programs", 0, |plugin| plugin.num_programs())
    }

    fn current_program(&mut self) -> i32 {
        self.plugin
            .forward_mut("current_program", 0, |plugin| plugin.current_program())
    }

    fn set_current_program(&mut self, index: i32) {
        self.plugin
            .forward_mut("set_current_program", (), |plugin| plugin.set_current_program(index));
    }

    fn program_name(&mut self, index: i32) -> NativeString {
        self.plugin.forward_mut("program_name", NativeString::empty(), |plugin| {
            plugin.program_name(index).into()
        })
    }

    fn change_program_name(&mut self, index: i32, new_name: &NativeString) {
        let new_name = new_name.view();
        self.plugin.forward_mut("change_program_name", (), |plugin| {
            plugin.change_program_name(index, new_name.as_str())
        });
    }

    fn state_information(&mut self, dest_data: &mut Vec<u8>) {
        *dest_data = self
            .plugin
            .forward_mut("state_information", Vec::new(), |plugin| plugin.state_information());
    }

    fn set_state_information(&mut self, data: &[u8]) {
        self.plugin
            .forward_mut("set_state_information", (), |plugin| plugin.set_state_information(data));
    }

    fn fill_in_plugin_description(&self, description: &mut PluginDescription) {
        self.plugin.forward("fill_in_plugin_description", (), |plugin| {
            plugin.fill_in_plugin_description(description)
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use juncture_core::MidiMessage;
    use std::sync::{Arc, Mutex};

    /// Calls recorded by [`GainPlugin`].
    pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

    /// Plugin applying a per-program gain.
    pub(crate) struct GainPlugin {
        pub programs: Vec<(String, f32)>,
        pub current: usize,
        pub midi_events: usize,
        pub log: CallLog,
    }

    impl GainPlugin {
        pub(crate) fn new(log: &CallLog) -> Self {
            Self {
                programs: vec![("Unity".to_string(), 1.0), ("Half".to_string(), 0.5)],
                current: 0,
                midi_events: 0,
                log: Arc::clone(log),
            }
        }

        fn gain(&self) -> f32 {
            self.programs[self.current].1
        }
    }

    impl AudioPlugin for GainPlugin {
        fn name(&self) -> String {
            "Gain".to_string()
        }

        fn prepare_to_play(&mut self, sample_rate: f64, maximum_expected_samples_per_block: i32) {
            self.log
                .lock()
                .unwrap()
                .push(format!("prepare {sample_rate} {maximum_expected_samples_per_block}"));
        }

        fn release_resources(&mut self) {
            self.log.lock().unwrap().push("release".to_string());
        }

        fn process_block(&mut self, buffer: &mut OutputAudioSampleBuffer<'_>, midi_messages: &mut MidiBuffer) {
            let gain = self.gain();
            for channel in 0..buffer.channels() {
                for sample in buffer[channel].iter_mut() {
                    *sample *= gain;
                }
            }
            self.midi_events += midi_messages.num_events();
            midi_messages.clear();
        }

        fn tail_length_seconds(&self) -> f64 {
            0.25
        }

        fn accepts_midi(&self) -> bool {
            true
        }

        fn num_programs(&mut self) -> i32 {
            self.programs.len() as i32
        }

        fn current_program(&mut self) -> i32 {
            self.current as i32
        }

        fn set_current_program(&mut self, index: i32) {
            if (0..self.programs.len() as i32).contains(&index) {
                self.current = index as usize;
            }
        }

        fn program_name(&mut self, index: i32) -> String {
            usize::try_from(index)
                .ok()
                .and_then(|index| self.programs.get(index))
                .map(|(name, _)| name.clone())
                .unwrap_or_default()
        }

        fn change_program_name(&mut self, index: i32, new_name: &str) {
            if let Some((name, _)) = usize::try_from(index).ok().and_then(|index| self.programs.get_mut(index)) {
                *name = new_name.to_string();
            }
        }

        fn state_information(&mut self) -> Vec<u8> {
            vec![self.current as u8]
        }

        fn set_state_information(&mut self, data: &[u8]) {
            if let Some(&program) = data.first() {
                self.set_current_program(i32::from(program));
            }
        }
    }

    impl Drop for GainPlugin {
        fn drop(&mut self) {
            self.log.lock().unwrap().push("drop".to_string());
        }
    }

    pub(crate) fn wrapped(log: &CallLog) -> Box<dyn native::AudioPluginInstance> {
        let plugin: Box<dyn AudioPlugin> = Box::new(GainPlugin::new(log));
        plugin.into()
    }

    #[test]
    fn test_forwards_lifecycle() {
        let log = CallLog::default();
        let mut plugin = wrapped(&log);

        assert_eq!(plugin.name(), "Gain");
        plugin.prepare_to_play(48000.0, 128);
        plugin.release_resources();
        drop(plugin);

        assert_eq!(*log.lock().unwrap(), ["prepare 48000 128", "release", "drop"]);
    }

    #[test]
    fn test_process_block_in_place() {
        let log = CallLog::default();
        let mut plugin = wrapped(&log);
        plugin.set_current_program(1);

        let mut buffer = AudioBuffer::new(2, 4);
        buffer.channel_mut(0).fill(1.0);
        buffer.channel_mut(1).fill(-0.5);
        let mut midi = MidiBuffer::new();
        midi.add_message(&MidiMessage::note_on(1, 60, 100), 0);
        midi.add_message(&MidiMessage::note_off(1, 60, 0), 3);

        plugin.process_block(&mut buffer, &mut midi);

        assert_eq!(buffer.channel(0), [0.5; 4]);
        assert_eq!(buffer.channel(1), [-0.25; 4]);
        assert!(midi.is_empty());
    }

    #[test]
    fn test_forwards_queries_and_programs() {
        let log = CallLog::default();
        let mut plugin = wrapped(&log);

        assert_eq!(plugin.tail_length_seconds(), 0.25);
        assert!(plugin.accepts_midi());
        assert!(!plugin.produces_midi());
        assert!(!plugin.has_editor());
        assert_eq!(plugin.num_programs(), 2);
        assert_eq!(plugin.program_name(1), "Half");
        assert_eq!(plugin.program_name(7), "");

        plugin.change_program_name(0, &NativeString::from("Bypass"));
        assert_eq!(plugin.program_name(0), "Bypass");

        plugin.set_current_program(1);
        assert_eq!(plugin.current_program(), 1);
    }

    #[test]
    fn test_state_round_trip() {
        let log = CallLog::default();
        let mut plugin = wrapped(&log);
        plugin.set_current_program(1);

        let mut state = vec![0xff; 8];
        plugin.state_information(&mut state);
        assert_eq!(state, [1]);

        let mut restored = wrapped(&log);
        restored.set_state_information(&state);
        assert_eq!(restored.current_program(), 1);
    }

    #[test]
    fn test_fill_in_description_default() {
        let log = CallLog::default();
        let plugin = wrapped(&log);
        let mut description = PluginDescription::default();
        plugin.fill_in_plugin_description(&mut description);
        assert_eq!(description.name, "Gain");
    }

    #[test]
    fn test_panics_return_defaults() {
        struct Faulty;

        impl AudioPlugin for Faulty {
            fn name(&self) -> String {
                panic!("no name")
            }
            fn prepare_to_play(&mut self, _: f64, _: i32) {
                panic!("cannot prepare")
            }
            fn release_resources(&mut self) {}
            fn process_block(&mut self, _: &mut OutputAudioSampleBuffer<'_>, _: &mut MidiBuffer) {
                panic!("cannot process")
            }
            fn num_programs(&mut self) -> i32 {
                panic!("no programs")
            }
        }

        let plugin: Box<dyn AudioPlugin> = Box::new(Faulty);
        let mut plugin: Box<dyn native::AudioPluginInstance> = plugin.into();

        assert_eq!(plugin.name(), "");
        plugin.prepare_to_play(44100.0, 64);
        plugin.process_block(&mut AudioBuffer::new(1, 8), &mut MidiBuffer::new());
        assert_eq!(plugin.num_programs(), 0);
    }
}
