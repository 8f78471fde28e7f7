//! Core types for the juncture framework bindings.
//!
//! This crate holds everything the capability crates share:
//!
//! - [`BoxDyn`], the two-word owning handle that carries a foreign trait
//!   object into the framework, and the [`capability!`] registration macro
//! - the [`boundary`] panic barrier every adapter call goes through
//! - native value types ([`NativeString`], [`NativeArray`], [`StringArray`],
//!   [`BigInteger`], [`Time`], [`OwnedArray`]) with compile-time
//!   [`layout`] contracts
//! - audio buffer views and MIDI types used by audio callbacks
//! - the process-wide [`Runtime`] guard and the shared [`Error`] type
//!
//! # Architecture
//!
//! ```text
//! foreign object ──BoxDyn::new──▶ handle ──wrap (From)──▶ adapter
//!                                                           │ implements
//!                                                           ▼
//!                                              native::<Interface> (framework)
//! ```

pub mod array;
pub mod bigint;
pub mod boundary;
pub mod buffer;
pub mod error;
pub mod handle;
pub mod layout;
pub mod leak;
pub mod midi;
pub mod runtime;
pub mod string;
pub mod time;

pub use array::{DoubleArray, FloatArray, IntArray, NativeArray, OwnedArray, StringArray};
pub use bigint::BigInteger;
pub use buffer::{AudioBuffer, InputAudioSampleBuffer, OutputAudioSampleBuffer};
pub use error::{Error, Result};
pub use handle::{BoxDyn, Capability, DropCallback, FatPtr};
pub use layout::LayoutContract;
pub use leak::{LeakTracked, LeakedObjectDetector};
pub use midi::{MidiBuffer, MidiEvent, MidiMessage};
pub use runtime::Runtime;
pub use string::{NativeString, StrView};
pub use time::Time;
