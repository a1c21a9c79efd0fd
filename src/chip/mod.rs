//! SAA1099 chip emulation
//!
//! Six square-wave channels, two noise generators and two envelope
//! generators, rendered at the host sample rate into normalised stereo
//! floats.

pub mod amp;
pub mod backend;
#[allow(clippy::module_inception)]
pub mod chip;
pub mod envelope;
pub mod noise;
pub mod oscillator;
pub mod registers;
pub mod tables;

pub use amp::{AmpMixer, MixSelect, RawLevel};
pub use backend::Saa1099Backend;
pub use chip::{Saa1099, NUM_CHANNELS};
pub use envelope::{Envelope, EnvelopeControl, EnvelopeShape};
pub use noise::NoiseGenerator;
pub use oscillator::Oscillator;
pub use registers::{MasterControl, Register, RegisterImage};
