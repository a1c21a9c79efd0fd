//! Backend trait abstraction for SAA1099 chip implementations
//!
//! The sequencer talks to the chip only through this trait, so a recording
//! or register-logging backend can stand in for the emulator.

use super::registers::RegisterImage;

/// Common interface for SAA1099 chip backends
///
/// # Example
///
/// ```
/// use saa1099::{Saa1099, Saa1099Backend};
///
/// fn play_note<B: Saa1099Backend>(chip: &mut B) {
///     chip.write(0x1C, 0x01); // sound enable
///     chip.write(0x14, 0x01); // frequency enable channel 0
///     chip.write(0x08, 0x21); // offset
///     chip.write(0x10, 0x04); // octave
///     chip.write(0x00, 0xFF); // amplitude
///
///     let mut left = [0.0f32; 64];
///     let mut right = [0.0f32; 64];
///     chip.render(&mut left, &mut right, 64, 0);
/// }
///
/// play_note(&mut Saa1099::new(44_100));
/// ```
pub trait Saa1099Backend: Send {
    /// Reset all generators and registers
    fn reset(&mut self);

    /// Select a register (5-bit address)
    fn write_address(&mut self, addr: u8);

    /// Write the selected register
    fn write_data(&mut self, value: u8);

    /// Select and write a register in one call
    fn write(&mut self, addr: u8, value: u8) {
        self.write_address(addr);
        self.write_data(value);
    }

    /// Render `count` stereo samples into the buffers starting at `offset`
    fn render(&mut self, left: &mut [f32], right: &mut [f32], count: usize, offset: usize);

    /// Mute or unmute a channel (0-5); generators keep running
    fn mute(&mut self, channel: usize, muted: bool);

    /// Check if a channel is muted
    fn is_muted(&self, channel: usize) -> bool;

    /// Current register image
    fn snapshot(&self) -> RegisterImage;

    /// Bring the chip to `image`, writing only the registers that differ
    fn replace(&mut self, image: &RegisterImage);

    /// Host sample rate in Hz
    fn sample_rate(&self) -> u32;
}
