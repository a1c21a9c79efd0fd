//! SAA1099 Envelope Generator
//!
//! Two envelope generators exist, one controlling channel 2 and one
//! controlling channel 5. Each plays one of eight fixed waveforms built
//! from one or two phases of 16 levels, either once or looping.
//!
//! Control byte (registers 24/25):
//! - bit 7: enable
//! - bit 5: clock select (0 = paired oscillator, 1 = address-register writes)
//! - bit 4: resolution (0 = 4-bit, 1 = 3-bit)
//! - bits 3-1: waveform
//! - bit 0: invert the right channel
//!
//! A control write while a waveform is running is buffered and committed at
//! the next phase boundary. Enable and resolution take effect immediately.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Envelope control register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnvelopeControl: u8 {
        /// Right channel mirrors the left one
        const INVERT_RIGHT = 0x01;
        /// 3-bit resolution (levels move in steps of two)
        const THREE_BIT = 0x10;
        /// Clocked by address writes instead of the paired oscillator
        const EXTERNAL_CLOCK = 0x20;
        /// Envelope enabled
        const ENABLE = 0x80;
    }
}

impl EnvelopeControl {
    /// Waveform index held in bits 3-1
    pub fn shape(raw: u8) -> usize {
        ((raw >> 1) & 7) as usize
    }
}

/// The eight hardware waveforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// Constant zero
    ZeroAmplitude = 0,
    /// Constant maximum
    MaximumAmplitude = 1,
    /// One decay 15→0
    SingleDecay = 2,
    /// Repeating decay
    RepetitiveDecay = 3,
    /// One attack/decay triangle
    SingleTriangular = 4,
    /// Repeating triangle
    RepetitiveTriangular = 5,
    /// One attack 0→15
    SingleAttack = 6,
    /// Repeating attack
    RepetitiveAttack = 7,
}

impl EnvelopeShape {
    /// Create from the 3-bit waveform index
    pub fn from_index(index: usize) -> Self {
        match index & 7 {
            0 => Self::ZeroAmplitude,
            1 => Self::MaximumAmplitude,
            2 => Self::SingleDecay,
            3 => Self::RepetitiveDecay,
            4 => Self::SingleTriangular,
            5 => Self::RepetitiveTriangular,
            6 => Self::SingleAttack,
            _ => Self::RepetitiveAttack,
        }
    }
}

impl fmt::Display for EnvelopeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroAmplitude => write!(f, "Zero"),
            Self::MaximumAmplitude => write!(f, "Maximum"),
            Self::SingleDecay => write!(f, "Single-Decay"),
            Self::RepetitiveDecay => write!(f, "Repetitive-Decay"),
            Self::SingleTriangular => write!(f, "Single-Triangular"),
            Self::RepetitiveTriangular => write!(f, "Repetitive-Triangular"),
            Self::SingleAttack => write!(f, "Single-Attack"),
            Self::RepetitiveAttack => write!(f, "Repetitive-Attack"),
        }
    }
}

/// One waveform: phase count, looping flag, levels `[phase][position]`
#[derive(Debug)]
pub struct EnvelopeData {
    /// Number of 16-step phases (1 or 2)
    pub phases: usize,
    /// Restart from phase 0 after the last phase
    pub looping: bool,
    /// 4-bit levels per phase
    pub levels: [[u8; 16]; 2],
}

const ZERO: [u8; 16] = [0; 16];
const MAX: [u8; 16] = [15; 16];
const DECAY: [u8; 16] = [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0];
const ATTACK: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// Waveform tables indexed by shape
pub const ENVELOPE_DATA: [EnvelopeData; 8] = [
    EnvelopeData { phases: 1, looping: false, levels: [ZERO, ZERO] },
    EnvelopeData { phases: 1, looping: true, levels: [MAX, ZERO] },
    EnvelopeData { phases: 1, looping: false, levels: [DECAY, ZERO] },
    EnvelopeData { phases: 1, looping: true, levels: [DECAY, ZERO] },
    EnvelopeData { phases: 2, looping: false, levels: [ATTACK, DECAY] },
    EnvelopeData { phases: 2, looping: true, levels: [ATTACK, DECAY] },
    EnvelopeData { phases: 1, looping: false, levels: [ATTACK, ZERO] },
    EnvelopeData { phases: 1, looping: true, levels: [ATTACK, ZERO] },
];

/// Envelope generator state
#[derive(Debug, Clone)]
pub struct Envelope {
    enabled: bool,
    three_bit: bool,
    invert_right: bool,
    external_clock: bool,
    shape: usize,
    phase: usize,
    position: usize,
    ended: bool,
    pending: Option<u8>,
    left: u8,
    right: u8,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    /// Create a disabled envelope
    pub fn new() -> Self {
        Self {
            enabled: false,
            three_bit: false,
            invert_right: false,
            external_clock: false,
            shape: 0,
            phase: 0,
            position: 0,
            ended: true,
            pending: None,
            left: 0,
            right: 0,
        }
    }

    /// Write the control register
    pub fn set_control(&mut self, raw: u8) {
        let control = EnvelopeControl::from_bits_truncate(raw);
        let was_enabled = self.enabled;
        self.enabled = control.contains(EnvelopeControl::ENABLE);
        self.three_bit = control.contains(EnvelopeControl::THREE_BIT);

        if !self.enabled {
            self.ended = true;
            self.pending = None;
        } else if !was_enabled || self.ended {
            self.load(raw);
        } else {
            self.pending = Some(raw);
        }
        self.update_levels();
    }

    /// Start a waveform from its first level
    fn load(&mut self, raw: u8) {
        let control = EnvelopeControl::from_bits_truncate(raw);
        self.shape = EnvelopeControl::shape(raw);
        self.invert_right = control.contains(EnvelopeControl::INVERT_RIGHT);
        self.external_clock = control.contains(EnvelopeControl::EXTERNAL_CLOCK);
        self.phase = 0;
        self.position = 0;
        self.ended = false;
        self.pending = None;
    }

    /// Advance one step (internal or external clock event)
    pub fn tick(&mut self) {
        if !self.enabled || self.ended {
            return;
        }

        let data = &ENVELOPE_DATA[self.shape];
        self.position += if self.three_bit { 2 } else { 1 };

        if self.position >= 16 {
            self.position -= 16;
            self.phase += 1;
            if self.phase >= data.phases {
                if data.looping {
                    self.phase = 0;
                } else {
                    self.ended = true;
                    self.phase = data.phases - 1;
                    self.position = 15;
                }
            }
            if let Some(raw) = self.pending.take() {
                self.load(raw);
            }
        }
        self.update_levels();
    }

    /// Clock from the paired oscillator (ignored on external clock)
    #[inline]
    pub fn internal_clock(&mut self) {
        if !self.external_clock {
            self.tick();
        }
    }

    /// Clock from an address write (ignored on internal clock)
    pub fn external_clock(&mut self) {
        if self.external_clock {
            self.tick();
        }
    }

    fn update_levels(&mut self) {
        let raw = ENVELOPE_DATA[self.shape].levels[self.phase][self.position];
        let (left, full) = if self.three_bit {
            (raw & 0x0E, 14)
        } else {
            (raw, 15)
        };
        self.left = left;
        self.right = if self.invert_right { full - left } else { left };
    }

    /// Restart the current waveform and drop buffered data
    pub fn reset(&mut self) {
        self.phase = 0;
        self.position = 0;
        self.pending = None;
        self.ended = !self.enabled;
        self.update_levels();
    }

    /// Whether the envelope drives its channel's amplitude
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Left level (0-15)
    #[inline]
    pub fn left(&self) -> u8 {
        self.left
    }

    /// Right level (0-15)
    #[inline]
    pub fn right(&self) -> u8 {
        self.right
    }

    /// Currently playing waveform
    pub fn shape(&self) -> EnvelopeShape {
        EnvelopeShape::from_index(self.shape)
    }

    /// Whether a control write is waiting for a phase boundary
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// One-shot waveform finished
    pub fn has_ended(&self) -> bool {
        self.ended
    }
}
