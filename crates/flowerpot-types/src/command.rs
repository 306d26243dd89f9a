//! Write commands sent to the flowerpot.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Onboard LED state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LightState {
    #[default]
    Off,
    On,
}

impl LightState {
    /// The 16-bit value the firmware expects for this state.
    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            LightState::On => 255,
            LightState::Off => 0,
        }
    }

    /// Encode as the 2-byte little-endian light command.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 2] {
        self.value().to_le_bytes()
    }

    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, LightState::On)
    }
}

impl From<bool> for LightState {
    fn from(on: bool) -> Self {
        if on { LightState::On } else { LightState::Off }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightState::On => write!(f, "on"),
            LightState::Off => write!(f, "off"),
        }
    }
}

/// Encode a light command for the light characteristic.
///
/// ```
/// assert_eq!(flowerpot_types::encode_light(true), [0xFF, 0x00]);
/// assert_eq!(flowerpot_types::encode_light(false), [0x00, 0x00]);
/// ```
#[must_use]
pub const fn encode_light(on: bool) -> [u8; 2] {
    if on {
        LightState::On.to_bytes()
    } else {
        LightState::Off.to_bytes()
    }
}
