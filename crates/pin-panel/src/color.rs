//! The seven colors the panel's controller accepts, packed two per byte.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid color nibble: {0:#x}")]
pub struct InvalidColorNibble(pub u8);

/// Seven-color e-paper palette. Values match the controller's native nibble
/// encoding so a `Color` converts to/from a framebuffer nibble with no
/// lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Color {
    Black = 0x0,
    #[default]
    White = 0x1,
    Red = 0x2,
    Yellow = 0x3,
    Blue = 0x4,
    Green = 0x5,
    Orange = 0x6,
}

impl Color {
    pub const fn as_nibble(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Color {
    type Error = InvalidColorNibble;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Color::Black),
            0x1 => Ok(Color::White),
            0x2 => Ok(Color::Red),
            0x3 => Ok(Color::Yellow),
            0x4 => Ok(Color::Blue),
            0x5 => Ok(Color::Green),
            0x6 => Ok(Color::Orange),
            other => Err(InvalidColorNibble(other)),
        }
    }
}
