use std::{fmt, str::FromStr};

use thiserror::Error;

/// 8-bit sRGB color, as understood by the LED controller
pub type Color = palette::rgb::Srgb<u8>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("invalid color `{0}`, expected #RRGGBB")]
    Format(String),
}

/// A color as exchanged over the API: `#RRGGBB`
///
/// Parsing accepts any case and an optional leading `#`. Formatting is always
/// upper-case with the `#`, and [HexColor::to_wire] drops the `#` for the
/// device.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor([u8; 3]);

impl HexColor {
    pub const BLACK: Self = Self([0x00, 0x00, 0x00]);
    pub const WHITE: Self = Self([0xFF, 0xFF, 0xFF]);
    pub const RED: Self = Self([0xFF, 0x00, 0x00]);
    pub const GREEN: Self = Self([0x00, 0xFF, 0x00]);
    pub const BLUE: Self = Self([0x00, 0x00, 0xFF]);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self([red, green, blue])
    }

    /// Pick a color uniformly in `#000000..#FFFFFE`
    pub fn random() -> Self {
        let n = rand::random::<u32>() % 0xFF_FFFF;
        Self::from(Color::new((n >> 16) as u8, (n >> 8) as u8, n as u8))
    }

    pub fn color(&self) -> Color {
        let [r, g, b] = self.0;
        Color::new(r, g, b)
    }

    /// Device representation, without the leading `#`
    pub fn to_wire(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl From<Color> for HexColor {
    fn from(color: Color) -> Self {
        let (r, g, b) = color.into_components();
        Self([r, g, b])
    }
}

impl FromStr for HexColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);

        let mut rgb = [0u8; 3];
        if digits.len() != 6 || hex::decode_to_slice(digits, &mut rgb).is_err() {
            return Err(ColorParseError::Format(s.to_owned()));
        }

        Ok(Self(rgb))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_wire())
    }
}
