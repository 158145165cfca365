use crate::error::ColorError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Line color, components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn from_hex(text: &str) -> Result<Self, ColorError> {
        let digits = text.trim().trim_start_matches('#');
        if !(digits.len() == 6 || digits.len() == 8)
            || !digits.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(ColorError(text.to_string()));
        }

        let component = |idx: usize| -> Result<f32, ColorError> {
            u8::from_str_radix(&digits[idx..idx + 2], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| ColorError(text.to_string()))
        };

        let alpha = if digits.len() == 8 { component(6)? } else { 1.0 };
        Ok(Self::new(component(0)?, component(2)?, component(4)?, alpha))
    }

    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    /// Opaque color with random r, g and b.
    pub fn pseudo_random() -> Self {
        let mut rng = rand::thread_rng();
        Self::new(rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>(), 1.0)
    }
}

impl FromStr for Rgba {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
