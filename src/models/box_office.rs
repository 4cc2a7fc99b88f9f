//! Box-office records and the glyph substitution table used to decode them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Number of digit glyphs an obfuscation font must define.
pub const DIGIT_GLYPHS: usize = 10;

/// One row of the box-office table, numeric fields already decoded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoxOfficeRecord {
    pub movie_name: String,
    pub cumulative_box_office: String,
    pub release_days: String,
    pub schedule_rate_percent: String,
}

/// Private-use codepoint to decimal digit mapping recovered from one font.
///
/// Always a bijection between exactly ten codepoints and `'0'..='9'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMapping {
    digits: HashMap<char, char>,
}

impl GlyphMapping {
    /// Build a mapping where `codepoints[i]` renders as digit `i`.
    pub fn from_ordered_codepoints(codepoints: &[char]) -> Result<Self> {
        if codepoints.len() != DIGIT_GLYPHS {
            return Err(AppError::parse(format!(
                "expected {} digit glyphs, found {}",
                DIGIT_GLYPHS,
                codepoints.len()
            )));
        }

        let mut digits = HashMap::with_capacity(DIGIT_GLYPHS);
        for (value, &codepoint) in codepoints.iter().enumerate() {
            let digit = char::from_digit(value as u32, 10)
                .ok_or_else(|| AppError::parse(format!("digit {value} out of range")))?;
            if digits.insert(codepoint, digit).is_some() {
                return Err(AppError::parse(format!(
                    "codepoint U+{:04X} mapped twice",
                    codepoint as u32
                )));
            }
        }

        Ok(Self { digits })
    }

    /// Digit rendered by `codepoint`, if it is one of the obfuscated glyphs.
    pub fn digit(&self, codepoint: char) -> Option<char> {
        self.digits.get(&codepoint).copied()
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.digits.iter().map(|(&k, &v)| (k, v))
    }
}
