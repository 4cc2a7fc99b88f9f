// src/services/numeric.rs

//! Substitution decoding of obfuscated numeric text.

use crate::models::GlyphMapping;

/// Replace every obfuscated codepoint in `text` with the digit it renders as.
///
/// Characters outside the mapping (`.`, `%`, unit suffixes, plain digits)
/// pass through untouched, so the output always has as many characters as
/// the input.
pub fn decode(text: &str, mapping: &GlyphMapping) -> String {
    text.chars().map(|c| mapping.digit(c).unwrap_or(c)).collect()
}

/// A decoder bound to the mapping of one page's font.
#[derive(Debug, Clone)]
pub struct NumericFieldDecoder {
    mapping: GlyphMapping,
}

impl NumericFieldDecoder {
    pub fn new(mapping: GlyphMapping) -> Self {
        Self { mapping }
    }

    pub fn decode(&self, text: &str) -> String {
        decode(text, &self.mapping)
    }

    pub fn mapping(&self) -> &GlyphMapping {
        &self.mapping
    }
}
