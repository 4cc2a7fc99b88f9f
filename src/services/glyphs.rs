// src/services/glyphs.rs

//! Glyph map recovery from an embedded obfuscation font.
//!
//! The box-office page ships a base64 font inside an inline `@font-face`
//! rule. Its glyph order, after two reserved placeholder glyphs, lists the
//! private-use codepoints standing in for the digits 0 through 9, so glyph
//! `i` of the remaining order (named `uniXXXX`) renders as digit `i`.
//!
//! Both bare sfnt (TrueType/OpenType) and WOFF 1.0 payloads are accepted.

use std::borrow::Cow;
use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::ZlibDecoder;
use regex::Regex;
use scraper::{Html, Selector};
use ttf_parser::{Face, GlyphId};

use crate::error::{AppError, Result};
use crate::models::GlyphMapping;
use crate::utils::{element_text, parse_selector};

/// Placeholder glyphs at the start of every obfuscation font.
const RESERVED_GLYPHS: usize = 2;

const WOFF_SIGNATURE: &[u8; 4] = b"wOFF";
const WOFF2_SIGNATURE: &[u8; 4] = b"wOF2";
const WOFF_HEADER_LEN: usize = 44;
const WOFF_ENTRY_LEN: usize = 20;
const SFNT_HEADER_LEN: usize = 12;
const SFNT_RECORD_LEN: usize = 16;

/// Locates the embedded font on a page and decodes its digit mapping.
pub struct GlyphMapDecoder {
    style: Selector,
    payload: Regex,
}

impl GlyphMapDecoder {
    /// `font_style_selector` picks the inline style block holding the font.
    pub fn new(font_style_selector: &str) -> Result<Self> {
        // The last data URL wins when a rule lists several `src` formats.
        let payload = Regex::new(r"(?s).*base64,(.*?)\) format")
            .map_err(|e| AppError::config(format!("invalid font payload pattern: {e}")))?;
        Ok(Self {
            style: parse_selector(font_style_selector)?,
            payload,
        })
    }

    /// Decode the mapping of the font embedded in `document`.
    pub fn decode_document(&self, document: &Html) -> Result<GlyphMapping> {
        let style = document
            .select(&self.style)
            .next()
            .map(|node| element_text(&node))
            .ok_or_else(|| AppError::parse("page has no font style block"))?;
        self.decode_style(&style)
    }

    /// Decode the mapping of the font inside a `@font-face` style text.
    pub fn decode_style(&self, style: &str) -> Result<GlyphMapping> {
        decode_base64_font(self.extract_payload(style)?)
    }

    /// The base64 text between the last `base64,` and the `) format` after it.
    pub fn extract_payload<'a>(&self, style: &'a str) -> Result<&'a str> {
        self.payload
            .captures(style)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| AppError::parse("font-face payload not found in style block"))
    }
}

/// Decode a base64 font payload into its digit mapping.
pub fn decode_base64_font(payload: &str) -> Result<GlyphMapping> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AppError::parse(format!("font payload is not valid base64: {e}")))?;
    decode_font(&bytes)
}

/// Decode raw font bytes into their digit mapping.
pub fn decode_font(bytes: &[u8]) -> Result<GlyphMapping> {
    let sfnt = unwrap_woff(bytes)?;
    let order = glyph_order(&sfnt)?;
    let codepoints = order
        .iter()
        .skip(RESERVED_GLYPHS)
        .map(|name| codepoint_from_glyph_name(name))
        .collect::<Result<Vec<_>>>()?;
    GlyphMapping::from_ordered_codepoints(&codepoints)
}

/// Glyph names in glyph-id order. Unnamed glyphs get a `glyphNNNNN` name.
pub fn glyph_order(sfnt: &[u8]) -> Result<Vec<String>> {
    let face = Face::parse(sfnt, 0)
        .map_err(|e| AppError::parse(format!("embedded font is unreadable: {e}")))?;

    Ok((0..face.number_of_glyphs())
        .map(|id| {
            face.glyph_name(GlyphId(id))
                .map(str::to_string)
                .unwrap_or_else(|| format!("glyph{id:05}"))
        })
        .collect())
}

/// `uniE4F9` -> U+E4F9.
pub fn codepoint_from_glyph_name(name: &str) -> Result<char> {
    let hex = name.rsplit_once("uni").map_or(name, |(_, hex)| hex);
    u32::from_str_radix(hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| AppError::parse(format!("glyph name '{name}' does not encode a codepoint")))
}

/// Rebuild the sfnt wrapped by a WOFF 1.0 container; other data passes through.
fn unwrap_woff(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if bytes.starts_with(WOFF2_SIGNATURE) {
        return Err(AppError::parse("WOFF2 fonts are not supported"));
    }
    if !bytes.starts_with(WOFF_SIGNATURE) {
        return Ok(Cow::Borrowed(bytes));
    }

    let flavor = be_u32(bytes, 4)?;
    let num_tables = usize::from(be_u16(bytes, 12)?);

    let mut tables = Vec::with_capacity(num_tables);
    for i in 0..num_tables {
        let entry = WOFF_HEADER_LEN + i * WOFF_ENTRY_LEN;
        let tag = slice(bytes, entry, 4)?;
        let offset = be_u32(bytes, entry + 4)? as usize;
        let comp_len = be_u32(bytes, entry + 8)? as usize;
        let orig_len = be_u32(bytes, entry + 12)? as usize;
        let checksum = be_u32(bytes, entry + 16)?;

        let stored = slice(bytes, offset, comp_len)?;
        let data = if comp_len < orig_len {
            let mut out = Vec::with_capacity(orig_len);
            ZlibDecoder::new(stored)
                .read_to_end(&mut out)
                .map_err(|e| AppError::parse(format!("corrupt WOFF table: {e}")))?;
            out
        } else {
            stored.to_vec()
        };
        if data.len() != orig_len {
            return Err(AppError::parse("WOFF table length mismatch"));
        }
        tables.push((tag, checksum, data));
    }

    let mut sfnt = Vec::new();
    sfnt.extend_from_slice(&flavor.to_be_bytes());
    sfnt.extend_from_slice(&(num_tables as u16).to_be_bytes());
    let (search_range, entry_selector, range_shift) = search_params(num_tables);
    sfnt.extend_from_slice(&search_range.to_be_bytes());
    sfnt.extend_from_slice(&entry_selector.to_be_bytes());
    sfnt.extend_from_slice(&range_shift.to_be_bytes());

    let mut offset = SFNT_HEADER_LEN + SFNT_RECORD_LEN * num_tables;
    for (tag, checksum, data) in &tables {
        sfnt.extend_from_slice(tag);
        sfnt.extend_from_slice(&checksum.to_be_bytes());
        sfnt.extend_from_slice(&(offset as u32).to_be_bytes());
        sfnt.extend_from_slice(&(data.len() as u32).to_be_bytes());
        offset += padded(data.len());
    }
    for (_, _, data) in &tables {
        sfnt.extend_from_slice(data);
        sfnt.resize(sfnt.len() + padded(data.len()) - data.len(), 0);
    }

    Ok(Cow::Owned(sfnt))
}

fn search_params(num_tables: usize) -> (u16, u16, u16) {
    if num_tables == 0 {
        return (0, 0, 0);
    }
    let entry_selector = usize::BITS - 1 - num_tables.leading_zeros();
    let search_range = (1usize << entry_selector) * SFNT_RECORD_LEN;
    let range_shift = num_tables * SFNT_RECORD_LEN - search_range;
    (search_range as u16, entry_selector as u16, range_shift as u16)
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

fn slice(bytes: &[u8], at: usize, len: usize) -> Result<&[u8]> {
    at.checked_add(len)
        .and_then(|end| bytes.get(at..end))
        .ok_or_else(|| AppError::parse("truncated font data"))
}

fn be_u16(bytes: &[u8], at: usize) -> Result<u16> {
    let b = slice(bytes, at, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

fn be_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let b = slice(bytes, at, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
