// src/testing.rs

//! Fixtures shared by the unit tests: synthetic fonts, canned pages and
//! in-memory collaborators.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::error::{AppError, Result};
use crate::models::{Config, HeaderProfile, SeenRecord};
use crate::storage::SeenStore;
use crate::utils::http::{FetchResponse, Fetcher};

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

/// Ten private-use codepoints, in digit order.
pub fn digit_codepoints() -> Vec<char> {
    [
        0xEFD3, 0xEC6A, 0xE4F9, 0xF8F3, 0xF324, 0xE7F7, 0xE711, 0xF1C9, 0xE21D, 0xF1D7,
    ]
    .into_iter()
    .filter_map(char::from_u32)
    .collect()
}

/// A font whose glyph order is two placeholders followed by `uniXXXX` glyphs.
pub fn digit_font(codepoints: &[char]) -> Vec<u8> {
    let mut names = vec!["glyph00000".to_string(), "x".to_string()];
    names.extend(codepoints.iter().map(|&c| format!("uni{:04X}", c as u32)));
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    font_with_glyph_names(&refs)
}

/// A minimal TrueType font carrying only the tables needed to read glyph names.
pub fn font_with_glyph_names(names: &[&str]) -> Vec<u8> {
    let count = names.len() as u16;

    let mut head = Vec::new();
    head.extend(0x0001_0000u32.to_be_bytes()); // version
    head.extend(0x0001_0000u32.to_be_bytes()); // fontRevision
    head.extend(0u32.to_be_bytes()); // checkSumAdjustment
    head.extend(0x5F0F_3CF5u32.to_be_bytes()); // magicNumber
    head.extend(0u16.to_be_bytes()); // flags
    head.extend(1000u16.to_be_bytes()); // unitsPerEm
    head.extend([0u8; 16]); // created, modified
    head.extend([0u8; 8]); // bounding box
    head.extend(0u16.to_be_bytes()); // macStyle
    head.extend(8u16.to_be_bytes()); // lowestRecPPEM
    head.extend(2i16.to_be_bytes()); // fontDirectionHint
    head.extend(0i16.to_be_bytes()); // indexToLocFormat
    head.extend(0i16.to_be_bytes()); // glyphDataFormat

    let mut hhea = Vec::new();
    hhea.extend(0x0001_0000u32.to_be_bytes());
    hhea.extend(800i16.to_be_bytes()); // ascender
    hhea.extend((-200i16).to_be_bytes()); // descender
    hhea.extend(0i16.to_be_bytes()); // lineGap
    hhea.extend([0u8; 24]);
    hhea.extend(1u16.to_be_bytes()); // numberOfHMetrics

    let mut maxp = Vec::new();
    maxp.extend(0x0000_5000u32.to_be_bytes());
    maxp.extend(count.to_be_bytes());

    let mut post = Vec::new();
    post.extend(0x0002_0000u32.to_be_bytes());
    post.extend([0u8; 28]); // italicAngle .. maxMemType1
    post.extend(count.to_be_bytes());
    for i in 0..count {
        post.extend((258 + i).to_be_bytes());
    }
    for name in names {
        post.push(name.len() as u8);
        post.extend(name.as_bytes());
    }

    sfnt(&[
        (*b"head", head),
        (*b"hhea", hhea),
        (*b"maxp", maxp),
        (*b"post", post),
    ])
}

/// Assemble an sfnt from tables already sorted by tag.
fn sfnt(tables: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
    let num_tables = tables.len();
    let mut out = Vec::new();
    out.extend(0x0001_0000u32.to_be_bytes());
    out.extend((num_tables as u16).to_be_bytes());
    out.extend([0u8; 6]); // searchRange, entrySelector, rangeShift

    let mut offset = 12 + 16 * num_tables;
    for (tag, data) in tables {
        out.extend(tag);
        out.extend(0u32.to_be_bytes());
        out.extend((offset as u32).to_be_bytes());
        out.extend((data.len() as u32).to_be_bytes());
        offset += padded(data.len());
    }
    for (_, data) in tables {
        out.extend(data);
        out.resize(out.len() + padded(data.len()) - data.len(), 0);
    }
    out
}

/// Wrap an sfnt in a WOFF 1.0 container with zlib-compressed tables.
pub fn woff_from_sfnt(sfnt: &[u8]) -> Vec<u8> {
    let be_u16 = |at: usize| u16::from_be_bytes([sfnt[at], sfnt[at + 1]]);
    let be_u32 = |at: usize| u32::from_be_bytes([sfnt[at], sfnt[at + 1], sfnt[at + 2], sfnt[at + 3]]);

    let num_tables = usize::from(be_u16(4));
    let mut entries = Vec::new();
    for i in 0..num_tables {
        let record = 12 + 16 * i;
        let tag = &sfnt[record..record + 4];
        let checksum = be_u32(record + 4);
        let offset = be_u32(record + 8) as usize;
        let len = be_u32(record + 12) as usize;
        let data = &sfnt[offset..offset + len];

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();
        let stored = if compressed.len() < data.len() {
            compressed
        } else {
            data.to_vec()
        };
        entries.push((tag.to_vec(), checksum, len, stored));
    }

    let mut body = Vec::new();
    let mut directory = Vec::new();
    let mut offset = 44 + 20 * num_tables;
    for (tag, checksum, orig_len, stored) in &entries {
        directory.extend(tag);
        directory.extend((offset as u32).to_be_bytes());
        directory.extend((stored.len() as u32).to_be_bytes());
        directory.extend((*orig_len as u32).to_be_bytes());
        directory.extend(checksum.to_be_bytes());
        body.extend(stored);
        body.resize(body.len() + padded(stored.len()) - stored.len(), 0);
        offset += padded(stored.len());
    }

    let mut out = Vec::new();
    out.extend(b"wOFF");
    out.extend(be_u32(0).to_be_bytes()); // flavor
    out.extend(((44 + directory.len() + body.len()) as u32).to_be_bytes());
    out.extend((num_tables as u16).to_be_bytes());
    out.extend(0u16.to_be_bytes()); // reserved
    out.extend((sfnt.len() as u32).to_be_bytes()); // totalSfntSize
    out.extend([0u8; 24]); // versions, metadata, private data
    out.extend(directory);
    out.extend(body);
    out
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

/// An inline `@font-face` rule embedding `font` as base64.
pub fn font_style(font: &[u8]) -> String {
    format!(
        "@font-face{{font-family:\"cs\";src:url(data:application/font-woff;charset=utf-8;base64,{}) format(\"woff\");}}",
        STANDARD.encode(font)
    )
}

/// Replace ASCII digits with their obfuscated codepoints.
pub fn obfuscate(text: &str, codepoints: &[char]) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => codepoints[d as usize],
            None => c,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// A now-playing page listing `(name, detail link)` items.
pub fn listing_page<N: AsRef<str>, L: AsRef<str>>(items: &[(N, L)]) -> String {
    let items: Vec<String> = items
        .iter()
        .map(|(name, link)| {
            let (name, link) = (name.as_ref(), link.as_ref());
            format!(
                r#"<li class="list-item" data-title="{name}" data-score="8.2" data-region="Region X"
                     data-director="Dir" data-actors="A / B">
                     <ul><li class="poster"><img src="p.jpg"></li>
                     <li class="stitle"><a href="{link}">{name}</a></li></ul>
                   </li>"#
            )
        })
        .collect();

    format!(
        r#"<html><body><div id="nowplaying"><ul class="lists">{}</ul></div></body></html>"#,
        items.join("\n")
    )
}

/// A detail page with the given release date, summary paragraphs and comments.
pub fn detail_page(release_date: &str, summary: &[&str], comments: &[&str]) -> String {
    let summary = summary.join("<br>");
    let comments: String = comments
        .iter()
        .map(|c| format!(r#"<div class="comment"><p class=""><span class="short">{c}</span></p></div>"#))
        .collect();

    format!(
        r#"<html><body>
             <span property="v:initialReleaseDate" content="x">{release_date}</span>
             <span property="v:summary">{summary}</span>
             <div id="hot-comments">{comments}</div>
           </body></html>"#
    )
}

/// A box-office page whose numbers are obfuscated with `codepoints`.
///
/// Rows are `(name, box office, released days, schedule rate)` in plain digits.
pub fn box_office_page(codepoints: &[char], rows: &[(&str, &str, &str, &str)]) -> String {
    let style = font_style(&woff_from_sfnt(&digit_font(codepoints)));
    let rows: String = rows
        .iter()
        .enumerate()
        .map(|(i, (name, total, days, rate))| {
            let (total, days, rate) = (
                obfuscate(total, codepoints),
                obfuscate(days, codepoints),
                obfuscate(rate, codepoints),
            );
            // Alternate the two released-days markups the page uses.
            let days = if i % 2 == 0 {
                format!(r#"<i class="font-orange">{days}</i>"#)
            } else {
                format!("<em>{days}</em>")
            };
            format!(
                r#"<ul class="canTouch"><li class="c1"><b>{name}</b><br>{days}<i class="cs">{total}</i></li><li class="c2"></li><li class="c4 "><i>{rate}</i></li></ul>"#
            )
        })
        .collect();

    format!(
        r#"<html><head><style id="js-nuwa">{style}</style></head><body><div id="ticket_tbody">{rows}</div></body></html>"#
    )
}

/// Configuration pointing the listing at `listing_url`, without delays.
pub fn test_config(listing_url: &str) -> Config {
    let mut config = Config::default();
    config.listing.url_template = listing_url.to_string();
    config.crawler.min_delay_ms = 0;
    config.crawler.max_delay_ms = 0;
    config
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

enum Reply {
    Page(String),
    Status(u16),
}

/// Canned responses keyed by URL; unknown URLs are refused.
#[derive(Default)]
pub struct StubFetcher {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<(String, HeaderProfile)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: String) -> Self {
        self.replies.insert(url.to_string(), Reply::Page(body));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.replies.insert(url.to_string(), Reply::Status(status));
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Referer sent with the first request for `url`.
    pub fn referer_of(&self, url: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(called, _)| called == url)
            .and_then(|(_, profile)| profile.get("Referer").map(str::to_string))
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str, profile: &HeaderProfile) -> Result<FetchResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), profile.clone()));

        match self.replies.get(url) {
            Some(Reply::Page(body)) => Ok(FetchResponse {
                status: 200,
                body: body.clone().into_bytes(),
                ..FetchResponse::default()
            }),
            Some(Reply::Status(status)) => Err(AppError::http(url, *status)),
            None => Err(AppError::connection(url, "connection refused")),
        }
    }
}

/// Seen-store kept in memory.
#[derive(Default)]
pub struct MemorySeenStore {
    links: Mutex<Vec<String>>,
    fail_inserts: bool,
}

impl MemorySeenStore {
    pub fn with_links(links: &[&str]) -> Self {
        Self {
            links: Mutex::new(links.iter().map(|l| l.to_string()).collect()),
            fail_inserts: false,
        }
    }

    /// A store that loads fine but rejects every insert.
    pub fn failing() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    pub fn links(&self) -> Vec<String> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn find_all_keys(&self) -> Result<Vec<String>> {
        Ok(self.links())
    }

    async fn insert(&self, record: &SeenRecord) -> Result<()> {
        if self.fail_inserts {
            return Err(AppError::storage("insert rejected"));
        }
        self.links.lock().unwrap().push(record.link.clone());
        Ok(())
    }
}
