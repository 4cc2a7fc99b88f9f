//! Service layer for the harvester.
//!
//! This module contains the page-level logic for:
//! - Listing and detail extraction (`ListingExtractor`, `DetailExtractor`)
//! - Seen-link membership (`DedupStore` over `ScalableBloom`)
//! - Font de-obfuscation (`GlyphMapDecoder`, `NumericFieldDecoder`)
//! - Box-office parsing (`BoxOfficeParser`)
//! - Politeness delays (`Throttle`, `RequestGate`)

pub mod bloom;
pub mod box_office;
pub mod dedup;
pub mod detail;
pub mod glyphs;
pub mod listing;
pub mod numeric;
pub mod throttle;

pub use bloom::ScalableBloom;
pub use box_office::BoxOfficeParser;
pub use dedup::DedupStore;
pub use detail::{DetailExtractor, truncate_release_date};
pub use glyphs::GlyphMapDecoder;
pub use listing::ListingExtractor;
pub use numeric::NumericFieldDecoder;
pub use throttle::{Pause, RequestGate, Throttle};
