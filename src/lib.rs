// src/lib.rs

//! nowplaying: incremental now-playing movie harvester.
//!
//! Crawls a now-playing listing, fetches detail pages only for movies not
//! seen before, and enriches them with box-office figures recovered from a
//! font-obfuscated page.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
