// src/utils/log.rs

//! Formatted progress output on top of `tracing`.
//!
//! Events land in whatever span is current, so pipeline banners nest under
//! the run span like every other event.

use tracing::info;

const RULE_WIDTH: usize = 60;

/// A banner marking the start of a major phase.
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    info!("{}", border);
    info!("  {}", title);
    info!("{}", border);
}

/// One numbered step of a multi-step run.
pub fn step(step_num: usize, total: usize, message: &str) {
    info!("[STEP {}/{}] {}", step_num, total, message);
}

/// An indented detail line.
pub fn sub_item(message: &str) {
    info!("    {}", message);
}

/// A titled key/value block.
pub fn summary(title: &str, items: &[(&str, String)]) {
    info!("[SUMMARY] {}", title);
    for (key, value) in items {
        sub_item(&format!("{key}: {value}"));
    }
}
