//! Digest entries handed to the notifier.

use serde::{Deserialize, Serialize};

use crate::models::{BoxOfficeRecord, DetailRecord};

/// A crawled movie with its box-office row when the names match exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigestEntry {
    pub record: DetailRecord,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_office: Option<BoxOfficeRecord>,
}

impl DigestEntry {
    /// Render the entry as a plain-text digest block.
    pub fn render(&self) -> String {
        let entry = &self.record.entry;
        let detail = &self.record.detail;

        let mut out = match &self.box_office {
            Some(board) => format!(
                "<{}>\tScore: {}\n{}\tBox office: {}\tSchedule share: {}\n",
                entry.name,
                entry.score,
                board.release_days,
                board.cumulative_box_office,
                board.schedule_rate_percent
            ),
            None => format!("<{}>\t{}\n", entry.name, entry.score),
        };

        out.push_str(&format!("Release date: {}\n", detail.release_date));
        out.push_str(&format!("Region: {}\n", entry.region));
        out.push_str(&format!("Director: {}\n", entry.director));
        out.push_str(&format!("Actors: {}\n", entry.actors));
        out.push_str(&format!("Summary: {}\n", detail.summary));
        out.push_str("Hot comments: \n");

        let comments: Vec<String> = detail
            .hot_comments
            .iter()
            .map(|c| format!(">>> {c}"))
            .collect();
        out.push_str(&comments.join("\n"));
        out
    }
}

/// Render a whole digest, entries separated by blank lines.
pub fn render_digest(entries: &[DigestEntry]) -> String {
    entries
        .iter()
        .map(DigestEntry::render)
        .collect::<Vec<_>>()
        .join("\n\n\n")
}
