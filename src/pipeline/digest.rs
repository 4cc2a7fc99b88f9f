// src/pipeline/digest.rs

//! Join of crawled records with box-office rows.

use std::collections::HashMap;

use crate::models::{BoxOfficeRecord, DetailRecord, DigestEntry};

/// Pair each record with the box-office row of exactly the same name.
///
/// Names are compared verbatim, case included. When the table repeats a
/// name the last row wins. Record order is preserved.
pub fn join_box_office(
    records: Vec<DetailRecord>,
    box_office: Option<&[BoxOfficeRecord]>,
) -> Vec<DigestEntry> {
    let by_name: HashMap<&str, &BoxOfficeRecord> = box_office
        .unwrap_or_default()
        .iter()
        .map(|row| (row.movie_name.as_str(), row))
        .collect();

    records
        .into_iter()
        .map(|record| {
            let box_office = by_name.get(record.name()).map(|row| (*row).clone());
            DigestEntry { record, box_office }
        })
        .collect()
}
