// src/models/selectors.rs

//! CSS selectors and attribute names describing each source's markup.

use serde::{Deserialize, Serialize};

/// Attribute names carrying the listing fields on each list item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingFields {
    pub name: String,
    pub score: String,
    pub region: String,
    pub director: String,
    pub actors: String,
}

impl Default for ListingFields {
    fn default() -> Self {
        Self {
            name: "data-title".to_string(),
            score: "data-score".to_string(),
            region: "data-region".to_string(),
            director: "data-director".to_string(),
            actors: "data-actors".to_string(),
        }
    }
}

/// Selectors for the now-playing listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each movie item in the listing
    pub item_selector: String,

    /// Selector for the detail anchor within an item
    pub link_selector: String,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_attr_name")]
    pub link_attr: String,

    /// Item attribute names for the listing fields
    #[serde(default)]
    pub fields: ListingFields,
}

fn default_attr_name() -> String {
    "href".to_string()
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item_selector: "div#nowplaying ul.lists > li".to_string(),
            link_selector: "li.stitle a".to_string(),
            link_attr: default_attr_name(),
            fields: ListingFields::default(),
        }
    }
}

/// Selectors for a movie detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSelectors {
    /// First match holds the release date, optionally followed by "(Region)"
    pub release_date: String,

    /// Every text node of every match forms one summary line
    pub summary: String,

    /// Each match is one hot comment
    pub comments: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            release_date: r#"span[property="v:initialReleaseDate"]"#.to_string(),
            summary: r#"span[property="v:summary"]"#.to_string(),
            comments: "div.comment p span.short".to_string(),
        }
    }
}

/// Selectors for the box-office dashboard.
///
/// The four list selectors are zipped positionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxOfficeSelectors {
    /// Inline style block embedding the obfuscation font
    pub font_style: String,

    pub movie_name: String,
    pub box_office: String,
    pub release_days: String,
    pub schedule_rate: String,
}

impl Default for BoxOfficeSelectors {
    fn default() -> Self {
        Self {
            font_style: "style#js-nuwa".to_string(),
            movie_name: "li.c1 > b".to_string(),
            box_office: "li.c1 i.cs".to_string(),
            release_days: "li.c1 i.font-orange, li.c1 em".to_string(),
            schedule_rate: "li.c4 > i".to_string(),
        }
    }
}
