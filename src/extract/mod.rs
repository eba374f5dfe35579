//! Site-specific adapters from a rendered document to candidate records.
//!
//! Each adapter implements [`RecordExtractor`]:
//!
//! | Adapter | Module | Container | Record |
//! |---------|--------|-----------|--------|
//! | Monthly history table | [`history`] | `ul.thrui` | [`WeatherRecord`](crate::models::WeatherRecord) |
//! | Current conditions | [`current`] | `dl.weather_info` | [`CurrentWeatherRecord`](crate::models::CurrentWeatherRecord) |
//! | City index | [`cities`] | `ul.table_list` | [`Location`] |
//!
//! Adapters return `Ok(None)` when the expected container is absent and
//! `Ok(Some(candidates))` otherwise. Candidates may have empty fields; the
//! outcome classifier drops those. An `Err` means the container's structure
//! could not be walked at all.

pub mod cities;
pub mod current;
pub mod history;

use crate::models::{CsvRecord, Location};
use scraper::ElementRef;
use thiserror::Error;

pub use cities::CityIndexExtractor;
pub use current::CurrentWeatherExtractor;
pub use history::HistoryExtractor;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Document → zero or more candidate records.
pub trait RecordExtractor {
    type Record: CsvRecord;

    fn extract(
        &self,
        location: &Location,
        html: &str,
    ) -> Result<Option<Vec<Self::Record>>, ExtractError>;
}

/// Whitespace-trimmed text content of an element.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the first match under `parent`, or an empty string.
pub(crate) fn first_text(parent: ElementRef<'_>, selector: &scraper::Selector) -> String {
    parent.select(selector).next().map(text_of).unwrap_or_default()
}
