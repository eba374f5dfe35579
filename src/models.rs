//! Data models for crawl targets and the weather rows they produce.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Location`]: A named crawl target and its endpoint identifier
//! - [`Period`]: A `(year, month)` unit of historical data
//! - [`WeatherRecord`]: One day of a monthly history table
//! - [`CurrentWeatherRecord`]: A current-conditions snapshot for one location
//!
//! Every row type implements [`CsvRecord`], which gives the store a header,
//! a row encoding and the all-or-nothing well-formedness rule.

use chrono::NaiveDate;
use std::fmt;

/// Value used for sunrise/sunset when the source text cannot be split.
pub const UNKNOWN_SUN_TIME: &str = "N/A";

/// Header row of the catalog file.
pub const CATALOG_HEADER: &[&str] = &["City Name", "URL"];

/// A row type that can be persisted to a tabular file.
pub trait CsvRecord {
    /// Column names, written once when the destination is new or empty.
    const HEADER: &'static [&'static str];

    /// Encode the record as one row, in `HEADER` order.
    fn to_row(&self) -> Vec<String>;

    /// A record is well-formed only if every required field is non-empty
    /// after trimming.
    fn is_well_formed(&self) -> bool {
        self.to_row().iter().all(|field| !field.trim().is_empty())
    }
}

/// A named crawl target.
///
/// `name` is the identity key inside a catalog. An empty `endpoint_id` marks
/// the location as unusable: crawls skip it without any network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub endpoint_id: String,
}

impl Location {
    pub fn new(name: impl Into<String>, endpoint_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint_id: endpoint_id.into(),
        }
    }

    /// Whether this location can be crawled at all.
    pub fn has_endpoint(&self) -> bool {
        !self.endpoint_id.trim().is_empty()
    }
}

impl CsvRecord for Location {
    const HEADER: &'static [&'static str] = CATALOG_HEADER;

    fn to_row(&self) -> Vec<String> {
        vec![self.name.clone(), self.endpoint_id.clone()]
    }

    // An endpoint-less location is still a valid catalog entry.
    fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// A `(year, month)` unit of historical data. `month` is always in `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Build a period, rejecting months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// First calendar day of the period, if chrono can represent the year.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Compact `YYYYMM` form used in history page addresses.
    pub fn slug(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_day() {
            Some(day) => write!(f, "{}", day.format("%Y-%m")),
            None => write!(f, "{:04}-{:02}", self.year, self.month),
        }
    }
}

/// One day of a monthly history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherRecord {
    pub location: String,
    pub date: String,
    pub max_temp: String,
    pub min_temp: String,
    pub condition: String,
    pub wind_force: String,
}

impl CsvRecord for WeatherRecord {
    const HEADER: &'static [&'static str] = &["城市", "日期", "最高气温", "最低气温", "天气", "风力"];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.location.clone(),
            self.date.clone(),
            self.max_temp.clone(),
            self.min_temp.clone(),
            self.condition.clone(),
            self.wind_force.clone(),
        ]
    }
}

/// Current conditions for one location, as shown on its landing page.
///
/// `sunrise` and `sunset` hold [`UNKNOWN_SUN_TIME`] when the page text could
/// not be split into both parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentWeatherRecord {
    pub location: String,
    pub date: String,
    pub temperature: String,
    pub condition: String,
    pub humidity: String,
    pub wind_direction: String,
    pub uv_index: String,
    pub air_quality: String,
    pub pm_value: String,
    pub sunrise: String,
    pub sunset: String,
}

impl CsvRecord for CurrentWeatherRecord {
    const HEADER: &'static [&'static str] = &[
        "城市", "日期", "温度", "天气", "湿度", "风向", "紫外线", "空气质量", "PM值", "日出", "日落",
    ];

    fn to_row(&self) -> Vec<String> {
        vec![
            self.location.clone(),
            self.date.clone(),
            self.temperature.clone(),
            self.condition.clone(),
            self.humidity.clone(),
            self.wind_direction.clone(),
            self.uv_index.clone(),
            self.air_quality.clone(),
            self.pm_value.clone(),
            self.sunrise.clone(),
            self.sunset.clone(),
        ]
    }
}
