//! Target addressing: which URLs a location expands to.
//!
//! A history crawl visits one page per `(location, period)`; a snapshot
//! crawl visits the location's landing page once.

use super::FetchError;
use crate::models::{Location, Period};
use crate::periods::PeriodRange;
use url::Url;

/// What a crawl visits for each location.
pub trait TargetPlan {
    /// Periods to visit per location, in order. `None` means "the location's
    /// single current-conditions page".
    fn periods(&self) -> Vec<Option<Period>>;

    /// Address of one target.
    fn address(&self, location: &Location, period: Option<Period>) -> Result<Url, FetchError>;

    /// Expand control to activate on each page, if any.
    fn expand_selector(&self) -> Option<&str> {
        None
    }
}

/// Monthly history pages: `{base}{endpoint}/{YYYYMM}.html`.
#[derive(Debug, Clone)]
pub struct HistoryPlan {
    base: Url,
    range: PeriodRange,
    expand_selector: Option<String>,
}

impl HistoryPlan {
    /// Plan one page per `(location, month)` of `range`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root of the history pages; a trailing `/` is added if missing
    /// * `range` - Years to visit, every month of each
    /// * `expand_selector` - "Show more" control to click; blank means none
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        range: PeriodRange,
        expand_selector: Option<String>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            base: directory_url(base_url)?,
            range,
            expand_selector: expand_selector.filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn range(&self) -> PeriodRange {
        self.range
    }
}

impl TargetPlan for HistoryPlan {
    fn periods(&self) -> Vec<Option<Period>> {
        self.range.iter().map(Some).collect()
    }

    fn address(&self, location: &Location, period: Option<Period>) -> Result<Url, FetchError> {
        let period = period.ok_or_else(|| {
            FetchError::InvalidUrl(format!("history target for {} has no period", location.name))
        })?;
        let path = format!(
            "{}/{}.html",
            urlencoding::encode(location.endpoint_id.trim()),
            period.slug()
        );
        Ok(self.base.join(&path)?)
    }

    fn expand_selector(&self) -> Option<&str> {
        self.expand_selector.as_deref()
    }
}

/// Current-conditions landing pages: `{base}{endpoint}/`.
#[derive(Debug, Clone)]
pub struct SnapshotPlan {
    base: Url,
}

impl SnapshotPlan {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            base: directory_url(base_url)?,
        })
    }
}

impl TargetPlan for SnapshotPlan {
    fn periods(&self) -> Vec<Option<Period>> {
        vec![None]
    }

    fn address(&self, location: &Location, _period: Option<Period>) -> Result<Url, FetchError> {
        let path = format!("{}/", urlencoding::encode(location.endpoint_id.trim()));
        Ok(self.base.join(&path)?)
    }
}

/// Parse a base URL so that relative joins land beneath it.
fn directory_url(base_url: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_address() {
        let plan = HistoryPlan::new(
            "https://lishi.tianqi.com",
            PeriodRange::new(2020, 2020).unwrap(),
            Some(".lishidesc2".into()),
        )
        .unwrap();
        let url = plan
            .address(&Location::new("Beijing", "beijing"), Period::new(2020, 5))
            .unwrap();
        assert_eq!(url.as_str(), "https://lishi.tianqi.com/beijing/202005.html");
        assert_eq!(plan.expand_selector(), Some(".lishidesc2"));
    }

    #[test]
    fn test_history_periods_follow_range() {
        let plan = HistoryPlan::new("https://lishi.tianqi.com/", PeriodRange::new(2020, 2021).unwrap(), None).unwrap();
        let periods = plan.periods();
        assert_eq!(periods.len(), 24);
        assert_eq!(periods[0], Period::new(2020, 1));
        assert_eq!(plan.expand_selector(), None);
    }

    #[test]
    fn test_history_requires_period() {
        let plan = HistoryPlan::new("https://lishi.tianqi.com/", PeriodRange::new(2020, 2020).unwrap(), None).unwrap();
        assert!(plan.address(&Location::new("Beijing", "beijing"), None).is_err());
    }

    #[test]
    fn test_snapshot_address_and_single_target() {
        let plan = SnapshotPlan::new("https://www.tianqi.com/").unwrap();
        assert_eq!(plan.periods(), vec![None]);
        let url = plan.address(&Location::new("Shanghai", "shanghai"), None).unwrap();
        assert_eq!(url.as_str(), "https://www.tianqi.com/shanghai/");
    }

    #[test]
    fn test_base_with_path_keeps_prefix() {
        let plan = SnapshotPlan::new("http://127.0.0.1:8080/mirror").unwrap();
        let url = plan.address(&Location::new("Shanghai", "shanghai"), None).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/mirror/shanghai/");
    }
}
