//! Classification of a single fetch + extract attempt.
//!
//! | Outcome | Cause | Catalog effect |
//! |---------|-------|----------------|
//! | `Permanent` | transport reported access denied (403) | location pruned |
//! | `Transient` | any other transport failure, or a structural parse failure | none |
//! | `Empty` | container absent, or no well-formed record survived filtering | none |
//! | `Success` | at least one well-formed record | none |
//!
//! Well-formedness is a per-record filter: malformed rows are dropped and
//! counted, they never fail the attempt on their own.

use crate::extract::{ExtractError, RecordExtractor};
use crate::fetch::{FetchError, RenderedPage};
use crate::models::{CsvRecord, Location};
use std::fmt;

/// Coarse label of an [`Outcome`], for logs and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Empty,
    Transient,
    Permanent,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Success => write!(f, "SUCCESS"),
            OutcomeKind::Empty => write!(f, "EMPTY"),
            OutcomeKind::Transient => write!(f, "TRANSIENT"),
            OutcomeKind::Permanent => write!(f, "PERMANENT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The page has no data container for this target.
    ContainerMissing,
    /// The container was there but every candidate had an empty field.
    NoWellFormedRecords { dropped: usize },
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::ContainerMissing => write!(f, "data container not found"),
            EmptyReason::NoWellFormedRecords { dropped } => {
                write!(f, "no complete rows ({} incomplete dropped)", dropped)
            }
        }
    }
}

#[derive(Debug)]
pub enum TransientFailure {
    Fetch(FetchError),
    Parse(ExtractError),
}

impl fmt::Display for TransientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientFailure::Fetch(e) => write!(f, "{}", e),
            TransientFailure::Parse(e) => write!(f, "{}", e),
        }
    }
}

/// Classified result of one attempt.
#[derive(Debug)]
pub enum Outcome<R> {
    /// Well-formed records, in document order, plus how many were dropped.
    Success { records: Vec<R>, dropped: usize },
    Empty(EmptyReason),
    Transient(TransientFailure),
    Permanent(FetchError),
}

impl<R> Outcome<R> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success { .. } => OutcomeKind::Success,
            Outcome::Empty(_) => OutcomeKind::Empty,
            Outcome::Transient(_) => OutcomeKind::Transient,
            Outcome::Permanent(_) => OutcomeKind::Permanent,
        }
    }
}

/// Classify a transport result, running the extractor on success.
pub fn classify<E: RecordExtractor>(
    fetched: Result<RenderedPage, FetchError>,
    extractor: &E,
    location: &Location,
) -> Outcome<E::Record> {
    match fetched {
        Err(e) if e.is_access_denied() => Outcome::Permanent(e),
        Err(e) => Outcome::Transient(TransientFailure::Fetch(e)),
        Ok(page) => classify_extraction(extractor.extract(location, &page.html)),
    }
}

/// Classify the result of running an extractor over a fetched document.
pub fn classify_extraction<R: CsvRecord>(
    extracted: Result<Option<Vec<R>>, ExtractError>,
) -> Outcome<R> {
    match extracted {
        Err(e) => Outcome::Transient(TransientFailure::Parse(e)),
        Ok(None) => Outcome::Empty(EmptyReason::ContainerMissing),
        Ok(Some(candidates)) => {
            let (records, dropped) = retain_well_formed(candidates);
            if records.is_empty() {
                Outcome::Empty(EmptyReason::NoWellFormedRecords { dropped })
            } else {
                Outcome::Success { records, dropped }
            }
        }
    }
}

/// Keep only well-formed records, preserving order. Returns the count dropped.
pub fn retain_well_formed<R: CsvRecord>(candidates: Vec<R>) -> (Vec<R>, usize) {
    let total = candidates.len();
    let records: Vec<R> = candidates.into_iter().filter(|r| r.is_well_formed()).collect();
    let dropped = total - records.len();
    (records, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::HistoryExtractor;
    use crate::fetch::ExpandStatus;
    use crate::models::WeatherRecord;

    fn record(wind: &str) -> WeatherRecord {
        WeatherRecord {
            location: "Beijing".into(),
            date: "2020-05-01".into(),
            max_temp: "27℃".into(),
            min_temp: "14℃".into(),
            condition: "晴".into(),
            wind_force: wind.into(),
        }
    }

    fn page(html: &str) -> RenderedPage {
        RenderedPage {
            html: html.into(),
            expand: ExpandStatus::NotRequested,
        }
    }

    #[test]
    fn test_forbidden_is_permanent() {
        let outcome = classify(
            Err(FetchError::from_status(403, "https://lishi.tianqi.com/beijing/202005.html")),
            &HistoryExtractor,
            &Location::new("Beijing", "beijing"),
        );
        assert_eq!(outcome.kind(), OutcomeKind::Permanent);
    }

    #[test]
    fn test_other_transport_failures_are_transient() {
        for err in [
            FetchError::from_status(500, "u"),
            FetchError::from_status(404, "u"),
            FetchError::Network("timed out".into()),
            FetchError::Render { status: 403, message: "token".into() },
        ] {
            let outcome = classify(Err(err), &HistoryExtractor, &Location::new("Beijing", "beijing"));
            assert_eq!(outcome.kind(), OutcomeKind::Transient);
        }
    }

    #[test]
    fn test_missing_container_is_empty() {
        let outcome = classify(Ok(page("<html></html>")), &HistoryExtractor, &Location::new("Beijing", "beijing"));
        assert!(matches!(outcome, Outcome::Empty(EmptyReason::ContainerMissing)));
    }

    #[test]
    fn test_parse_error_is_transient() {
        let outcome: Outcome<WeatherRecord> = classify_extraction(Err(ExtractError::Parse("bad row".into())));
        assert!(matches!(outcome, Outcome::Transient(TransientFailure::Parse(_))));
    }

    #[test]
    fn test_only_invalid_candidate_is_empty() {
        let outcome = classify_extraction(Ok(Some(vec![record("")])));
        assert!(matches!(
            outcome,
            Outcome::Empty(EmptyReason::NoWellFormedRecords { dropped: 1 })
        ));
    }

    #[test]
    fn test_malformed_rows_dropped_from_success() {
        let outcome = classify_extraction(Ok(Some(vec![record("北风 1级"), record(" "), record("南风 2级")])));
        match outcome {
            Outcome::Success { records, dropped } => {
                assert_eq!(dropped, 1);
                assert_eq!(records.len(), 2);
                assert!(records.iter().all(|r| r.is_well_formed()));
                assert_eq!(records[1].wind_force, "南风 2级");
            }
            other => panic!("expected success, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_empty_container_is_empty() {
        let outcome: Outcome<WeatherRecord> = classify_extraction(Ok(Some(vec![])));
        assert_eq!(outcome.kind(), OutcomeKind::Empty);
    }
}
