//! The crawl loop: catalog × plan → fetch → classify → persist.
//!
//! # Run shape
//!
//! 1. Iterate a snapshot of the catalog (the live catalog may shrink).
//! 2. Skip locations without an endpoint id, with no network access.
//! 3. For each target of the plan, in order: pace, fetch (with best-effort
//!    expand), classify, then
//!    - `Success`: append the rows immediately;
//!    - `Empty`: log and move on;
//!    - `Transient`: log and move on, that target is not retried this run;
//!    - `Permanent`: prune the location, rewrite the catalog, stop visiting
//!      its remaining targets.
//!
//! Requests are strictly sequential. Per-target failures never abort the
//! run; only a failing local store does, since carrying on would drop data
//! silently.

use crate::catalog::LocationCatalog;
use crate::extract::RecordExtractor;
use crate::fetch::{Renderer, TargetFetcher, TargetPlan};
use crate::models::Period;
use crate::outcome::{Outcome, classify};
use crate::pacing::Pacer;
use crate::store::{PersistenceSink, StoreError};
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub locations: usize,
    pub skipped: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub transient: usize,
    pub pruned: usize,
    pub rows_written: usize,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} locations ({} skipped, {} pruned): {} attempts, {} ok, {} empty, {} failed, {} rows",
            self.locations,
            self.skipped,
            self.pruned,
            self.attempted,
            self.succeeded,
            self.empty,
            self.transient,
            self.rows_written
        )
    }
}

fn period_label(period: Option<Period>) -> String {
    period.map(|p| p.to_string()).unwrap_or_else(|| "current".to_string())
}

/// Drives a crawl over one transport, one extractor and one sink.
pub struct CrawlOrchestrator<R, E, S, P> {
    fetcher: TargetFetcher<R>,
    extractor: E,
    sink: S,
    pacer: P,
}

impl<R, E, S, P> CrawlOrchestrator<R, E, S, P>
where
    R: Renderer,
    E: RecordExtractor,
    E::Record: Sync,
    S: PersistenceSink,
    P: Pacer,
{
    pub fn new(renderer: R, extractor: E, sink: S, pacer: P) -> Self {
        Self {
            fetcher: TargetFetcher::new(renderer),
            extractor,
            sink,
            pacer,
        }
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        self.fetcher.renderer()
    }

    /// Crawl every target of `plan` for every location in `catalog`.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Live catalog, pruned in place on permanent failures
    /// * `plan` - Targets to visit per location
    ///
    /// # Returns
    ///
    /// Counters for the run. The catalog store is rewritten after each prune.
    ///
    /// # Errors
    ///
    /// Only persistence failures abort the run, as [`CrawlError::Store`].
    #[instrument(level = "info", skip_all, fields(locations = catalog.len()))]
    pub async fn run<T: TargetPlan>(
        &mut self,
        catalog: &mut LocationCatalog,
        plan: &T,
    ) -> Result<CrawlSummary, CrawlError> {
        let t0 = Instant::now();
        let periods = plan.periods();
        let mut summary = CrawlSummary {
            locations: catalog.len(),
            ..Default::default()
        };
        info!(targets_per_location = periods.len(), "Crawl starting");

        for location in catalog.snapshot() {
            if !location.has_endpoint() {
                warn!(location = %location.name, "Location has no endpoint id; skipping");
                summary.skipped += 1;
                continue;
            }

            for &period in &periods {
                let label = period_label(period);
                let url = match plan.address(&location, period) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(location = %location.name, period = %label, error = %e, "Could not build target address");
                        summary.transient += 1;
                        continue;
                    }
                };

                self.pacer.pause().await;
                info!(location = %location.name, period = %label, %url, "Fetching");
                summary.attempted += 1;

                let fetched = self.fetcher.fetch(url.as_str(), plan.expand_selector()).await;
                let outcome = classify(fetched, &self.extractor, &location);
                debug!(location = %location.name, period = %label, outcome = %outcome.kind(), "Classified attempt");
                match outcome {
                    Outcome::Success { records, dropped } => {
                        let written = self.sink.append_records(&records).await?;
                        summary.succeeded += 1;
                        summary.rows_written += written;
                        info!(location = %location.name, period = %label, rows = written, dropped, "Saved rows");
                    }
                    Outcome::Empty(reason) => {
                        summary.empty += 1;
                        info!(location = %location.name, period = %label, %reason, "No data; nothing saved");
                    }
                    Outcome::Transient(failure) => {
                        summary.transient += 1;
                        warn!(location = %location.name, period = %label, error = %failure, "Attempt failed; moving on");
                    }
                    Outcome::Permanent(e) => {
                        error!(location = %location.name, period = %label, error = %e, "Access denied; removing location from catalog");
                        catalog.remove(&location.name);
                        debug_assert!(!catalog.contains(&location.name));
                        self.sink.overwrite_catalog(catalog.locations()).await?;
                        summary.pruned += 1;
                        break;
                    }
                }
            }
        }

        let elapsed = t0.elapsed();
        info!(?elapsed, remaining = catalog.len(), "Crawl complete: {}", summary);
        Ok(summary)
    }
}
