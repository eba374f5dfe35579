//! The mutable set of locations that are still crawlable.
//!
//! Insertion order is crawl-priority order. During a run the catalog only
//! ever shrinks: the orchestrator removes a location when its endpoint
//! answers with a permanent failure, and nothing adds locations back.

use crate::csv::parse_rows;
use crate::models::{CATALOG_HEADER, Location};
use itertools::Itertools;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog file is empty (expected header {expected:?})")]
    MissingHeader { expected: &'static [&'static str] },
}

/// Ordered, name-keyed collection of [`Location`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationCatalog {
    locations: Vec<Location>,
}

impl LocationCatalog {
    /// Build a catalog, keeping the first occurrence of each name.
    ///
    /// Used for freshly scraped city lists. Catalog files go through
    /// [`LocationCatalog::from_csv`], which merges duplicates differently.
    pub fn new(locations: Vec<Location>) -> Self {
        let before = locations.len();
        let locations: Vec<Location> = locations
            .into_iter()
            .unique_by(|l| l.name.clone())
            .collect();
        if locations.len() < before {
            warn!(
                dropped = before - locations.len(),
                "Duplicate location names in catalog; kept first occurrence"
            );
        }
        Self { locations }
    }

    /// Parse catalog text: a header row, then `(name, endpoint id)` rows.
    ///
    /// # Arguments
    ///
    /// * `text` - Full contents of the catalog file
    ///
    /// # Returns
    ///
    /// The catalog in file order. A missing second column reads as an empty
    /// endpoint id, which keeps the location but makes crawls skip it. Rows
    /// without a name are skipped with a warning. When a name repeats, the
    /// location keeps the position of its first row and the endpoint id of
    /// its last one.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::MissingHeader`] if the text has no rows at all.
    pub fn from_csv(text: &str) -> Result<Self, CatalogError> {
        let mut rows = parse_rows(text).into_iter();
        let header = rows.next().ok_or(CatalogError::MissingHeader {
            expected: CATALOG_HEADER,
        })?;
        debug!(?header, "Catalog header");

        let mut locations = Vec::new();
        for (i, row) in rows.enumerate() {
            let mut cells = row.into_iter();
            let name = cells.next().unwrap_or_default().trim().to_string();
            if name.is_empty() {
                // header is line 1
                warn!(line = i + 2, "Catalog row has no location name; skipping");
                continue;
            }
            let endpoint_id = cells.next().unwrap_or_default().trim().to_string();
            locations.push(Location { name, endpoint_id });
        }

        Ok(Self {
            locations: merge_last_endpoint(locations),
        })
    }

    /// Copy of the current membership, for iterating while the live catalog
    /// is mutated.
    pub fn snapshot(&self) -> Vec<Location> {
        self.locations.clone()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Remove a location by name, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Location> {
        let idx = self.locations.iter().position(|l| l.name == name)?;
        Some(self.locations.remove(idx))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locations.iter().any(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Collapse repeated names: first position, last endpoint id.
fn merge_last_endpoint(rows: Vec<Location>) -> Vec<Location> {
    let repeated: Vec<String> = rows.iter().map(|l| l.name.clone()).duplicates().collect();
    if !repeated.is_empty() {
        warn!(names = ?repeated, "Duplicate location names in catalog; using the last endpoint id");
    }

    let mut merged: Vec<Location> = Vec::with_capacity(rows.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for location in rows {
        match index.get(&location.name) {
            Some(&i) => merged[i].endpoint_id = location.endpoint_id,
            None => {
                index.insert(location.name.clone(), merged.len());
                merged.push(location);
            }
        }
    }
    merged
}
