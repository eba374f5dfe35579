//! Restart-safe persistence for records and the location catalog.
//!
//! Two independent contracts:
//!
//! - **Records** are append-only. The header is written only when the file
//!   is new or empty; existing rows are never rewritten or deduplicated, so
//!   re-crawling a period that was already collected duplicates its rows.
//! - **The catalog** is fully replaced on every write. The new content goes
//!   to a sibling temp file that is then renamed over the old one, so a
//!   crash leaves either the previous or the new membership on disk.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── weather_data.csv      # history rows (append-only)
//! └── current_weather.csv   # snapshot rows (append-only)
//! cities_all.csv            # catalog (rewritten on every prune)
//! ```

use crate::catalog::{CatalogError, LocationCatalog};
use crate::csv::encode_row;
use crate::models::{CsvRecord, Location};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog {}: {source}", path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Destination for crawl results and catalog updates.
pub trait PersistenceSink {
    /// Append records in input order, writing the header first if the
    /// destination is new or empty. Returns the number of rows written.
    async fn append_records<R: CsvRecord + Sync>(&self, records: &[R]) -> Result<usize, StoreError>;

    /// Replace the catalog with a header and one row per location.
    async fn overwrite_catalog(&self, locations: &[Location]) -> Result<(), StoreError>;
}

/// CSV files on the local filesystem.
#[derive(Debug, Clone)]
pub struct CsvStore {
    records_path: PathBuf,
    catalog_path: PathBuf,
}

impl CsvStore {
    pub fn new(records_path: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            records_path: records_path.into(),
            catalog_path: catalog_path.into(),
        }
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }
}

impl PersistenceSink for CsvStore {
    #[instrument(level = "debug", skip_all, fields(path = %self.records_path.display(), count = records.len()))]
    async fn append_records<R: CsvRecord + Sync>(&self, records: &[R]) -> Result<usize, StoreError> {
        let path = self.records_path.as_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err(parent))?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .await
            .map_err(io_err(path))?;
        let existing = file.metadata().await.map_err(io_err(path))?.len();

        let mut buf = String::new();
        if existing == 0 {
            buf.push_str(&encode_row(R::HEADER));
        } else if !ends_with_newline(&mut file).await.map_err(io_err(path))? {
            // a crash mid-write left a partial last row; keep it on its own line
            warn!(bytes = existing, "Records file does not end with a newline; terminating last row");
            buf.push('\n');
        }
        for record in records {
            buf.push_str(&encode_row(&record.to_row()));
        }

        file.write_all(buf.as_bytes()).await.map_err(io_err(path))?;
        file.flush().await.map_err(io_err(path))?;
        debug!(bytes = buf.len(), header = existing == 0, "Appended rows");
        Ok(records.len())
    }

    #[instrument(level = "debug", skip_all, fields(path = %self.catalog_path.display(), count = locations.len()))]
    async fn overwrite_catalog(&self, locations: &[Location]) -> Result<(), StoreError> {
        write_table(&self.catalog_path, Location::HEADER, locations).await?;
        info!(path = %self.catalog_path.display(), locations = locations.len(), "Rewrote catalog");
        Ok(())
    }
}

async fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    file.seek(SeekFrom::End(-1)).await?;
    let last = file.read_u8().await?;
    Ok(last == b'\n')
}

/// Atomically replace `path` with a header and the given rows.
async fn write_table<R: CsvRecord>(path: &Path, header: &[&str], rows: &[R]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err(parent))?;
    }

    let mut content = encode_row(header);
    for row in rows {
        content.push_str(&encode_row(&row.to_row()));
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content.as_bytes()).await.map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).await.map_err(io_err(path))?;
    Ok(())
}

/// Read the catalog file written by the bootstrap step or a previous run.
///
/// # Arguments
///
/// * `path` - Location of the catalog CSV (header `City Name,URL`)
///
/// # Returns
///
/// The parsed [`LocationCatalog`], in file order.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read, or
/// [`StoreError::Catalog`] if it has no header row.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_catalog(path: &Path) -> Result<LocationCatalog, StoreError> {
    let text = fs::read_to_string(path).await.map_err(io_err(path))?;
    let catalog = LocationCatalog::from_csv(&text).map_err(|source| StoreError::Catalog {
        path: path.to_path_buf(),
        source,
    })?;
    info!(locations = catalog.len(), "Loaded catalog");
    Ok(catalog)
}
