//! Command-line interface definitions.
//!
//! Every flag is optional and overrides the matching key of the YAML config
//! (see [`crate::config`]). Browserless settings can also come from the
//! environment.

use crate::config::CrawlConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Crawl tianqi.com weather tables into CSV files.
///
/// # Examples
///
/// ```sh
/// # Build the catalog, then crawl 2011-2024 history
/// tianqi_crawl cities
/// tianqi_crawl history
///
/// # A short range through a headless browser
/// tianqi_crawl --browserless-url http://localhost:3000 history --year-min 2023 --year-max 2023
///
/// # Current conditions for every catalog location
/// tianqi_crawl -o ./out current
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog file of (name, endpoint id) rows
    #[arg(long, global = true, env = "TIANQI_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Directory for the record files
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Lower bound of the politeness delay, in milliseconds
    #[arg(long, global = true)]
    pub pacing_min_ms: Option<u64>,

    /// Upper bound of the politeness delay, in milliseconds
    #[arg(long, global = true)]
    pub pacing_max_ms: Option<u64>,

    /// Browserless base URL; pages are fetched with plain HTTP when unset
    #[arg(long, global = true, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Browserless API token
    #[arg(long, global = true, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub browserless_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Crawl monthly history tables for every catalog location
    History {
        /// First year to crawl (inclusive)
        #[arg(long)]
        year_min: Option<i32>,

        /// Last year to crawl (inclusive)
        #[arg(long)]
        year_max: Option<i32>,

        /// Do not try to click the "show more" control
        #[arg(long)]
        no_expand: bool,
    },

    /// Record current conditions for every catalog location
    Current,

    /// Rebuild the catalog from the site's city index
    Cities,
}

impl Cli {
    /// Apply flag overrides on top of a loaded config.
    pub fn apply_to(&self, config: &mut CrawlConfig) {
        if let Some(ref path) = self.catalog {
            config.catalog_path = path.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(ms) = self.pacing_min_ms {
            config.pacing_min_ms = ms;
        }
        if let Some(ms) = self.pacing_max_ms {
            config.pacing_max_ms = ms;
        }
        if let Some(ref url) = self.browserless_url {
            config.browserless_url = Some(url.clone());
        }
        if let Some(ref token) = self.browserless_token {
            config.browserless_token = Some(token.clone());
        }

        if let Command::History {
            year_min,
            year_max,
            no_expand,
        } = &self.command
        {
            if let Some(y) = year_min {
                config.year_min = *y;
            }
            if let Some(y) = year_max {
                config.year_max = *y;
            }
            if *no_expand {
                config.expand_selector = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_history() {
        let cli = Cli::parse_from([
            "tianqi_crawl",
            "--catalog",
            "cities.csv",
            "history",
            "--year-min",
            "2020",
            "--year-max",
            "2021",
        ]);

        assert_eq!(cli.catalog, Some(PathBuf::from("cities.csv")));
        assert_eq!(
            cli.command,
            Command::History {
                year_min: Some(2020),
                year_max: Some(2021),
                no_expand: false
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tianqi_crawl", "current", "-o", "/tmp/out", "--pacing-min-ms", "0"]);
        assert_eq!(cli.command, Command::Current);
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(cli.pacing_min_ms, Some(0));
    }

    #[test]
    fn test_apply_overrides_config() {
        let cli = Cli::parse_from([
            "tianqi_crawl",
            "--pacing-max-ms",
            "2000",
            "history",
            "--year-min",
            "2015",
            "--no-expand",
        ]);
        let mut config = CrawlConfig::default();
        cli.apply_to(&mut config);

        assert_eq!(config.year_min, 2015);
        assert_eq!(config.year_max, 2024);
        assert_eq!(config.pacing_max_ms, 2000);
        assert_eq!(config.expand_selector, None);
    }

    #[test]
    fn test_year_flags_ignored_outside_history() {
        let cli = Cli::parse_from(["tianqi_crawl", "cities"]);
        let mut config = CrawlConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config, CrawlConfig::default());
    }
}
