//! Monthly history table adapter.
//!
//! Each day is an `li` under `ul.thrui`:
//!
//! ```text
//! <li>
//!   <div class="th200">2020-05-01 星期五</div>
//!   <div class="th140">27℃</div>   max
//!   <div class="th140">14℃</div>   min
//!   <div class="th140">晴</div>    condition
//!   <div class="th140">西南风 2级</div>  wind
//! </li>
//! ```

use super::{ExtractError, RecordExtractor, first_text, text_of};
use crate::models::{Location, WeatherRecord};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

static CONTAINER: Lazy<Selector> = Lazy::new(|| Selector::parse("ul.thrui").expect("static selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("static selector"));
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.th200").expect("static selector"));
static VALUE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.th140").expect("static selector"));

const VALUE_CELLS: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryExtractor;

impl RecordExtractor for HistoryExtractor {
    type Record = WeatherRecord;

    fn extract(
        &self,
        location: &Location,
        html: &str,
    ) -> Result<Option<Vec<WeatherRecord>>, ExtractError> {
        let document = Html::parse_document(html);
        let Some(container) = document.select(&CONTAINER).next() else {
            return Ok(None);
        };

        let mut records = Vec::new();
        for (i, li) in container.select(&ROW).enumerate() {
            let values: Vec<String> = li.select(&VALUE).map(text_of).collect();
            match values.len() {
                // A row without value cells (e.g. the "show more" footer) is not a day.
                0 => {
                    debug!(row = i, "Skipping row without value cells");
                    continue;
                }
                n if n < VALUE_CELLS => {
                    return Err(ExtractError::Parse(format!(
                        "row {i} has {n} value cells, expected {VALUE_CELLS}"
                    )));
                }
                _ => {}
            }

            let mut values = values.into_iter();
            records.push(WeatherRecord {
                location: location.name.clone(),
                date: first_text(li, &DATE),
                max_temp: values.next().unwrap_or_default(),
                min_temp: values.next().unwrap_or_default(),
                condition: values.next().unwrap_or_default(),
                wind_force: values.next().unwrap_or_default(),
            });
        }

        Ok(Some(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, cells: &[&str]) -> String {
        let cells: String = cells
            .iter()
            .map(|c| format!("<div class=\"th140\">{c}</div>"))
            .collect();
        format!("<li><div class=\"th200\">{date}</div>{cells}</li>")
    }

    fn page(rows: &[String]) -> String {
        format!(
            "<html><body><ul class=\"thrui\">{}</ul></body></html>",
            rows.concat()
        )
    }

    #[test]
    fn test_extracts_rows_in_document_order() {
        let html = page(&[
            row("2020-05-01 星期五", &["27℃", "14℃", "晴", "西南风 2级"]),
            row("2020-05-02 星期六", &["29℃", "16℃", "多云", "南风 3级"]),
        ]);
        let records = HistoryExtractor
            .extract(&Location::new("北京", "beijing"), &html)
            .unwrap()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].location, "北京");
        assert_eq!(records[0].date, "2020-05-01 星期五");
        assert_eq!(records[0].max_temp, "27℃");
        assert_eq!(records[0].wind_force, "西南风 2级");
        assert_eq!(records[1].condition, "多云");
    }

    #[test]
    fn test_missing_container_is_none() {
        let html = "<html><body><div class=\"nodata\">暂无数据</div></body></html>";
        let out = HistoryExtractor
            .extract(&Location::new("北京", "beijing"), html)
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_empty_wind_cell_yields_candidate_with_empty_field() {
        let html = page(&[row("2020-05-01", &["27℃", "14℃", "晴", "  "])]);
        let records = HistoryExtractor
            .extract(&Location::new("北京", "beijing"), &html)
            .unwrap()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].wind_force.is_empty());
    }

    #[test]
    fn test_truncated_row_is_a_parse_error() {
        let html = page(&[row("2020-05-01", &["27℃", "14℃"])]);
        let err = HistoryExtractor
            .extract(&Location::new("北京", "beijing"), &html)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[test]
    fn test_row_without_cells_is_skipped() {
        let html = page(&[
            "<li><a class=\"lishidesc2\">查看更多</a></li>".to_string(),
            row("2020-05-01", &["27℃", "14℃", "晴", "北风 1级"]),
        ]);
        let records = HistoryExtractor
            .extract(&Location::new("北京", "beijing"), &html)
            .unwrap()
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}
