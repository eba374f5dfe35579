//! Current-conditions adapter for a location's landing page.
//!
//! Reads the `dl.weather_info` block. Missing leaves become empty fields
//! (the record is then dropped by the well-formedness filter), except
//! sunrise/sunset, which fall back to [`UNKNOWN_SUN_TIME`].

use super::{ExtractError, RecordExtractor, first_text, text_of};
use crate::models::{CurrentWeatherRecord, Location, UNKNOWN_SUN_TIME};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

static CONTAINER: Lazy<Selector> = Lazy::new(|| Selector::parse("dl.weather_info").expect("static selector"));
static WEEK: Lazy<Selector> = Lazy::new(|| Selector::parse("dd.week").expect("static selector"));
static NOW: Lazy<Selector> = Lazy::new(|| Selector::parse("dd.weather p.now").expect("static selector"));
static CONDITION: Lazy<Selector> = Lazy::new(|| Selector::parse("dd.weather span").expect("static selector"));
static SHIDU: Lazy<Selector> = Lazy::new(|| Selector::parse("dd.shidu").expect("static selector"));
static BOLD: Lazy<Selector> = Lazy::new(|| Selector::parse("b").expect("static selector"));
static AIR: Lazy<Selector> = Lazy::new(|| Selector::parse("dd.kongqi h5").expect("static selector"));
static PM: Lazy<Selector> = Lazy::new(|| Selector::parse("dd.kongqi h6").expect("static selector"));
static SUN: Lazy<Selector> = Lazy::new(|| Selector::parse("dd.kongqi span").expect("static selector"));

static SUN_TIMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"日出[:：]\s*(?P<rise>.*?)\s*日落[:：]\s*(?P<set>.*)$").expect("static regex")
});

/// Humidity, wind direction and UV index, in that order.
const SHIDU_CELLS: usize = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentWeatherExtractor;

impl RecordExtractor for CurrentWeatherExtractor {
    type Record = CurrentWeatherRecord;

    fn extract(
        &self,
        location: &Location,
        html: &str,
    ) -> Result<Option<Vec<CurrentWeatherRecord>>, ExtractError> {
        let document = Html::parse_document(html);
        let Some(info) = document.select(&CONTAINER).next() else {
            return Ok(None);
        };

        let (humidity, wind_direction, uv_index) = match info.select(&SHIDU).next() {
            Some(shidu) => {
                let cells: Vec<String> = shidu.select(&BOLD).map(text_of).collect();
                if cells.len() < SHIDU_CELLS {
                    return Err(ExtractError::Parse(format!(
                        "dd.shidu has {} entries, expected {SHIDU_CELLS}",
                        cells.len()
                    )));
                }
                let mut cells = cells.into_iter();
                (
                    cells.next().unwrap_or_default(),
                    cells.next().unwrap_or_default(),
                    cells.next().unwrap_or_default(),
                )
            }
            None => Default::default(),
        };

        let (sunrise, sunset) = info
            .select(&SUN)
            .next()
            .map(|span| parse_sun_times(&text_of(span)))
            .unwrap_or_else(unknown_sun_times);

        Ok(Some(vec![CurrentWeatherRecord {
            location: location.name.clone(),
            date: first_text(info, &WEEK),
            temperature: first_text(info, &NOW),
            condition: first_text(info, &CONDITION),
            humidity,
            wind_direction,
            uv_index,
            air_quality: first_text(info, &AIR),
            pm_value: first_text(info, &PM),
            sunrise,
            sunset,
        }]))
    }
}

fn unknown_sun_times() -> (String, String) {
    (UNKNOWN_SUN_TIME.to_string(), UNKNOWN_SUN_TIME.to_string())
}

/// Split `"日出: 05:12日落: 19:21"` into `("05:12", "19:21")`.
///
/// Text without both markers yields the unknown sentinel for both parts;
/// an empty part yields the sentinel for that part only.
pub fn parse_sun_times(text: &str) -> (String, String) {
    let Some(caps) = SUN_TIMES.captures(text.trim()) else {
        return unknown_sun_times();
    };
    let part = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SUN_TIME)
            .to_string()
    };
    (part("rise"), part("set"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CsvRecord;

    const PAGE: &str = r#"
        <html><body>
        <dl class="weather_info">
          <dd class="week">2024年10月19日　星期六　九月十七</dd>
          <dd class="weather"><p class="now"><b>18</b><i>℃</i></p><span><b>晴</b>12 ~ 22℃</span></dd>
          <dd class="shidu"><b>湿度：45%</b><b>风向：北风 2级</b><b>紫外线：弱</b></dd>
          <dd class="kongqi"><h5>空气质量：良</h5><h6>PM: 38</h6><span>日出: 06:24日落: 17:31</span></dd>
        </dl>
        </body></html>"#;

    #[test]
    fn test_extracts_snapshot() {
        let records = CurrentWeatherExtractor
            .extract(&Location::new("北京", "beijing"), PAGE)
            .unwrap()
            .unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.location, "北京");
        assert_eq!(r.temperature, "18℃");
        assert_eq!(r.humidity, "湿度：45%");
        assert_eq!(r.wind_direction, "风向：北风 2级");
        assert_eq!(r.uv_index, "紫外线：弱");
        assert_eq!(r.air_quality, "空气质量：良");
        assert_eq!(r.pm_value, "PM: 38");
        assert_eq!(r.sunrise, "06:24");
        assert_eq!(r.sunset, "17:31");
        assert!(r.is_well_formed());
    }

    #[test]
    fn test_sun_text_without_sunset_marker_is_unknown() {
        assert_eq!(
            parse_sun_times("日出: 06:24"),
            (UNKNOWN_SUN_TIME.to_string(), UNKNOWN_SUN_TIME.to_string())
        );
        assert_eq!(
            parse_sun_times(""),
            (UNKNOWN_SUN_TIME.to_string(), UNKNOWN_SUN_TIME.to_string())
        );
    }

    #[test]
    fn test_sun_text_with_fullwidth_colons() {
        assert_eq!(
            parse_sun_times("日出：06:24 日落：17:31"),
            ("06:24".to_string(), "17:31".to_string())
        );
    }

    #[test]
    fn test_missing_sun_span_does_not_abort() {
        let html = PAGE.replace("<span>日出: 06:24日落: 17:31</span>", "");
        let records = CurrentWeatherExtractor
            .extract(&Location::new("北京", "beijing"), &html)
            .unwrap()
            .unwrap();
        assert_eq!(records[0].sunrise, UNKNOWN_SUN_TIME);
        assert_eq!(records[0].sunset, UNKNOWN_SUN_TIME);
        assert_eq!(records[0].pm_value, "PM: 38");
    }

    #[test]
    fn test_missing_container_is_none() {
        let out = CurrentWeatherExtractor
            .extract(&Location::new("北京", "beijing"), "<html></html>")
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_missing_temperature_gives_malformed_candidate() {
        let html = PAGE.replace(r#"<p class="now"><b>18</b><i>℃</i></p>"#, "");
        let records = CurrentWeatherExtractor
            .extract(&Location::new("北京", "beijing"), &html)
            .unwrap()
            .unwrap();
        assert!(records[0].temperature.is_empty());
        assert!(!records[0].is_well_formed());
    }

    #[test]
    fn test_truncated_shidu_block_is_a_parse_error() {
        let html = PAGE.replace("<b>紫外线：弱</b>", "");
        let err = CurrentWeatherExtractor
            .extract(&Location::new("北京", "beijing"), &html)
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }
}
