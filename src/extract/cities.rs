//! City index adapter used to bootstrap the catalog.
//!
//! The index page lists cities as `ul.table_list > li > a`. The endpoint id
//! is the first path segment of the link, resolved against the index URL so
//! relative (`beijing/index.html`) and absolute links give the same id.

use super::{ExtractError, RecordExtractor, text_of};
use crate::models::Location;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static LIST: Lazy<Selector> = Lazy::new(|| Selector::parse("ul.table_list").expect("static selector"));
static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("static selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

#[derive(Debug, Clone)]
pub struct CityIndexExtractor {
    base: Url,
}

impl CityIndexExtractor {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn endpoint_id(&self, href: &str) -> String {
        self.base
            .join(href.trim())
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next().map(str::to_string))
            })
            .unwrap_or_default()
    }
}

impl RecordExtractor for CityIndexExtractor {
    type Record = Location;

    /// `location` is the index page itself and is not used.
    fn extract(&self, _location: &Location, html: &str) -> Result<Option<Vec<Location>>, ExtractError> {
        let document = Html::parse_document(html);
        let lists: Vec<_> = document.select(&LIST).collect();
        if lists.is_empty() {
            return Ok(None);
        }

        let cities = lists
            .into_iter()
            .flat_map(|ul| ul.select(&ITEM))
            .filter_map(|li| {
                let link = li.select(&LINK).next()?;
                let href = link.value().attr("href")?;
                Some(Location::new(text_of(li), self.endpoint_id(href)))
            })
            .collect();

        Ok(Some(cities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> CityIndexExtractor {
        CityIndexExtractor::new(Url::parse("https://lishi.tianqi.com/").unwrap())
    }

    #[test]
    fn test_extracts_names_and_first_segment() {
        let html = r#"
            <ul class="table_list">
              <li><a href="beijing/index.html">北京</a></li>
              <li><a href="https://lishi.tianqi.com/shanghai/index.html">上海</a></li>
              <li>无链接</li>
            </ul>
            <ul class="table_list"><li><a href="/tianjin/">天津</a></li></ul>"#;
        let cities = extractor()
            .extract(&Location::new("index", ""), html)
            .unwrap()
            .unwrap();
        assert_eq!(
            cities,
            vec![
                Location::new("北京", "beijing"),
                Location::new("上海", "shanghai"),
                Location::new("天津", "tianjin"),
            ]
        );
    }

    #[test]
    fn test_page_without_lists_is_none() {
        let out = extractor()
            .extract(&Location::new("index", ""), "<html><body></body></html>")
            .unwrap();
        assert!(out.is_none());
    }
}
