use super::{accept_newer, fetch_bytes, fetch_text, resolve_link, SourceLayout};
use crate::config::SourceConfig;
use crate::error::{CauseListError, Result};
use crate::reconstruct::rules::RuleTable;
use crate::reconstruct::RowKind;
use crate::types::{CourtSource, DocumentListing, RawRow};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table tr").expect("valid selector"));
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Consolidated cause lists published as a dated HTML table of PDF links.
pub struct GauhatiCourt {
    client: reqwest::Client,
    id: String,
    name: String,
    listing_url: String,
    date_format: String,
    layout: SourceLayout,
}

impl GauhatiCourt {
    pub fn new(config: &SourceConfig, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            id: config.id.clone(),
            name: config.name.clone(),
            listing_url: config.listing_url.clone(),
            date_format: config.date_format.clone(),
            layout: SourceLayout::from_config(config)?,
        })
    }

    /// All listings on the page, in page order (newest first).
    pub fn parse_listing(&self, html: &str) -> Result<Vec<DocumentListing>> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for row in document.select(&ROW_SELECTOR) {
            // header rows use <th>
            let Some(cell) = row.select(&CELL_SELECTOR).next() else {
                continue;
            };
            let text: String = cell.text().collect::<String>();
            let date_text: String = text.trim().chars().take(10).collect();
            let date = match NaiveDate::parse_from_str(&date_text, &self.date_format) {
                Ok(date) => date,
                Err(e) => {
                    debug!("Skipping listing row '{}': {}", text.trim(), e);
                    continue;
                }
            };
            let Some(href) = cell.select(&LINK_SELECTOR).next().and_then(|a| a.value().attr("href")) else {
                warn!("Listing for {} has no document link", date_text);
                continue;
            };
            listings.push(DocumentListing {
                date,
                reference: resolve_link(&self.id, &self.listing_url, href)?,
            });
        }

        if listings.is_empty() {
            return Err(CauseListError::navigation(&self.id, "no dated listings found on listing page"));
        }
        Ok(listings)
    }
}

#[async_trait::async_trait]
impl CourtSource for GauhatiCourt {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source_id = %self.id))]
    async fn list_documents(&self, watermark: NaiveDate) -> Result<Vec<DocumentListing>> {
        let html = fetch_text(&self.client, &self.id, &self.listing_url).await?;
        let listings = self.parse_listing(&html)?;
        let accepted = accept_newer(listings, watermark);
        info!("{} new cause list(s) since {}", accepted.len(), watermark);
        Ok(accepted)
    }

    async fn download(&self, listing: &DocumentListing) -> Result<Vec<u8>> {
        fetch_bytes(&self.client, &self.id, &listing.reference).await
    }

    fn normalize_columns(&self, rows: Vec<RawRow>) -> Vec<RawRow> {
        self.layout.normalize_columns(rows)
    }

    fn classify_row(&self, row: &RawRow) -> RowKind {
        self.layout.classify_row(row)
    }

    fn rules(&self) -> &RuleTable {
        self.layout.rules()
    }

    fn case_pattern(&self) -> &Regex {
        self.layout.case_pattern()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GAUHATI_SOURCE;

    const LISTING: &str = r#"
        <html><body><main><article><table><tbody>
          <tr><th>Date</th><th>Remarks</th></tr>
          <tr><td><a href="/pdf/causelist_16_10_2026.pdf">16/10/2026 (Thursday)</a></td><td></td></tr>
          <tr><td>15/10/2026 <a href="https://ghconline.gov.in/pdf/15.pdf">Download</a></td><td></td></tr>
          <tr><td>Holiday notice</td><td></td></tr>
          <tr><td><a href="/pdf/causelist_14_10_2026.pdf">14/10/2026</a></td><td></td></tr>
        </tbody></table></article></main></body></html>
    "#;

    fn court() -> GauhatiCourt {
        let config = SourceConfig::builtin(GAUHATI_SOURCE).unwrap();
        GauhatiCourt::new(&config, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn test_parse_listing_rows() {
        let listings = court().parse_listing(LISTING).unwrap();
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].date, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(
            listings[0].reference,
            "https://ghconline.gov.in/pdf/causelist_16_10_2026.pdf"
        );
        assert_eq!(listings[1].reference, "https://ghconline.gov.in/pdf/15.pdf");
    }

    #[test]
    fn test_watermark_cut_off() {
        let listings = court().parse_listing(LISTING).unwrap();
        let accepted = accept_newer(listings, NaiveDate::from_ymd_opt(2026, 10, 14).unwrap());
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn test_page_without_listings_is_navigation_failure() {
        let err = court().parse_listing("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, CauseListError::Navigation { .. }));
    }
}
