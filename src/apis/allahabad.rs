use super::{accept_newer, fetch_bytes, fetch_text, resolve_link, SourceLayout};
use crate::config::{FormConfig, SourceConfig};
use crate::error::{CauseListError, Result};
use crate::reconstruct::rules::RuleTable;
use crate::reconstruct::RowKind;
use crate::types::{CourtSource, DocumentListing, RawRow};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

static OPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("select option").expect("valid selector"));
static RESULT_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul li a[href]").expect("valid selector"));

/// Cause lists selected by date through a form; the listing page offers the dates.
pub struct AllahabadCourt {
    client: reqwest::Client,
    id: String,
    name: String,
    listing_url: String,
    date_format: String,
    form: FormConfig,
    layout: SourceLayout,
}

impl AllahabadCourt {
    pub fn new(config: &SourceConfig, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            id: config.id.clone(),
            name: config.name.clone(),
            listing_url: config.listing_url.clone(),
            date_format: config.date_format.clone(),
            form: config.form.clone(),
            layout: SourceLayout::from_config(config)?,
        })
    }

    /// Dates offered by the selection form, in page order (newest first).
    /// The reference is the option text the form expects back.
    pub fn parse_date_options(&self, html: &str) -> Result<Vec<DocumentListing>> {
        let document = Html::parse_document(html);
        let listings: Vec<DocumentListing> = document
            .select(&OPTION_SELECTOR)
            .filter_map(|option| {
                let text = option.text().collect::<String>().trim().to_string();
                match NaiveDate::parse_from_str(&text, &self.date_format) {
                    Ok(date) => Some(DocumentListing { date, reference: text }),
                    Err(_) => {
                        debug!("Ignoring non-date option '{}'", text);
                        None
                    }
                }
            })
            .collect();

        if listings.is_empty() {
            return Err(CauseListError::navigation(&self.id, "no cause list dates offered"));
        }
        Ok(listings)
    }

    /// First document link on the form's result page.
    pub fn parse_result_link(&self, html: &str) -> Result<String> {
        let document = Html::parse_document(html);
        let href = document
            .select(&RESULT_LINK_SELECTOR)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| CauseListError::navigation(&self.id, "result page has no document link"))?;
        resolve_link(&self.id, &self.form.url, href)
    }

    fn form_fields<'a>(&'a self, date_text: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut fields = vec![(self.form.date_field.as_str(), date_text)];
        fields.extend(
            self.form
                .extra_fields
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        fields
    }
}

#[async_trait::async_trait]
impl CourtSource for AllahabadCourt {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(source_id = %self.id))]
    async fn list_documents(&self, watermark: NaiveDate) -> Result<Vec<DocumentListing>> {
        let html = fetch_text(&self.client, &self.id, &self.listing_url).await?;
        let listings = self.parse_date_options(&html)?;
        let accepted = accept_newer(listings, watermark);
        info!("{} new cause list(s) since {}", accepted.len(), watermark);
        Ok(accepted)
    }

    async fn download(&self, listing: &DocumentListing) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.form.url)
            .form(&self.form_fields(&listing.reference))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CauseListError::navigation(&self.id, e))?;
        let html = response
            .text()
            .await
            .map_err(|e| CauseListError::navigation(&self.id, e))?;

        let document_url = self.parse_result_link(&html)?;
        debug!("Cause list for {} at {}", listing.reference, document_url);
        fetch_bytes(&self.client, &self.id, &document_url).await
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
    use crate::constants::ALLAHABAD_SOURCE;

    fn court() -> AllahabadCourt {
        let config = SourceConfig::builtin(ALLAHABAD_SOURCE).unwrap();
        AllahabadCourt::new(&config, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn test_parse_date_options() {
        let html = r#"<form><div><select name="causelistdate">
            <option value="">-- Select --</option>
            <option value="17-10-2026">17-10-2026</option>
            <option value="16-10-2026"> 16-10-2026 </option>
        </select></div></form>"#;
        let listings = court().parse_date_options(html).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].date, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert_eq!(listings[1].reference, "16-10-2026");
    }

    #[test]
    fn test_parse_result_link_resolves_against_form_url() {
        let html = r#"<div><ul><li><a href="pdfs/cl_17102026.pdf">Court-wise list</a></li>
            <li><a href="other.pdf">Other</a></li></ul></div>"#;
        let url = court().parse_result_link(html).unwrap();
        assert_eq!(url, "https://www.allahabadhighcourt.in/causelist/pdfs/cl_17102026.pdf");
    }

    #[test]
    fn test_form_fields_include_date_and_extras() {
        let court = court();
        let fields = court.form_fields("17-10-2026");
        assert_eq!(fields[0], ("causelistdate", "17-10-2026"));
        assert!(fields.contains(&("listtype", "C")));
    }

    #[test]
    fn test_missing_result_link_is_navigation_failure() {
        assert!(matches!(
            court().parse_result_link("<p>No list</p>").unwrap_err(),
            CauseListError::Navigation { .. }
        ));
    }
}
