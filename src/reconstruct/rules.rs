//! Per-source continuation rule table.
//!
//! The textual markers that steer continuation merges are tuned to specific
//! document layouts, so they live in configuration and are compiled once per
//! source into a [`RuleTable`].

use crate::config::RulesConfig;
use crate::error::Result;
use crate::types::RawRow;
use regex::Regex;

/// Compiled party-join markers ("Versus", "vs", "V." by default).
#[derive(Debug, Clone)]
struct MarkerSet {
    anywhere: Regex,
    at_start: Regex,
    at_end: Regex,
}

impl MarkerSet {
    fn compile(markers: &[String]) -> Result<Option<Self>> {
        let alternation = markers
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            anywhere: Regex::new(&format!(r"(?i)(?:^|[\s(])(?:{alternation})(?:$|[\s.,)])"))?,
            at_start: Regex::new(&format!(r"(?i)^(?:{alternation})(?:$|[\s.,)])"))?,
            at_end: Regex::new(&format!(r"(?i)(?:^|[\s(])(?:{alternation})$"))?,
        }))
    }
}

/// What a non-empty case-column fragment on a continuation row means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFragment {
    /// "WITH ..." grouping annotation; carries no field content.
    GroupAnnotation,
    /// "in ..." reference to another case; appended to the case number.
    Reference,
    /// Any other text, usually a case number wrapped across lines.
    Wrapped,
}

#[derive(Debug, Clone)]
pub struct RuleTable {
    markers: Option<MarkerSet>,
    join_keywords: Vec<String>,
    party_separator: String,
    with_group_marker: String,
    in_reference_marker: String,
    list_separator: String,
    boilerplate: Vec<Regex>,
}

impl RuleTable {
    pub fn from_config(config: &RulesConfig) -> Result<Self> {
        let boilerplate = config
            .boilerplate
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            markers: MarkerSet::compile(&config.join_markers)?,
            join_keywords: config
                .join_keywords
                .iter()
                .filter(|k| !k.is_empty())
                .cloned()
                .collect(),
            party_separator: config.party_separator.clone(),
            with_group_marker: config.with_group_marker.clone(),
            in_reference_marker: config.in_reference_marker.clone(),
            list_separator: config.list_separator.clone(),
            boilerplate,
        })
    }

    pub fn list_separator(&self) -> &str {
        &self.list_separator
    }

    pub fn contains_join_marker(&self, text: &str) -> bool {
        self.markers
            .as_ref()
            .is_some_and(|m| m.anywhere.is_match(text.trim()))
    }

    fn starts_with_join_marker(&self, text: &str) -> bool {
        self.markers
            .as_ref()
            .is_some_and(|m| m.at_start.is_match(text.trim()))
    }

    fn ends_with_join_marker(&self, text: &str) -> bool {
        self.markers
            .as_ref()
            .is_some_and(|m| m.at_end.is_match(text.trim()))
    }

    fn has_join_keyword(&self, text: &str) -> bool {
        self.join_keywords.iter().any(|k| text.contains(k.as_str()))
    }

    /// Merge a continuation fragment into the open record's party text.
    ///
    /// A join marker on either side (or a keyword such as "THE " on the new
    /// fragment) means the fragment names the opposing side, so the configured
    /// separator is inserted unless the marker already sits at the seam.
    pub fn join_parties(&self, existing: &str, fragment: &str) -> String {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return existing.to_string();
        }
        if existing.is_empty() {
            return fragment.to_string();
        }

        let seam_spelled_out =
            self.ends_with_join_marker(existing) || self.starts_with_join_marker(fragment);
        let is_join = self.contains_join_marker(fragment)
            || self.has_join_keyword(fragment)
            || self.contains_join_marker(existing);

        if is_join && !seam_spelled_out {
            format!("{existing}{}{fragment}", self.party_separator)
        } else {
            format!("{existing} {fragment}")
        }
    }

    pub fn classify_case_fragment(&self, fragment: &str) -> CaseFragment {
        if !self.with_group_marker.is_empty() && fragment.contains(&self.with_group_marker) {
            CaseFragment::GroupAnnotation
        } else if !self.in_reference_marker.is_empty()
            && fragment.contains(&self.in_reference_marker)
        {
            CaseFragment::Reference
        } else {
            CaseFragment::Wrapped
        }
    }

    /// Append a case-column fragment to the open record's case number.
    pub fn join_case(&self, existing: Option<&str>, fragment: &str, kind: CaseFragment) -> String {
        let fragment = fragment.trim();
        match existing.filter(|e| !e.is_empty()) {
            None => fragment.to_string(),
            Some(existing) => match kind {
                CaseFragment::Reference => {
                    format!("{existing}{}{fragment}", self.list_separator)
                }
                _ if existing.ends_with('/') || fragment.starts_with('/') => {
                    format!("{existing}{fragment}")
                }
                _ => format!("{existing} {fragment}"),
            },
        }
    }

    /// Header/footer repeats and page banners, matched on the row's joined text.
    pub fn is_boilerplate(&self, row: &RawRow) -> bool {
        if self.boilerplate.is_empty() {
            return false;
        }
        let text = row.joined_text();
        !text.is_empty() && self.boilerplate.iter().any(|re| re.is_match(&text))
    }
}
