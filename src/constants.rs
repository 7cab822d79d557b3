/// Source id constants shared by config, CLI, and the adapter factory.

// Built-in jurisdictions (the `kind` values accepted in config.toml)
pub const GAUHATI_SOURCE: &str = "gauhati";
pub const ALLAHABAD_SOURCE: &str = "allahabad";

pub const GAUHATI_DISPLAY_NAME: &str = "Gauhati High Court";
pub const ALLAHABAD_DISPLAY_NAME: &str = "Allahabad High Court";

pub const GAUHATI_LISTING_URL: &str = "https://ghconline.gov.in/index.php/consolidated-cause-list/";
pub const ALLAHABAD_LISTING_URL: &str = "https://www.allahabadhighcourt.in/causelist/indexA.html";
pub const ALLAHABAD_FORM_URL: &str = "https://www.allahabadhighcourt.in/causelist/causelistA.jsp";

pub const GAUHATI_DATE_FORMAT: &str = "%d/%m/%Y";
pub const ALLAHABAD_DATE_FORMAT: &str = "%d-%m-%Y";

pub const GAUHATI_CASE_PATTERN: &str = r"^[A-Za-z0-9().\-]+/\d+/\d{4}$";
pub const ALLAHABAD_CASE_PATTERN: &str = r"[A-Z0-9]+/\d+/\d{4}";

/// Column headers of the cleaned intermediate table.
pub const CLEANED_TABLE_HEADER: [&str; 5] = [
    "Sr.No.",
    "Case Number",
    "Main Parties",
    "Petitioner Advocate",
    "Respondent Advocate",
];

/// Number of columns in the cleaned schema.
pub const SCHEMA_WIDTH: usize = CLEANED_TABLE_HEADER.len();

// Column positions in the cleaned schema
pub const COL_SEQUENCE: usize = 0;
pub const COL_CASE: usize = 1;
pub const COL_PARTIES: usize = 2;
pub const COL_PETITIONER: usize = 3;
pub const COL_RESPONDENT: usize = 4;

/// Intra-field separator for advocate lists in the cleaned table.
pub const ADVOCATE_FIELD_SEPARATOR: &str = "; ";

pub const DEFAULT_CHUNK_SIZE: u32 = 50;
/// Page 1 of every cause list is a cover page.
pub const DEFAULT_FIRST_PAGE: u32 = 2;

pub const DEFAULT_SUBJECT: &str = "Case Notification";
pub const MESSAGE_WRAP_WIDTH: usize = 80;

/// Get all built-in source kinds
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![GAUHATI_SOURCE, ALLAHABAD_SOURCE]
}
