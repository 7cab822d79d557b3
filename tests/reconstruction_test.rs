use anyhow::Result;
use causelist_notifier::apis::SourceLayout;
use causelist_notifier::config::SourceConfig;
use causelist_notifier::constants::{ALLAHABAD_SOURCE, GAUHATI_SOURCE};
use causelist_notifier::normalize::RecordNormalizer;
use causelist_notifier::reconstruct::RowReconstructor;
use causelist_notifier::types::{LogicalRecord, RawRow};

fn rows(raw: &[&[&str]]) -> Vec<RawRow> {
    raw.iter().map(|cells| RawRow::from(cells.to_vec())).collect()
}

fn rebuild(kind: &str, input: Vec<RawRow>) -> Result<Vec<LogicalRecord>> {
    let config = SourceConfig::builtin(kind).expect("builtin source");
    let layout = SourceLayout::from_config(&config)?;
    let normalized = layout.normalize_columns(input);
    let out = RowReconstructor::new(layout.rules()).reconstruct(&normalized, |r| layout.classify_row(r));
    Ok(out.records)
}

#[test]
fn test_advocate_continuation_scenario() -> Result<()> {
    let records = rebuild(
        GAUHATI_SOURCE,
        rows(&[
            &["1", "ABC/12/2024", "X Versus Y", "Adv1", ""],
            &["", "", "", "Adv2", ""],
            &["2", "DEF/13/2024", "P vs Q", "Adv3", "Adv4"],
        ]),
    )?;

    assert_eq!(
        records,
        vec![
            LogicalRecord {
                sequence_number: "1".into(),
                case_number: Some("ABC/12/2024".into()),
                parties: "X Versus Y".into(),
                petitioner_advocates: vec!["Adv1".into(), "Adv2".into()],
                respondent_advocates: vec![],
            },
            LogicalRecord {
                sequence_number: "2".into(),
                case_number: Some("DEF/13/2024".into()),
                parties: "P vs Q".into(),
                petitioner_advocates: vec!["Adv3".into()],
                respondent_advocates: vec!["Adv4".into()],
            },
        ]
    );
    Ok(())
}

#[test]
fn test_gauhati_page_with_header_repeat_and_wrapped_parties() -> Result<()> {
    let records = rebuild(
        GAUHATI_SOURCE,
        rows(&[
            &["Sr. No.", "Case Number", "Main Parties", "Petitioner Advocate", "Respondent Advocate"],
            &["1", "WP(C)/1234/2024", "RAM KUMAR", "MR. A DAS", "SC, PWD"],
            &["", "", "THE STATE OF ASSAM AND 2 ORS", "MS. B ROY", ""],
            &["", "", "", "", ""],
            &["2", "CRL.A/9/2023", "SHYAM", "", "PP, ASSAM"],
            &["", "in IA(Crl)/2/2023", "", "", ""],
        ]),
    )?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].parties, "RAM KUMAR vs THE STATE OF ASSAM AND 2 ORS");
    assert_eq!(records[0].petitioner_advocates, vec!["MR. A DAS", "MS. B ROY"]);
    assert_eq!(records[1].case_number.as_deref(), Some("CRL.A/9/2023; in IA(Crl)/2/2023"));
    Ok(())
}

#[test]
fn test_respondents_stay_put_when_no_petitioner_advocates_listed() -> Result<()> {
    let records = rebuild(
        GAUHATI_SOURCE,
        rows(&[
            &["1", "WP(C)/1/2024", "A Versus B", "", "GA ASSAM"],
            &["2", "WP(C)/2/2024", "C Versus D", "", "SC PWD"],
        ]),
    )?;

    assert_eq!(records.len(), 2);
    assert!(records[0].petitioner_advocates.is_empty());
    assert_eq!(records[0].respondent_advocates, vec!["GA ASSAM"]);
    assert!(records[1].petitioner_advocates.is_empty());
    assert_eq!(records[1].respondent_advocates, vec!["SC PWD"]);
    Ok(())
}

#[test]
fn test_annotation_under_case_number_keeps_lookup_key() -> Result<()> {
    let config = SourceConfig::builtin(GAUHATI_SOURCE).expect("builtin source");
    let layout = SourceLayout::from_config(&config)?;
    let normalizer = RecordNormalizer::new(layout.case_pattern().clone(), layout.rules().list_separator());

    let records = rebuild(
        GAUHATI_SOURCE,
        rows(&[
            &["1", "WP(C)/1234/2024", "RAM KUMAR", "MR A DAS", ""],
            &["", "[Defective]", "", "", ""],
        ]),
    )?;
    let normalized = normalizer.normalize_all(records);

    assert_eq!(
        normalized[0].record.case_number.as_deref(),
        Some("WP(C)/1234/2024 [Defective]")
    );
    assert_eq!(normalized[0].lookup_key(), Some("WP(C)/1234/2024"));
    Ok(())
}

#[test]
fn test_allahabad_ragged_rows_fold_onto_schema() -> Result<()> {
    // An always-empty column, and a court-number column ahead of the case column.
    let records = rebuild(
        ALLAHABAD_SOURCE,
        rows(&[
            &["1", "", "C-12", "WRIC/101/2024", "RAM", "Adv P", "Adv R"],
            &["", "", "", "", "THE STATE OF U.P.", "", "Adv R2"],
            &["2", "", "", "WRIA/7/2023", "SHYAM", "Adv Q"],
        ]),
    )?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].case_number.as_deref(), Some("C-12 WRIC/101/2024"));
    assert_eq!(records[0].parties, "RAM vs THE STATE OF U.P.");
    assert_eq!(records[0].petitioner_advocates, vec!["Adv P"]);
    assert_eq!(records[0].respondent_advocates, vec!["Adv R", "Adv R2"]);
    assert_eq!(records[1].case_number.as_deref(), Some("WRIA/7/2023"));
    assert_eq!(records[1].parties, "SHYAM");
    Ok(())
}

#[test]
fn test_normalized_lookup_keys() -> Result<()> {
    let config = SourceConfig::builtin(GAUHATI_SOURCE).expect("builtin source");
    let layout = SourceLayout::from_config(&config)?;
    let normalizer = RecordNormalizer::new(layout.case_pattern().clone(), layout.rules().list_separator());

    let records = rebuild(
        GAUHATI_SOURCE,
        rows(&[
            &["1", "WP(C)/1234/2024", "A vs B", "", ""],
            &["2", "", "NO CASE", "", ""],
            &["3", "BAD CASE", "C vs D", "", ""],
        ]),
    )?;
    let normalized = normalizer.normalize_all(records);

    assert_eq!(normalized[0].lookup_key(), Some("WP(C)/1234/2024"));
    assert!(normalized[1].is_unmatched());
    assert!(normalized[2].is_unmatched());
    Ok(())
}
