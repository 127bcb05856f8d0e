use log::{debug, info, warn};

use serde::Serialize;
use snafu::{prelude::*, Snafu};
use voting_rules::*;

use std::collections::BTreeMap;
use std::fs;

use serde_json::Value as JSValue;
use text_diff::print_diff;

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening ballot file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading ballot file at line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Invalid preference table"))]
    InvalidTable { source: ElectionError },
    #[snafu(display("Error opening the reference summary file"))]
    OpeningJson { source: std::io::Error },
    #[snafu(display("Error writing the summary file"))]
    WritingJson { source: std::io::Error },
    #[snafu(display("Error processing the JSON summary"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;

// **** JSON summary structures ****

#[derive(Debug, Clone, Serialize)]
struct BallotLine {
    ballot: String,
    count: String,
}

#[derive(Debug, Clone, Serialize)]
struct TallySummary {
    winner: String,
    tally: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunoffSummary {
    winner: String,
    first_round: BTreeMap<String, String>,
    second_round: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CondorcetSummary {
    winner: Option<String>,
    pairwise_wins: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
struct BordaSummary {
    winner: String,
    points: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeSummary {
    plurality: TallySummary,
    plurality_runoff: RunoffSummary,
    condorcet: CondorcetSummary,
    borda_count: BordaSummary,
}

/// The JSON record written for one dataset in the summary file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    dataset: String,
    num_voters: usize,
    num_candidates: usize,
    ballot_summary: Vec<BallotLine>,
    conditions_met: bool,
    outcomes: Option<OutcomeSummary>,
}

#[derive(Debug, Serialize)]
struct SummaryFile<'a> {
    datasets: &'a [DatasetSummary],
}

fn parse_rows<R: std::io::Read>(reader: csv::Reader<R>) -> TallyResult<Vec<Vec<String>>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, record) in reader.into_records().enumerate() {
        let lineno = idx + 1;
        let record = record.context(CsvLineParseSnafu { lineno })?;
        debug!("parse_rows: lineno: {:?} record: {:?}", lineno, record);
        let row: Vec<String> = record
            .iter()
            .map(|field| field.trim().to_string())
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Reads one CSV ballot file into a preference table.
///
/// The size limits on the table are checked at construction and abort
/// the dataset before any rule runs.
pub fn read_preferences(path: &str) -> TallyResult<PreferenceTable> {
    info!("Attempting to read ballot file {:?}", path);
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let rows = parse_rows(reader)?;
    PreferenceTable::new(&rows).context(InvalidTableSnafu {})
}

fn print_report(path: &str, report: &ElectionReport) {
    println!("Dataset: {}", path);
    println!("Ballot Summary:");
    println!(
        "Number of voters: {}, Number of candidates: {}",
        report.num_voters, report.num_candidates
    );
    for (signature, count) in report.summary.iter() {
        println!("{} : {} votes", signature, count);
    }
    println!();

    match report.outcomes {
        Some(ref outcomes) => {
            println!("Conditions met. Running elections...");
            println!("Winner of Plurality: {}", outcomes.plurality.winner);
            println!(
                "Winner of Plurality with Runoff: {}",
                outcomes.runoff.winner
            );
            match outcomes.condorcet.winner {
                Some(ref winner) => println!("Winner of Condorcet: {}", winner),
                None => println!("Winner of Condorcet: none"),
            }
            println!("Winner of Borda Count: {}", outcomes.borda.winner);
        }
        None => {
            println!("Conditions not met. Aborting elections.");
        }
    }
    println!();
}

fn tally_map(entries: &[(String, u64)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(name, count)| (name.clone(), count.to_string()))
        .collect()
}

fn summarize_report(path: &str, report: &ElectionReport) -> DatasetSummary {
    let ballot_summary: Vec<BallotLine> = report
        .summary
        .iter()
        .map(|(signature, count)| BallotLine {
            ballot: signature.clone(),
            count: count.to_string(),
        })
        .collect();

    let outcomes = report.outcomes.as_ref().map(|outcomes| OutcomeSummary {
        plurality: TallySummary {
            winner: outcomes.plurality.winner.clone(),
            tally: tally_map(&outcomes.plurality.tally),
        },
        plurality_runoff: RunoffSummary {
            winner: outcomes.runoff.winner.clone(),
            first_round: tally_map(&outcomes.runoff.first_round),
            second_round: outcomes.runoff.second_round.as_deref().map(tally_map),
        },
        condorcet: CondorcetSummary {
            winner: outcomes.condorcet.winner.clone(),
            pairwise_wins: tally_map(&outcomes.condorcet.pairwise_wins),
        },
        borda_count: BordaSummary {
            winner: outcomes.borda.winner.clone(),
            points: tally_map(&outcomes.borda.tally),
        },
    });

    DatasetSummary {
        dataset: path.to_string(),
        num_voters: report.num_voters,
        num_candidates: report.num_candidates,
        ballot_summary,
        conditions_met: report.conditions_met,
        outcomes,
    }
}

/// Runs one dataset end to end: load, tabulate, print the report.
///
/// Returns the record describing the dataset for the summary output.
pub fn run_dataset(path: &str) -> TallyResult<DatasetSummary> {
    let table = read_preferences(path)?;
    let report = run_election(&table);
    print_report(path, &report);
    Ok(summarize_report(path, &report))
}

fn read_summary(path: &str) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Writes the aggregated JSON summary and checks it against the
/// reference file when one is provided.
pub fn write_summary(
    reports: &[DatasetSummary],
    out: Option<&str>,
    reference: Option<&str>,
) -> TallyResult<()> {
    if out.is_none() && reference.is_none() {
        return Ok(());
    }

    // Going through Value keeps the key order in line with the parsed
    // reference summary.
    let result_js =
        serde_json::to_value(SummaryFile { datasets: reports }).context(ParsingJsonSnafu {})?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match out {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => fs::write(path, &pretty_js_stats).context(WritingJsonSnafu {})?,
        None => {}
    }

    if let Some(reference_path) = reference {
        let summary_ref = read_summary(reference_path)?;
        info!("reference summary: {:?}", summary_ref);
        let pretty_js_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(pretty_js_ref.as_str(), pretty_js_stats.as_ref(), "\n");
            whatever!("Difference detected between calculated summary and reference summary");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(data.as_bytes())
    }

    fn rows_of(data: &str) -> Vec<Vec<String>> {
        parse_rows(reader(data)).unwrap()
    }

    fn dataset_summary(name: &str, data: &str) -> DatasetSummary {
        let table = PreferenceTable::new(&rows_of(data)).unwrap();
        summarize_report(name, &run_election(&table))
    }

    #[test]
    fn parse_rows_trims_fields() {
        let rows = rows_of("A, B ,C\nB,C,A\n");
        assert_eq!(
            rows,
            vec![
                vec!["A".to_string(), "B".to_string(), "C".to_string()],
                vec!["B".to_string(), "C".to_string(), "A".to_string()],
            ]
        );
    }

    #[test]
    fn read_preferences_fails_on_missing_file() {
        let res = read_preferences("/nonexistent/ballots.csv");
        assert!(matches!(res, Err(TallyError::CsvOpen { .. })));
    }

    #[test]
    fn parsed_rows_build_a_table() {
        let rows = rows_of("A,B,C\nA,C,B\nB,C,A\nC,B,A\nB,A,C\n");
        let table = PreferenceTable::new(&rows).unwrap();
        assert_eq!(table.num_voters(), 5);
        assert_eq!(table.num_candidates(), 3);
        let report = run_election(&table);
        assert!(report.conditions_met);
    }

    #[test]
    fn report_json_has_winners_when_conditions_hold() {
        let summary = dataset_summary("ballots.csv", "A,B,C\nA,C,B\nB,C,A\nC,B,A\nB,A,C\n");
        let js = serde_json::to_value(&summary).unwrap();
        assert_eq!(js["dataset"], json!("ballots.csv"));
        assert_eq!(js["numVoters"], json!(5));
        assert_eq!(js["conditionsMet"], json!(true));
        assert_eq!(js["outcomes"]["plurality"]["winner"], json!("A"));
        assert_eq!(js["outcomes"]["pluralityRunoff"]["winner"], json!("B"));
        assert_eq!(js["outcomes"]["bordaCount"]["winner"], json!("B"));
        assert_eq!(js["outcomes"]["plurality"]["tally"]["A"], json!("2"));
    }

    #[test]
    fn report_json_omits_winners_when_conditions_fail() {
        // 6 of 10 voters rank A first.
        let data = "A,B\n".repeat(6) + &"B,A\n".repeat(4);
        let summary = dataset_summary("skewed.csv", &data);
        let js = serde_json::to_value(&summary).unwrap();
        assert_eq!(js["conditionsMet"], json!(false));
        assert_eq!(js["outcomes"], JSValue::Null);
    }

    #[test]
    fn write_summary_is_noop_without_out_or_reference() {
        let reports = vec![dataset_summary("a.csv", "A,B\nB,A\n")];
        write_summary(&reports, None, None).unwrap();
    }

    #[test]
    fn summary_matches_its_own_reference() {
        let reports = vec![dataset_summary("a.csv", "A,B\nB,A\n")];
        let path = std::env::temp_dir().join("multivote_summary_roundtrip.json");
        let path_str = path.to_str().unwrap().to_string();
        write_summary(&reports, Some(&path_str), None).unwrap();
        write_summary(&reports, None, Some(&path_str)).unwrap();
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn summary_mismatch_is_an_error() {
        let reports = vec![dataset_summary("a.csv", "A,B\nB,A\n")];
        let path = std::env::temp_dir().join("multivote_summary_mismatch.json");
        std::fs::write(&path, "{\"datasets\": []}").unwrap();
        let path_str = path.to_str().unwrap().to_string();
        let res = write_summary(&reports, None, Some(&path_str));
        assert!(matches!(res, Err(TallyError::Whatever { .. })));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn summary_errors_carry_a_message() {
        let res = read_summary("/nonexistent/summary.json");
        match res {
            Err(e @ TallyError::OpeningJson { .. }) => {
                assert!(e.to_string().contains("reference summary"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
