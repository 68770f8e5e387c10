use log::{debug, info, warn};

use award_tally::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::tally::config_reader::*;
use crate::tally::summary::*;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_json;
pub mod summary;

// All the possible choices that can be made on a final ballot
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
enum BallotChoice {
    Candidate(String),
    Excluded(String),
    UndeclaredWriteIn(String),
    Blank,
}

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a number or a column name"))]
    ParsingJsonNumber {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading a CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no usable worksheet"))]
    EmptyExcel {},
    #[snafu(display("Line {lineno}: cannot read the cell content {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Line {lineno}: invalid ballot count {content}"))]
    InvalidCount { lineno: usize, content: String },
    #[snafu(display("Ballot {id}: the count {count} is above {}", MAX_BALLOT_COUNT))]
    BallotCountTooLarge { id: String, count: u64 },
    #[snafu(display("The instantRunoff method requires a list of candidates"))]
    MissingCandidates {},
    #[snafu(display("The ephFinalists method requires a finalist count"))]
    MissingFinalistCount {},
    #[snafu(display("Unknown ballot provider {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Tabulation failed"))]
    Tabulation { source: TabulationError },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;

/// The largest number of identical ballots a single row may stand for.
pub const MAX_BALLOT_COUNT: u64 = 1_000_000;

/// A ballot, as parsed by the readers
/// This is before checking the choices against the candidates.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub count: Option<u64>,
    pub choices: Vec<String>,
}

fn read_ballot_source(root_path: &Path, cfs: &FileSource) -> TallyResult<Vec<ParsedBallot>> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read ballot file {:?}", p2);
    let parsed_ballots = match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_ballots(p2, cfs)?,
        "excel" => io_excel::read_excel_ballots(p2, cfs)?,
        "json" => io_json::read_json_ballots(p2)?,
        x => {
            return UnknownProviderSnafu {
                provider: x.to_string(),
            }
            .fail()
        }
    };
    info!("Read {} ballot lines", parsed_ballots.len());
    Ok(parsed_ballots)
}

/// The number of identical ballots held by a parsed line. Defaults to 1.
fn ballot_count(pb: &ParsedBallot) -> TallyResult<u64> {
    let count = pb.count.unwrap_or(1);
    ensure!(
        count <= MAX_BALLOT_COUNT,
        BallotCountTooLargeSnafu {
            id: pb.id.clone().unwrap_or_default(),
            count,
        }
    );
    Ok(count)
}

fn classify_choice(s: &str, valid: &HashSet<&str>, excluded: &HashSet<&str>) -> BallotChoice {
    match s.trim() {
        "" => BallotChoice::Blank,
        c if valid.contains(c) => BallotChoice::Candidate(c.to_string()),
        c if excluded.contains(c) => BallotChoice::Excluded(c.to_string()),
        c => BallotChoice::UndeclaredWriteIn(c.to_string()),
    }
}

/// Turns the parsed lines into final ballots.
///
/// Blank choices and excluded candidates are skipped, names that are not
/// candidates are dropped with a warning and repeated names only keep their
/// first rank. The runoff candidate is kept even when it is not listed.
fn validate_final_ballots(
    parsed_ballots: &[ParsedBallot],
    candidates: &[ConfigCandidate],
    runoff_candidate: Option<&str>,
) -> TallyResult<Vec<Ballot>> {
    let valid: HashSet<&str> = candidates
        .iter()
        .filter(|c| !c.excluded.unwrap_or(false))
        .map(|c| c.name.as_str())
        .chain(runoff_candidate)
        .collect();
    let excluded: HashSet<&str> = candidates
        .iter()
        .filter(|c| c.excluded.unwrap_or(false))
        .map(|c| c.name.as_str())
        .collect();

    let mut res: Vec<Ballot> = Vec::new();
    for pb in parsed_ballots.iter() {
        let choices: Vec<BallotChoice> = pb
            .choices
            .iter()
            .map(|s| classify_choice(s, &valid, &excluded))
            .collect();
        debug!("Choices for ballot {:?}: {:?}", pb.id, choices);

        let mut ranking: Vec<Candidate> = Vec::new();
        for choice in choices.into_iter() {
            match choice {
                BallotChoice::Candidate(name) => {
                    let c = Candidate::new(name);
                    if !ranking.contains(&c) {
                        ranking.push(c);
                    }
                }
                BallotChoice::UndeclaredWriteIn(name) => {
                    warn!(
                        "validate_final_ballots: ballot {:?}: skipping unknown candidate {:?}",
                        pb.id, name
                    );
                }
                BallotChoice::Excluded(_) | BallotChoice::Blank => {}
            }
        }

        let count = ballot_count(pb)?;
        if count == 0 || ranking.is_empty() {
            debug!("validate_final_ballots: dropping ballot {:?}", pb.id);
            continue;
        }
        for _ in 0..count {
            res.push(Ballot::new(ranking.clone()));
        }
    }
    Ok(res)
}

/// Turns the parsed lines into nomination ballots. Repeated works only count
/// once and the ballots without any work are dropped.
fn validate_nomination_ballots(
    parsed_ballots: &[ParsedBallot],
) -> TallyResult<Vec<NominationBallot>> {
    let mut res: Vec<NominationBallot> = Vec::new();
    for pb in parsed_ballots.iter() {
        let ballot: NominationBallot = pb
            .choices
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(WorkId::from)
            .collect();
        if ballot.len() < pb.choices.iter().filter(|s| !s.trim().is_empty()).count() {
            debug!(
                "validate_nomination_ballots: ballot {:?} repeats a work",
                pb.id
            );
        }
        let count = ballot_count(pb)?;
        if count == 0 || ballot.is_empty() {
            debug!("validate_nomination_ballots: dropping ballot {:?}", pb.id);
            continue;
        }
        for _ in 0..count {
            res.push(ballot.clone());
        }
    }
    Ok(res)
}

fn run_final_ballot(config: &TallyConfig, data: &[ParsedBallot]) -> TallyResult<JSValue> {
    let config_candidates = config
        .candidates
        .as_deref()
        .context(MissingCandidatesSnafu {})?;
    let candidates: Vec<Candidate> = config_candidates
        .iter()
        .filter(|c| !c.excluded.unwrap_or(false))
        .map(|c| Candidate::new(c.name.clone()))
        .collect();
    let runoff: Option<Candidate> = config.runoff_candidate.clone().map(Candidate::new);

    let ballots =
        validate_final_ballots(data, config_candidates, config.runoff_candidate.as_deref())?;
    info!("Tabulating {} final ballots", ballots.len());

    let result = tabulate_irv(&candidates, &ballots, runoff.as_ref()).context(TabulationSnafu {})?;
    for line in round_table(&result).lines() {
        info!("{}", line);
    }
    Ok(build_irv_summary(config, &result))
}

fn run_nominations(
    config: &TallyConfig,
    data: &[ParsedBallot],
    finalist_count: usize,
) -> TallyResult<JSValue> {
    let ballots = validate_nomination_ballots(data)?;
    info!(
        "Selecting {} finalists out of {} nomination ballots",
        finalist_count,
        ballots.len()
    );

    let mut steps: Vec<EphRound> = Vec::new();
    let mut record =
        |ballots: &[NominationBallot], counts: &NominationCounts, eliminations: &[WorkId]| {
            let round = steps.len() as u32 + 1;
            steps.push(EphRound {
                round,
                ballots: ballots.len(),
                counts: counts.clone(),
                eliminated: eliminations.to_vec(),
            });
        };
    let finalists = select_eph_finalists(&ballots, finalist_count, Some(&mut record));
    for step in steps.iter() {
        info!(
            "Round {}: {} ballots, {} works, eliminated: {:?}",
            step.round,
            step.ballots,
            step.counts.len(),
            step.eliminated
        );
    }
    info!("Finalists: {:?}", finalists);
    Ok(build_eph_summary(config, finalist_count, &finalists, &steps))
}

fn write_summary(pretty_js: &str, out_path: Option<String>) -> TallyResult<()> {
    match out_path.as_deref() {
        None | Some("") | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("Writing the summary to {:?}", path);
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })?;
        }
    }
    Ok(())
}

/// Counts one award category.
///
/// Arguments:
/// * `config_path` the JSON configuration of the category
/// * `check_summary_path` a reference summary the produced summary must match
/// * the other arguments override the corresponding entries of the configuration
pub fn run_category(
    config_path: String,
    check_summary_path: Option<String>,
    override_out_path: Option<String>,
    override_input_path: Option<String>,
    override_input_type: Option<String>,
    override_finalist_count: Option<usize>,
) -> TallyResult<()> {
    let config_p = Path::new(config_path.as_str());
    let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {
        path: config_path.clone(),
    })?;
    let mut config: TallyConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    // The input given on the command line is relative to the working directory.
    if let Some(input_path) = override_input_path {
        let provider = override_input_type.unwrap_or_else(|| "csv".to_string());
        let full_path = fs::canonicalize(&input_path)
            .with_whatever_context(|_| format!("Cannot find the input file {}", input_path))?
            .display()
            .to_string();
        if config.ballot_sources.is_empty() {
            config
                .ballot_sources
                .push(FileSource::from_path(full_path, provider));
        } else {
            config.ballot_sources[0].file_path = full_path;
            config.ballot_sources[0].provider = provider;
        }
    }

    if config.ballot_sources.is_empty() {
        whatever!("No ballot sources detected in {}", config_path);
    }

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let mut data: Vec<ParsedBallot> = Vec::new();
    for cfs in config.ballot_sources.iter() {
        let mut file_data = read_ballot_source(root_p, cfs)?;
        data.append(&mut file_data);
    }
    debug!("data: {:?}", data);

    let result_js = match config.method {
        Method::InstantRunoff => run_final_ballot(&config, &data)?,
        Method::EphFinalists => {
            let finalist_count = override_finalist_count
                .or(config.finalist_count)
                .context(MissingFinalistCountSnafu {})?;
            run_nominations(&config, &data, finalist_count)?
        }
    };

    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    let out_path = override_out_path.or_else(|| config.output_settings.output_path.clone());
    write_summary(&pretty_js_stats, out_path)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pb(choices: &[&str], count: Option<u64>) -> ParsedBallot {
        ParsedBallot {
            id: None,
            count,
            choices: choices.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn candidates(names: &[(&str, bool)]) -> Vec<ConfigCandidate> {
        names
            .iter()
            .map(|(name, excluded)| ConfigCandidate {
                name: name.to_string(),
                excluded: Some(*excluded),
            })
            .collect()
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("awardtally-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn final_ballots_drop_unknown_and_excluded() {
        let cands = candidates(&[("A", false), ("B", false), ("C", true)]);
        let ballots = validate_final_ballots(
            &[
                pb(&["C", "", "Z", "B", "A", "B"], Some(2)),
                pb(&["Z"], None),
                pb(&["A"], Some(0)),
            ],
            &cands,
            None,
        )
        .unwrap();
        assert_eq!(ballots.len(), 2);
        assert_eq!(
            ballots[0].ranking(),
            &[Candidate::from("B"), Candidate::from("A")]
        );
    }

    #[test]
    fn nomination_ballots_are_sets() {
        let ballots = validate_nomination_ballots(&[
            pb(&["w1", " w1 ", "w2", ""], None),
            pb(&["", ""], None),
            pb(&["w3"], Some(3)),
        ])
        .unwrap();
        assert_eq!(ballots.len(), 4);
        assert_eq!(ballots[0].len(), 2);
        assert!(ballots[3].contains(&WorkId::from("w3")));
    }

    #[test]
    fn final_ballot_end_to_end() {
        let dir = test_dir("final");
        fs::write(
            dir.join("ballots.csv"),
            "id,first,second\nb1,Alice,\nb2,Alice,Bob\nb3,Bob,No Award\nb4,No Award,\nb5,Alice,\n",
        )
        .unwrap();
        let config = r#"{
            "outputSettings": { "contestName": "Best Novel" },
            "method": "instantRunoff",
            "candidates": [ { "name": "Alice" }, { "name": "Bob" }, { "name": "No Award" } ],
            "ballotSources": [ { "provider": "csv", "filePath": "ballots.csv",
              "firstVoteColumnIndex": 2, "firstVoteRowIndex": 2, "idColumnIndex": 1 } ]
        }"#;
        fs::write(dir.join("config.json"), config).unwrap();
        let config_path = dir.join("config.json").display().to_string();
        let out_path = dir.join("summary.json").display().to_string();

        run_category(
            config_path.clone(),
            None,
            Some(out_path.clone()),
            None,
            None,
            None,
        )
        .unwrap();
        let summary: JSValue =
            serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(summary["winners"], serde_json::json!(["Alice"]));
        assert_eq!(summary["results"][0]["tally"]["Alice"], "3");

        // Checking against its own output succeeds.
        run_category(
            config_path,
            Some(out_path.clone()),
            Some(dir.join("second.json").display().to_string()),
            None,
            None,
            None,
        )
        .unwrap();
    }

    #[test]
    fn nominations_end_to_end() {
        let dir = test_dir("nominations");
        fs::write(
            dir.join("nominations.json"),
            r#"[ { "id": "n1", "choices": ["a"], "count": 2 },
                 { "choices": ["b"], "count": 2 },
                 { "choices": ["c", "c"] } ]"#,
        )
        .unwrap();
        let config = r#"{
            "outputSettings": { "contestName": "Best Novelette" },
            "method": "ephFinalists",
            "ballotSources": [ { "provider": "json", "filePath": "nominations.json" } ]
        }"#;
        fs::write(dir.join("config.json"), config).unwrap();
        let config_path = dir.join("config.json").display().to_string();
        let out_path = dir.join("summary.json").display().to_string();

        let missing = run_category(
            config_path.clone(),
            None,
            Some(out_path.clone()),
            None,
            None,
            None,
        );
        assert!(matches!(missing, Err(TallyError::MissingFinalistCount {})));

        run_category(config_path, None, Some(out_path.clone()), None, None, Some(2)).unwrap();
        let summary: JSValue =
            serde_json::from_str(&fs::read_to_string(&out_path).unwrap()).unwrap();
        assert_eq!(summary["finalists"], serde_json::json!(["a", "b"]));
        // The round reaching the finalist count does not report eliminations.
        assert_eq!(summary["steps"][0]["eliminated"], serde_json::json!([]));
    }

    #[test]
    fn unlisted_runoff_candidate_keeps_its_votes() {
        let cands = candidates(&[("W", false), ("X", false)]);
        let ballots = validate_final_ballots(
            &[pb(&["W"], Some(5)), pb(&["X", "Nobody"], Some(4)), pb(&["Nobody"], Some(2))],
            &cands,
            Some("Nobody"),
        )
        .unwrap();
        assert_eq!(ballots.len(), 11);
        assert_eq!(ballots[10].ranking(), &[Candidate::from("Nobody")]);

        let config: TallyConfig = serde_json::from_value(serde_json::json!({
            "outputSettings": { "contestName": "Best Novella" },
            "method": "instantRunoff",
            "candidates": [ { "name": "W" }, { "name": "X" } ],
            "runoffCandidate": "Nobody",
            "ballotSources": []
        }))
        .unwrap();
        let data = vec![
            pb(&["W"], Some(5)),
            pb(&["X", "Nobody"], Some(4)),
            pb(&["Nobody"], Some(2)),
        ];
        let summary = run_final_ballot(&config, &data).unwrap();
        assert_eq!(summary["winners"], serde_json::json!(["Nobody"]));
        let rounds = summary["results"].as_array().unwrap();
        let runoff = rounds.last().unwrap();
        assert_eq!(runoff["type"], "runoff");
        assert_eq!(runoff["tally"]["Nobody"], "6");
        assert_eq!(runoff["tally"]["W"], "5");
    }

    #[test]
    fn oversized_ballot_count() {
        let mut line = pb(&["A"], Some(MAX_BALLOT_COUNT + 1));
        line.id = Some("b7".to_string());
        let cands = candidates(&[("A", false)]);
        let res = validate_final_ballots(&[line.clone()], &cands, None);
        assert!(matches!(
            res,
            Err(TallyError::BallotCountTooLarge { ref id, .. }) if id == "b7"
        ));
        let res = validate_nomination_ballots(&[line]);
        assert!(matches!(res, Err(TallyError::BallotCountTooLarge { .. })));

        let at_limit = validate_nomination_ballots(&[pb(&["w1"], Some(3))]).unwrap();
        assert_eq!(at_limit.len(), 3);
    }

    #[test]
    fn unknown_provider() {
        let dir = test_dir("provider");
        let cfs = FileSource::from_path("ballots.txt".to_string(), "txt".to_string());
        let res = read_ballot_source(&dir, &cfs);
        assert!(matches!(res, Err(TallyError::UnknownProvider { .. })));
    }
}
