// Assembling the JSON summaries written at the end of a count.

use std::collections::HashSet;

use award_tally::*;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

use crate::tally::config_reader::TallyConfig;

/// One round of the finalist selection, as reported to the observer.
#[derive(PartialEq, Debug, Clone)]
pub struct EphRound {
    pub round: u32,
    pub ballots: usize,
    pub counts: NominationCounts,
    pub eliminated: Vec<WorkId>,
}

fn votes_js(votes: f64) -> JSValue {
    json!(votes.to_string())
}

fn round_type(round: &RoundResult) -> &'static str {
    match round.kind {
        RoundKind::Elimination => "elimination",
        RoundKind::Runoff => "runoff",
    }
}

/// The candidates that reached `status` during this round.
fn newly_with_status<'a>(
    round: &'a RoundResult,
    previous: Option<&RoundResult>,
    status: CandidateStatus,
) -> Vec<&'a Candidate> {
    let before: HashSet<&Candidate> = match previous {
        Some(prev) if !round.is_runoff() => prev.with_status(status).collect(),
        _ => HashSet::new(),
    };
    round
        .with_status(status)
        .filter(|c| !before.contains(c))
        .collect()
}

pub fn irv_results_to_json(result: &ElectionResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    let mut previous: Option<&RoundResult> = None;
    for round in result.rounds.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for cr in round.candidates.iter() {
            if cr.status != CandidateStatus::Rejected || cr.votes > 0.0 || round.is_runoff() {
                tally.insert(cr.candidate.name().to_string(), votes_js(cr.votes));
            }
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        let eliminated = match round.kind {
            RoundKind::Elimination => newly_with_status(round, previous, CandidateStatus::Rejected),
            RoundKind::Runoff => Vec::new(),
        };
        for c in eliminated {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            if let Some(ts) = round.transfers.iter().find(|ts| ts.candidate == *c) {
                for (dest, count) in ts.transfers.iter() {
                    transfers.insert(dest.name().to_string(), votes_js(*count));
                }
                if ts.exhausted > 0.0 {
                    transfers.insert("exhausted".to_string(), votes_js(ts.exhausted));
                }
            }
            tally_results.push(json!({
                "eliminated": c.name(),
                "transfers": transfers
            }));
        }
        for c in newly_with_status(round, previous, CandidateStatus::Elected) {
            tally_results.push(json!({ "elected": c.name() }));
        }

        l.push(json!({
            "round": round.round,
            "type": round_type(round),
            "threshold": round.threshold.to_string(),
            "tally": tally,
            "tallyResults": tally_results
        }));
        previous = Some(round);
    }
    l
}

pub fn build_irv_summary(config: &TallyConfig, result: &ElectionResult) -> JSValue {
    let winners: Vec<&str> = result.winners().into_iter().map(|c| c.name()).collect();
    json!({
        "config": config.output_config(),
        "results": irv_results_to_json(result),
        "winners": winners
    })
}

fn counts_to_json(counts: &NominationCounts) -> JSMap<String, JSValue> {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (work, count) in counts.iter() {
        m.insert(
            work.as_str().to_string(),
            json!({ "nominations": count.nominations, "points": count.points }),
        );
    }
    m
}

pub fn build_eph_summary(
    config: &TallyConfig,
    finalist_count: usize,
    finalists: &FinalistSet,
    steps: &[EphRound],
) -> JSValue {
    let steps_js: Vec<JSValue> = steps
        .iter()
        .map(|step| {
            let eliminated: Vec<&str> = step.eliminated.iter().map(|w| w.as_str()).collect();
            json!({
                "round": step.round,
                "ballots": step.ballots,
                "counts": counts_to_json(&step.counts),
                "eliminated": eliminated
            })
        })
        .collect();
    let finalists_js: Vec<&str> = finalists.iter().map(|w| w.as_str()).collect();
    json!({
        "config": config.output_config(),
        "finalistCount": finalist_count,
        "finalists": finalists_js,
        "steps": steps_js
    })
}

/// A plain text table of the votes per round, for the logs.
pub fn round_table(result: &ElectionResult) -> String {
    let mut names: Vec<&str> = Vec::new();
    for round in result.rounds.iter() {
        for cr in round.candidates.iter() {
            if !names.contains(&cr.candidate.name()) {
                names.push(cr.candidate.name());
            }
        }
    }
    let width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0).max(9);

    let mut header = format!("{:width$}", "", width = width);
    for round in result.rounds.iter() {
        let label = match round.kind {
            RoundKind::Elimination => format!("R{}", round.round),
            RoundKind::Runoff => "Runoff".to_string(),
        };
        header.push_str(&format!(" | {:>8}", label));
    }
    let mut lines: Vec<String> = vec![header];
    for name in names.iter() {
        let mut line = format!("{:width$}", name, width = width);
        for round in result.rounds.iter() {
            let cell = match round.candidates.iter().find(|cr| cr.candidate.name() == *name) {
                Some(cr) => match cr.status {
                    CandidateStatus::Elected => format!("{}*", cr.votes),
                    CandidateStatus::Rejected if cr.votes == 0.0 => "-".to_string(),
                    _ => cr.votes.to_string(),
                },
                None => "-".to_string(),
            };
            line.push_str(&format!(" | {:>8}", cell));
        }
        lines.push(line);
    }
    let mut threshold_line = format!("{:width$}", "threshold", width = width);
    for round in result.rounds.iter() {
        threshold_line.push_str(&format!(" | {:>8}", round.threshold));
    }
    lines.push(threshold_line);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::config_reader::*;

    fn config() -> TallyConfig {
        serde_json::from_value(json!({
            "outputSettings": { "contestName": "Best Novel" },
            "method": "instantRunoff",
            "ballotSources": []
        }))
        .unwrap()
    }

    fn ballots(entries: &[(&[&str], usize)]) -> Vec<Ballot> {
        let mut res: Vec<Ballot> = Vec::new();
        for (ranking, count) in entries.iter() {
            for _ in 0..*count {
                res.push(ranking.iter().map(|s| Candidate::from(*s)).collect());
            }
        }
        res
    }

    fn three_rounds() -> ElectionResult {
        let candidates: Vec<Candidate> = ["A", "B", "C", NO_AWARD]
            .iter()
            .map(|s| Candidate::from(*s))
            .collect();
        let ballots = ballots(&[
            (&["A", "C"], 4),
            (&["B", "C"], 3),
            (&["C"], 3),
            (&[NO_AWARD], 1),
        ]);
        tabulate_irv(&candidates, &ballots, None).unwrap()
    }

    #[test]
    fn irv_summary() {
        let result = three_rounds();
        let js = build_irv_summary(&config(), &result);
        assert_eq!(js["config"]["contest"], "Best Novel");
        assert_eq!(js["winners"], json!(["C"]));

        let rounds = js["results"].as_array().unwrap();
        assert_eq!(rounds[0]["type"], "elimination");
        assert_eq!(rounds[0]["tally"]["A"], "4");
        assert_eq!(
            rounds[0]["tallyResults"],
            json!([{ "eliminated": "No Award", "transfers": { "exhausted": "1" } }])
        );
        assert_eq!(
            rounds[1]["tallyResults"],
            json!([{ "eliminated": "B", "transfers": { "C": "3" } }])
        );
        let last = rounds.last().unwrap();
        assert_eq!(last["type"], "runoff");
        assert_eq!(last["tallyResults"], json!([{ "elected": "C" }]));
    }

    #[test]
    fn summary_is_stable() {
        let result = three_rounds();
        let a = serde_json::to_string_pretty(&build_irv_summary(&config(), &result)).unwrap();
        let b = serde_json::to_string_pretty(&build_irv_summary(&config(), &result)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn eph_summary() {
        let mut counts = NominationCounts::new();
        counts.insert(
            WorkId::from("w1"),
            NominationCount {
                nominations: 2,
                points: 90,
            },
        );
        let steps = vec![EphRound {
            round: 1,
            ballots: 2,
            counts,
            eliminated: vec![WorkId::from("w2")],
        }];
        let finalists: FinalistSet = [WorkId::from("w1")].into_iter().collect();
        let js = build_eph_summary(&config(), 1, &finalists, &steps);
        assert_eq!(js["finalists"], json!(["w1"]));
        assert_eq!(js["finalistCount"], 1);
        assert_eq!(js["steps"][0]["counts"]["w1"]["points"], 90);
        assert_eq!(js["steps"][0]["eliminated"], json!(["w2"]));
    }

    #[test]
    fn table_has_all_rounds() {
        let table = round_table(&three_rounds());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].ends_with("Runoff"));
        assert!(lines[3].starts_with("C"));
    }
}
