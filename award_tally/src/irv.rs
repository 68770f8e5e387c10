use log::{debug, info};

use std::collections::HashSet;

use crate::config::*;
use crate::tracker::{VoteTally, VOTE_EPSILON};

// Final ballots elect a single work.
const NUMBER_OF_SEATS: usize = 1;

/// Runs the instant-runoff count for a final ballot.
///
/// Arguments:
/// * `candidates` the finalists, in the order they should be reported
/// * `ballots` the ranked ballots
/// * `runoff_candidate` the default option the winner must also beat. If not
/// provided, a candidate named "No Award" is used when there is one.
///
/// The returned rounds are in order. When a runoff took place, it is the last
/// round.
pub fn tabulate_irv(
    candidates: &[Candidate],
    ballots: &[Ballot],
    runoff_candidate: Option<&Candidate>,
) -> Result<ElectionResult, TabulationError> {
    info!(
        "tabulate_irv: Processing {:?} ballots, candidates: {:?}",
        ballots.len(),
        candidates
    );
    let runoff: Option<Candidate> = runoff_candidate
        .cloned()
        .or_else(|| candidates.iter().find(|c| c.is_no_award()).cloned());
    debug!("tabulate_irv: runoff candidate: {:?}", runoff);

    let mut tally = VoteTally::new(candidates, ballots);
    let mut rounds: Vec<RoundResult> = Vec::new();

    loop {
        let round_id = (rounds.len() + 1) as u32;
        let round = run_one_round(&mut tally, round_id)?;
        log_round(&round);
        rounds.push(round);
        if tally.in_race().is_empty() {
            break;
        }
    }

    let winners = tally.elected();
    if winners.is_empty() {
        return Err(TabulationError::NoWinnersElected);
    }
    info!("tabulate_irv: elected after {} rounds: {:?}", rounds.len(), winners);

    match runoff {
        Some(r) if !winners.contains(&r) => {
            let round_id = (rounds.len() + 1) as u32;
            let round = run_runoff(tally.candidates(), ballots, &winners, &r, round_id);
            log_round(&round);
            rounds.push(round);
        }
        Some(r) => {
            debug!("tabulate_irv: {} won outright, no runoff", r);
        }
        None => {}
    }

    Ok(ElectionResult { rounds })
}

fn majority_threshold(non_exhausted: usize) -> u64 {
    ((non_exhausted + 1) / 2) as u64
}

fn open_seats(tally: &VoteTally) -> usize {
    NUMBER_OF_SEATS.saturating_sub(tally.elected().len())
}

fn run_one_round(tally: &mut VoteTally, round_id: u32) -> Result<RoundResult, TabulationError> {
    let in_race = tally.in_race();
    if in_race.is_empty() {
        return Err(TabulationError::NoCandidatesInRace);
    }

    let threshold = majority_threshold(tally.non_exhausted_ballot_count());
    debug!("run_one_round: round {} threshold: {}", round_id, threshold);

    let mut elected_now: Vec<Candidate> = Vec::new();
    for c in in_race.iter() {
        if tally.votes_for(c) >= threshold as f64 - VOTE_EPSILON {
            debug!(
                "run_one_round: {} has {} votes, marking as elected",
                c,
                tally.votes_for(c)
            );
            tally.elect(c);
            elected_now.push(c.clone());
        }
    }

    let contenders: Vec<Candidate> = in_race
        .iter()
        .filter(|c| !elected_now.contains(c))
        .cloned()
        .collect();
    let rejected_now: Vec<Candidate> = tally.fewest_votes(&contenders);
    debug!("run_one_round: rejecting {:?}", rejected_now);
    for c in rejected_now.iter() {
        tally.reject(c);
    }

    // Elected by attrition.
    let remaining = tally.in_race();
    if remaining.len() <= open_seats(tally) {
        for c in remaining.iter() {
            tally.elect(c);
        }
    }

    // The contest is decided.
    if open_seats(tally) == 0 {
        for c in tally.in_race() {
            tally.reject(&c);
        }
    }

    let candidates = tally.snapshot();
    let transfers: Vec<TransferStats> = if tally.in_race().is_empty() {
        Vec::new()
    } else {
        rejected_now
            .iter()
            .map(|c| tally.transfer_votes(c))
            .filter(|ts| !ts.transfers.is_empty() || ts.exhausted > 0.0)
            .collect()
    };

    Ok(RoundResult {
        round: round_id,
        kind: RoundKind::Elimination,
        threshold,
        candidates,
        transfers,
    })
}

/// Compares the winners against the default option, using only the
/// preferences between them.
fn run_runoff(
    candidates: &[Candidate],
    ballots: &[Ballot],
    winners: &[Candidate],
    runoff: &Candidate,
    round_id: u32,
) -> RoundResult {
    let mut finalists: Vec<Candidate> = winners.to_vec();
    finalists.push(runoff.clone());
    let keep: HashSet<Candidate> = finalists.iter().cloned().collect();
    let truncated: Vec<Ballot> = ballots.iter().map(|b| b.truncated(&keep)).collect();

    let mut tally = VoteTally::new(&finalists, &truncated);
    let threshold = majority_threshold(tally.non_exhausted_ballot_count());
    // All the winners were elected together and hold the same weight.
    let winner_votes = tally.votes_for(&winners[0]);
    let runoff_votes = tally.votes_for(runoff);
    debug!(
        "run_runoff: {:?} with {} votes against {} with {} votes",
        winners, winner_votes, runoff, runoff_votes
    );

    if runoff_votes - winner_votes > VOTE_EPSILON {
        info!("run_runoff: {} overturns {:?}", runoff, winners);
        tally.elect(runoff);
        for w in winners.iter() {
            tally.reject(w);
        }
    } else {
        for w in winners.iter() {
            tally.elect(w);
        }
        tally.reject(runoff);
    }

    let mut all_candidates: Vec<Candidate> = candidates.to_vec();
    if !all_candidates.contains(runoff) {
        all_candidates.push(runoff.clone());
    }
    let results: Vec<CandidateResult> = all_candidates
        .into_iter()
        .map(|c| {
            let status = tally.status(&c).unwrap_or(CandidateStatus::Rejected);
            CandidateResult {
                votes: tally.votes_for(&c),
                status,
                candidate: c,
            }
        })
        .collect();

    RoundResult {
        round: round_id,
        kind: RoundKind::Runoff,
        threshold,
        candidates: results,
        transfers: Vec::new(),
    }
}

fn log_round(round: &RoundResult) {
    info!(
        "Round {} {:?} (winning threshold: {})",
        round.round, round.kind, round.threshold
    );
    for cr in round.candidates.iter() {
        match cr.status {
            CandidateStatus::Hopeful => info!("      {} {}", cr.votes, cr.candidate),
            CandidateStatus::Elected => info!("      {} {} -> elected", cr.votes, cr.candidate),
            CandidateStatus::Rejected => {
                info!("      {} {} -> rejected", cr.votes, cr.candidate)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cands(names: &[&str]) -> Vec<Candidate> {
        names.iter().map(|n| Candidate::from(*n)).collect()
    }

    fn ballots(entries: &[(&[&str], usize)]) -> Vec<Ballot> {
        let mut res: Vec<Ballot> = Vec::new();
        for (names, count) in entries.iter() {
            for _ in 0..*count {
                res.push(names.iter().map(|n| Candidate::from(*n)).collect());
            }
        }
        res
    }

    fn status_in(round: &RoundResult, name: &str) -> CandidateStatus {
        round.result_for(&name.into()).unwrap().status
    }

    #[test]
    fn single_candidate_without_ballots() {
        init();
        let res = tabulate_irv(&cands(&["C"]), &[], None).unwrap();
        assert_eq!(res.rounds.len(), 1);
        assert_eq!(res.winners(), vec![&Candidate::from("C")]);
        assert_eq!(res.rounds[0].result_for(&"C".into()).unwrap().votes, 0.0);
        assert!(res.runoff().is_none());
    }

    #[test]
    fn no_candidates() {
        init();
        let res = tabulate_irv(&[], &ballots(&[(&["A"], 2)]), None);
        assert_eq!(res, Err(TabulationError::NoCandidatesInRace));
    }

    #[test]
    fn majority_in_first_round() {
        init();
        let res = tabulate_irv(
            &cands(&["A", "B"]),
            &ballots(&[(&["A"], 3), (&["B"], 2)]),
            None,
        )
        .unwrap();
        assert_eq!(res.rounds.len(), 1);
        let round = &res.rounds[0];
        assert_eq!(round.threshold, 3);
        assert_eq!(status_in(round, "A"), CandidateStatus::Elected);
        assert_eq!(status_in(round, "B"), CandidateStatus::Rejected);
        assert!(round.transfers.is_empty());
    }

    #[test]
    fn transfers_after_elimination() {
        init();
        let res = tabulate_irv(
            &cands(&["A", "B", "C"]),
            &ballots(&[(&["A"], 2), (&["B", "A"], 1), (&["B"], 1), (&["C", "B"], 1)]),
            None,
        )
        .unwrap();
        assert_eq!(res.rounds.len(), 2);
        let first = &res.rounds[0];
        assert_eq!(status_in(first, "C"), CandidateStatus::Rejected);
        assert_eq!(status_in(first, "A"), CandidateStatus::Hopeful);
        assert_eq!(
            first.transfers,
            vec![TransferStats {
                candidate: "C".into(),
                transfers: vec![(Candidate::from("B"), 1.0)],
                exhausted: 0.0,
            }]
        );
        let second = &res.rounds[1];
        assert_eq!(second.result_for(&"B".into()).unwrap().votes, 3.0);
        assert_eq!(res.winners(), vec![&Candidate::from("B")]);
    }

    #[test]
    fn exhausted_ballots_lower_the_threshold() {
        init();
        let res = tabulate_irv(
            &cands(&["A", "B", "C"]),
            &ballots(&[(&["A"], 4), (&["B"], 3), (&["C"], 2)]),
            None,
        )
        .unwrap();
        assert_eq!(res.rounds[0].threshold, 5);
        assert_eq!(status_in(&res.rounds[0], "C"), CandidateStatus::Rejected);
        assert_eq!(res.rounds[0].transfers[0].exhausted, 2.0);
        // Only 7 ballots are left.
        assert_eq!(res.rounds[1].threshold, 4);
        assert_eq!(res.winners(), vec![&Candidate::from("A")]);
    }

    #[test]
    fn winner_holds_majority_when_elected() {
        init();
        let res = tabulate_irv(
            &cands(&["A", "B", "C", "D"]),
            &ballots(&[
                (&["A", "B"], 5),
                (&["B", "C"], 4),
                (&["C", "B", "A"], 3),
                (&["D", "C"], 2),
                (&["D"], 1),
            ]),
            None,
        )
        .unwrap();
        let winner = res.winners()[0].clone();
        let deciding = res
            .elimination_rounds()
            .find(|r| r.result_for(&winner).unwrap().status == CandidateStatus::Elected)
            .unwrap();
        // D goes first on second choices, then B.
        assert_eq!(winner, Candidate::from("C"));
        assert_eq!(deciding.round, 3);
        let votes = deciding.result_for(&winner).unwrap().votes;
        assert!(votes >= deciding.threshold as f64 - 1e-6);
    }

    #[test]
    fn tie_on_lowest_broken_by_second_choices() {
        init();
        let res = tabulate_irv(
            &cands(&["A", "B", "C", "D"]),
            &ballots(&[
                (&["A", "C"], 1),
                (&["A"], 1),
                (&["D"], 2),
                (&["B"], 1),
                (&["C"], 1),
            ]),
            None,
        )
        .unwrap();
        let first = &res.rounds[0];
        assert_eq!(status_in(first, "B"), CandidateStatus::Rejected);
        assert_eq!(status_in(first, "C"), CandidateStatus::Hopeful);
    }

    #[test]
    fn complete_tie_elects_nobody() {
        init();
        let res = tabulate_irv(
            &cands(&["A", "B", "C"]),
            &ballots(&[(&["A"], 1), (&["B"], 1), (&["C"], 1)]),
            None,
        );
        assert_eq!(res, Err(TabulationError::NoWinnersElected));
    }

    #[test]
    fn runoff_overturns_the_winner() {
        init();
        let res = tabulate_irv(
            &cands(&["W", "X", "R"]),
            &ballots(&[(&["W"], 5), (&["X", "R"], 4), (&["R"], 2)]),
            Some(&"R".into()),
        )
        .unwrap();
        let last_elimination = res.elimination_rounds().last().unwrap();
        assert_eq!(status_in(last_elimination, "W"), CandidateStatus::Elected);

        let runoff = res.runoff().unwrap();
        assert_eq!(runoff.result_for(&"W".into()).unwrap().votes, 5.0);
        assert_eq!(runoff.result_for(&"R".into()).unwrap().votes, 6.0);
        assert_eq!(status_in(runoff, "R"), CandidateStatus::Elected);
        assert_eq!(status_in(runoff, "W"), CandidateStatus::Rejected);
        assert_eq!(status_in(runoff, "X"), CandidateStatus::Rejected);
        assert_eq!(res.winners(), vec![&Candidate::from("R")]);
    }

    #[test]
    fn runoff_confirms_the_winner_on_equal_votes() {
        init();
        let res = tabulate_irv(
            &cands(&["W", "X", "No Award"]),
            &ballots(&[(&["W"], 5), (&["X", "No Award"], 3), (&["No Award"], 2)]),
            None,
        )
        .unwrap();
        let runoff = res.runoff().unwrap();
        assert_eq!(runoff.result_for(&"W".into()).unwrap().votes, 5.0);
        assert_eq!(runoff.result_for(&"No Award".into()).unwrap().votes, 5.0);
        assert_eq!(res.winners(), vec![&Candidate::from("W")]);
        assert_eq!(status_in(runoff, "No Award"), CandidateStatus::Rejected);
    }

    #[test]
    fn no_award_is_found_without_case() {
        init();
        let res = tabulate_irv(
            &cands(&["W", "no award"]),
            &ballots(&[(&["W"], 3), (&["no award"], 2)]),
            None,
        )
        .unwrap();
        assert!(res.runoff().is_some());
        assert_eq!(res.winners(), vec![&Candidate::from("W")]);
    }

    #[test]
    fn no_runoff_when_no_award_wins() {
        init();
        let res = tabulate_irv(
            &cands(&["W", "No Award"]),
            &ballots(&[(&["W"], 2), (&["No Award"], 3)]),
            None,
        )
        .unwrap();
        assert!(res.runoff().is_none());
        assert_eq!(res.winners(), vec![&Candidate::from("No Award")]);
    }
}
