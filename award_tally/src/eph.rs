use log::{debug, info};

use std::collections::HashSet;

use crate::config::*;
use crate::nomination::count_nominations;

/// Receives the ballots, the counts and the eliminated works of every round.
///
/// The eliminations are empty on the last round, which ends the selection
/// without removing works from the ballots.
pub type StepObserver<'o> = &'o mut dyn FnMut(&[NominationBallot], &NominationCounts, &[WorkId]);

/// Selects the finalists out of the nomination ballots.
///
/// Works are eliminated round after round until `finalist_count` works remain.
/// If an elimination would leave fewer works than requested, it is not applied
/// and all the remaining works are finalists, so the result may be larger than
/// `finalist_count`.
///
/// The observer, if any, is called once per round before the elimination.
pub fn select_eph_finalists(
    ballots: &[NominationBallot],
    finalist_count: usize,
    mut observer: Option<StepObserver>,
) -> FinalistSet {
    info!(
        "select_eph_finalists: {} ballots, {} finalists",
        ballots.len(),
        finalist_count
    );
    let mut cur_ballots: Vec<NominationBallot> =
        ballots.iter().filter(|b| !b.is_empty()).cloned().collect();
    let mut round: u32 = 0;

    while !cur_ballots.is_empty() {
        round += 1;
        let counts = count_nominations(&cur_ballots);
        let eliminations = find_eliminations(&counts);
        let next_size = counts.len() - eliminations.len();
        debug!(
            "select_eph_finalists: round {}: {} works, eliminating {:?}",
            round,
            counts.len(),
            eliminations
        );

        if next_size <= finalist_count || eliminations.is_empty() {
            if let Some(obs) = observer.as_deref_mut() {
                obs(cur_ballots.as_slice(), &counts, &[][..]);
            }
            if next_size == finalist_count && !eliminations.is_empty() {
                info!("select_eph_finalists: reached {} works at round {}", next_size, round);
                let eliminated: HashSet<&WorkId> = eliminations.iter().collect();
                return counts
                    .into_keys()
                    .filter(|w| !eliminated.contains(w))
                    .collect();
            }
            info!(
                "select_eph_finalists: stopping at round {} with {} works",
                round,
                counts.len()
            );
            return counts.into_keys().collect();
        }

        if let Some(obs) = observer.as_deref_mut() {
            obs(cur_ballots.as_slice(), &counts, eliminations.as_slice());
        }

        let eliminated: HashSet<&WorkId> = eliminations.iter().collect();
        cur_ballots = cur_ballots
            .into_iter()
            .filter_map(|mut b| {
                b.remove_all(&eliminated);
                if b.is_empty() {
                    None
                } else {
                    Some(b)
                }
            })
            .collect();
    }
    FinalistSet::new()
}

/// The works with the fewest points. The group with the next lowest points is
/// added when the lowest is held by a single work.
///
/// The widening is applied only once.
fn fewest_points(counts: &NominationCounts) -> Vec<(&WorkId, &NominationCount)> {
    if counts.len() <= 2 {
        return counts.iter().collect();
    }
    let mut distinct_points: Vec<u32> = counts.values().map(|c| c.points).collect();
    distinct_points.sort_unstable();
    distinct_points.dedup();

    let mut pool: Vec<(&WorkId, &NominationCount)> = Vec::new();
    for points in distinct_points.iter().take(2) {
        if pool.len() >= 2 {
            break;
        }
        pool.extend(counts.iter().filter(|(_, c)| c.points == *points));
    }
    pool
}

/// Within the fewest points, the works with the fewest nominations, and
/// among those the fewest points.
fn find_eliminations(counts: &NominationCounts) -> Vec<WorkId> {
    let pool = fewest_points(counts);
    let min_nominations = match pool.iter().map(|(_, c)| c.nominations).min() {
        Some(x) => x,
        None => return Vec::new(),
    };
    let fewest_nominations: Vec<(&WorkId, &NominationCount)> = pool
        .into_iter()
        .filter(|(_, c)| c.nominations == min_nominations)
        .collect();
    let min_points = match fewest_nominations.iter().map(|(_, c)| c.points).min() {
        Some(x) => x,
        None => return Vec::new(),
    };
    fewest_nominations
        .into_iter()
        .filter(|(_, c)| c.points == min_points)
        .map(|(w, _)| w.clone())
        .collect()
}
