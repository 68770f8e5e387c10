use log::debug;

use crate::config::*;

/// The points spread by every nomination ballot over its works.
///
/// 60 divides evenly by all the ballot sizes from 1 to 5, so no point is lost
/// to the integer division.
pub const POINTS_PER_BALLOT: u32 = 60;

/// Counts the nominations and the points of every work.
///
/// Each work on a ballot receives one nomination and an equal share of
/// [`POINTS_PER_BALLOT`]. Works that are not on any ballot are not reported.
/// Empty ballots do not count.
pub fn count_nominations(ballots: &[NominationBallot]) -> NominationCounts {
    let mut counts = NominationCounts::new();
    for ballot in ballots.iter().filter(|b| !b.is_empty()) {
        let points = POINTS_PER_BALLOT / ballot.len() as u32;
        for work in ballot.iter() {
            let e = counts.entry(work.clone()).or_insert(NominationCount::EMPTY);
            e.nominations += 1;
            e.points += points;
        }
    }
    debug!(
        "count_nominations: {} ballots, {} works",
        ballots.len(),
        counts.len()
    );
    counts
}
