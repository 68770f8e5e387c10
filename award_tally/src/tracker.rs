use log::debug;

use std::collections::HashMap;

use crate::config::*;

/// Tolerance applied when comparing vote weights.
pub(crate) const VOTE_EPSILON: f64 = 1e-6;

const BALLOT_WEIGHT: f64 = 1.0;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(usize);

// The choices only contain known candidates, each of them once.
#[derive(Eq, PartialEq, Debug, Clone)]
struct TrackedBallot {
    choices: Vec<CandidateId>,
    // Index in `choices` of the preferred candidate still in the race.
    // None once the ballot is exhausted.
    current: Option<usize>,
}

/// Per-round bookkeeping for the instant-runoff count.
///
/// Every ballot counts towards its highest ranked candidate that is still
/// hopeful. Candidates leave the race by being elected or rejected, and the
/// ballots of rejected candidates move down to the next hopeful preference.
#[derive(Debug, Clone)]
pub struct VoteTally {
    candidates: Vec<Candidate>,
    ids: HashMap<Candidate, CandidateId>,
    status: Vec<CandidateStatus>,
    votes: Vec<f64>,
    ballots: Vec<TrackedBallot>,
}

impl VoteTally {
    /// Builds a tally over the given candidates.
    ///
    /// Repeated candidates are only registered once. Ballot entries that do not
    /// name one of the candidates are ignored, and a repeated entry counts as
    /// its first occurrence.
    pub fn new(candidates: &[Candidate], ballots: &[Ballot]) -> VoteTally {
        let mut registered: Vec<Candidate> = Vec::new();
        let mut ids: HashMap<Candidate, CandidateId> = HashMap::new();
        for c in candidates.iter() {
            if !ids.contains_key(c) {
                ids.insert(c.clone(), CandidateId(registered.len()));
                registered.push(c.clone());
            }
        }

        let mut votes: Vec<f64> = vec![0.0; registered.len()];
        let mut tracked: Vec<TrackedBallot> = Vec::with_capacity(ballots.len());
        for b in ballots.iter() {
            let mut choices: Vec<CandidateId> = Vec::new();
            for c in b.ranking() {
                match ids.get(c) {
                    Some(cid) if !choices.contains(cid) => choices.push(*cid),
                    Some(_) => {}
                    None => {
                        debug!("VoteTally::new: ignoring unknown candidate {:?}", c);
                    }
                }
            }
            let current = if choices.is_empty() { None } else { Some(0) };
            if let Some(cid) = choices.first() {
                votes[cid.0] += BALLOT_WEIGHT;
            }
            tracked.push(TrackedBallot { choices, current });
        }

        debug!(
            "VoteTally::new: {} candidates, {} ballots",
            registered.len(),
            tracked.len()
        );
        VoteTally {
            status: vec![CandidateStatus::Hopeful; registered.len()],
            candidates: registered,
            ids,
            votes,
            ballots: tracked,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn status(&self, candidate: &Candidate) -> Option<CandidateStatus> {
        self.ids.get(candidate).map(|cid| self.status[cid.0])
    }

    /// The current weight held by this candidate.
    pub fn votes_for(&self, candidate: &Candidate) -> f64 {
        self.ids
            .get(candidate)
            .map(|cid| self.votes[cid.0])
            .unwrap_or(0.0)
    }

    pub fn non_exhausted_ballot_count(&self) -> usize {
        self.ballots.iter().filter(|b| b.current.is_some()).count()
    }

    /// The hopeful candidates, in registration order.
    pub fn in_race(&self) -> Vec<Candidate> {
        self.with_status(CandidateStatus::Hopeful)
    }

    pub fn elected(&self) -> Vec<Candidate> {
        self.with_status(CandidateStatus::Elected)
    }

    pub fn rejected(&self) -> Vec<Candidate> {
        self.with_status(CandidateStatus::Rejected)
    }

    fn with_status(&self, status: CandidateStatus) -> Vec<Candidate> {
        self.candidates
            .iter()
            .zip(self.status.iter())
            .filter(|(_, s)| **s == status)
            .map(|(c, _)| c.clone())
            .collect()
    }

    /// Marks a hopeful candidate as elected. Returns false if the candidate
    /// was not hopeful.
    pub fn elect(&mut self, candidate: &Candidate) -> bool {
        self.leave_race(candidate, CandidateStatus::Elected)
    }

    /// Marks a hopeful candidate as rejected. Returns false if the candidate
    /// was not hopeful.
    pub fn reject(&mut self, candidate: &Candidate) -> bool {
        self.leave_race(candidate, CandidateStatus::Rejected)
    }

    fn leave_race(&mut self, candidate: &Candidate, status: CandidateStatus) -> bool {
        match self.ids.get(candidate) {
            Some(cid) if self.status[cid.0] == CandidateStatus::Hopeful => {
                debug!("leave_race: {} -> {:?}", candidate, status);
                self.status[cid.0] = status;
                true
            }
            Some(cid) => {
                debug!(
                    "leave_race: {} is already {:?}, ignoring {:?}",
                    candidate, self.status[cid.0], status
                );
                false
            }
            None => false,
        }
    }

    /// Moves the ballots held by a rejected candidate to their next hopeful
    /// preference. Ballots without one become exhausted.
    pub fn transfer_votes(&mut self, candidate: &Candidate) -> TransferStats {
        let mut stats = TransferStats {
            candidate: candidate.clone(),
            transfers: Vec::new(),
            exhausted: 0.0,
        };
        let cid = match self.ids.get(candidate) {
            Some(cid) if self.status[cid.0] == CandidateStatus::Rejected => *cid,
            _ => {
                debug!(
                    "transfer_votes: {} is not a rejected candidate, nothing to transfer",
                    candidate
                );
                return stats;
            }
        };

        let status = &self.status;
        let votes = &mut self.votes;
        let mut received: HashMap<CandidateId, f64> = HashMap::new();
        for ballot in self.ballots.iter_mut() {
            let idx = match ballot.current {
                Some(idx) if ballot.choices[idx] == cid => idx,
                _ => continue,
            };
            let next = ballot
                .choices
                .iter()
                .enumerate()
                .skip(idx + 1)
                .find(|(_, c)| status[c.0] == CandidateStatus::Hopeful)
                .map(|(next_idx, c)| (next_idx, *c));
            votes[cid.0] -= BALLOT_WEIGHT;
            match next {
                Some((next_idx, next_cid)) => {
                    ballot.current = Some(next_idx);
                    votes[next_cid.0] += BALLOT_WEIGHT;
                    *received.entry(next_cid).or_insert(0.0) += BALLOT_WEIGHT;
                }
                None => {
                    ballot.current = None;
                    stats.exhausted += BALLOT_WEIGHT;
                }
            }
        }
        // Clear the rounding residue, all the ballots are gone.
        self.votes[cid.0] = 0.0;

        let mut received: Vec<(CandidateId, f64)> = received.into_iter().collect();
        received.sort_by_key(|(c, _)| *c);
        stats.transfers = received
            .into_iter()
            .map(|(c, w)| (self.candidates[c.0].clone(), w))
            .collect();
        debug!("transfer_votes: {:?}", stats);
        stats
    }

    /// The weight of the ballots on which this candidate is the next hopeful
    /// preference after the current holder.
    pub fn second_choice_votes(&self, candidate: &Candidate) -> f64 {
        match self.ids.get(candidate) {
            Some(cid) => self.second_choice_votes_id(*cid),
            None => 0.0,
        }
    }

    fn second_choice_votes_id(&self, cid: CandidateId) -> f64 {
        self.ballots
            .iter()
            .filter_map(|b| {
                let idx = b.current?;
                b.choices
                    .iter()
                    .skip(idx + 1)
                    .find(|c| self.status[c.0] == CandidateStatus::Hopeful)
                    .filter(|c| **c == cid)
                    .map(|_| BALLOT_WEIGHT)
            })
            .sum()
    }

    /// Finds the candidates with the fewest votes among the given ones.
    ///
    /// Ties on the vote weight are broken in favour of the candidates with the
    /// most second choice votes. Candidates still tied after that are all
    /// returned.
    pub fn fewest_votes(&self, among: &[Candidate]) -> Vec<Candidate> {
        let cids: Vec<CandidateId> = among
            .iter()
            .filter_map(|c| self.ids.get(c))
            .cloned()
            .collect();
        let lowest = match cids.iter().map(|c| self.votes[c.0]).reduce(f64::min) {
            Some(x) => x,
            None => return Vec::new(),
        };
        let tied: Vec<CandidateId> = cids
            .into_iter()
            .filter(|c| self.votes[c.0] - lowest < VOTE_EPSILON)
            .collect();
        if tied.len() <= 1 {
            return tied.iter().map(|c| self.candidates[c.0].clone()).collect();
        }

        let seconds: Vec<(CandidateId, f64)> = tied
            .iter()
            .map(|c| (*c, self.second_choice_votes_id(*c)))
            .collect();
        debug!("fewest_votes: tie on {:?}, second choices: {:?}", lowest, seconds);
        let fewest_seconds = seconds
            .iter()
            .map(|(_, w)| *w)
            .reduce(f64::min)
            .unwrap_or(0.0);
        seconds
            .into_iter()
            .filter(|(_, w)| *w - fewest_seconds < VOTE_EPSILON)
            .map(|(c, _)| self.candidates[c.0].clone())
            .collect()
    }

    /// The state of all the candidates, in registration order.
    pub fn snapshot(&self) -> Vec<CandidateResult> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| CandidateResult {
                candidate: c.clone(),
                status: self.status[idx],
                votes: self.votes[idx],
            })
            .collect()
    }
}
