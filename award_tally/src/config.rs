// ********* Input data structures ***********

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::error::Error;
use std::fmt::Display;

/// The label of the default option on final ballots.
///
/// When no runoff candidate is given explicitly, a candidate with this name
/// (compared without case) is used for the runoff.
pub const NO_AWARD: &str = "No Award";

/// A candidate on a final ballot, identified by its display label.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(name: impl Into<String>) -> Candidate {
        Candidate(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_no_award(&self) -> bool {
        self.0.eq_ignore_ascii_case(NO_AWARD)
    }
}

impl Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Candidate {
    fn from(name: &str) -> Self {
        Candidate::new(name)
    }
}

impl From<String> for Candidate {
    fn from(name: String) -> Self {
        Candidate(name)
    }
}

/// A ranked ballot for the final vote. The first candidate is the most preferred.
///
/// Lower preferences may be omitted.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Ballot {
    ranking: Vec<Candidate>,
}

impl Ballot {
    pub fn new(ranking: Vec<Candidate>) -> Ballot {
        Ballot { ranking }
    }

    pub fn ranking(&self) -> &[Candidate] {
        &self.ranking
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }

    /// Keeps only the given candidates, in their original relative order.
    pub fn truncated(&self, keep: &HashSet<Candidate>) -> Ballot {
        Ballot {
            ranking: self
                .ranking
                .iter()
                .filter(|c| keep.contains(*c))
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<Candidate> for Ballot {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        Ballot::new(iter.into_iter().collect())
    }
}

/// The identifier of a nominated work.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct WorkId(String);

impl WorkId {
    pub fn new(id: impl Into<String>) -> WorkId {
        WorkId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkId {
    fn from(id: &str) -> Self {
        WorkId::new(id)
    }
}

impl From<String> for WorkId {
    fn from(id: String) -> Self {
        WorkId(id)
    }
}

/// An unordered selection of distinct works made by one nominator.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct NominationBallot {
    works: BTreeSet<WorkId>,
}

impl NominationBallot {
    pub fn new(works: BTreeSet<WorkId>) -> NominationBallot {
        NominationBallot { works }
    }

    pub fn works(&self) -> &BTreeSet<WorkId> {
        &self.works
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    pub fn contains(&self, work: &WorkId) -> bool {
        self.works.contains(work)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkId> {
        self.works.iter()
    }

    /// Removes the eliminated works from this ballot.
    pub(crate) fn remove_all(&mut self, eliminated: &HashSet<&WorkId>) {
        self.works.retain(|w| !eliminated.contains(w));
    }
}

impl FromIterator<WorkId> for NominationBallot {
    fn from_iter<I: IntoIterator<Item = WorkId>>(iter: I) -> Self {
        NominationBallot::new(iter.into_iter().collect())
    }
}

/// The nominations and points of one work during one elimination round.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct NominationCount {
    pub nominations: u32,
    pub points: u32,
}

impl NominationCount {
    pub const EMPTY: NominationCount = NominationCount {
        nominations: 0,
        points: 0,
    };
}

/// Counts for all the works present on at least one ballot.
pub type NominationCounts = BTreeMap<WorkId, NominationCount>;

/// The works retained by the finalist selection.
pub type FinalistSet = BTreeSet<WorkId>;

// ******** Output data structures *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CandidateStatus {
    Hopeful,
    Elected,
    Rejected,
}

/// The state of one candidate at the end of a round.
#[derive(PartialEq, Debug, Clone)]
pub struct CandidateResult {
    pub candidate: Candidate,
    pub status: CandidateStatus,
    pub votes: f64,
}

/// Where the ballots of a rejected candidate went.
#[derive(PartialEq, Debug, Clone)]
pub struct TransferStats {
    pub candidate: Candidate,
    pub transfers: Vec<(Candidate, f64)>,
    pub exhausted: f64,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RoundKind {
    Elimination,
    /// The final comparison between the winner and the default option.
    Runoff,
}

/// Statistics for one round
#[derive(PartialEq, Debug, Clone)]
pub struct RoundResult {
    pub round: u32,
    pub kind: RoundKind,
    pub threshold: u64,
    pub candidates: Vec<CandidateResult>,
    pub transfers: Vec<TransferStats>,
}

impl RoundResult {
    pub fn result_for(&self, candidate: &Candidate) -> Option<&CandidateResult> {
        self.candidates.iter().find(|cr| cr.candidate == *candidate)
    }

    pub fn with_status(&self, status: CandidateStatus) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |cr| cr.status == status)
            .map(|cr| &cr.candidate)
    }

    pub fn is_runoff(&self) -> bool {
        self.kind == RoundKind::Runoff
    }
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct ElectionResult {
    pub rounds: Vec<RoundResult>,
}

impl ElectionResult {
    /// The candidates elected at the end of the count, runoff included.
    pub fn winners(&self) -> Vec<&Candidate> {
        match self.rounds.last() {
            Some(round) => round.with_status(CandidateStatus::Elected).collect(),
            None => Vec::new(),
        }
    }

    pub fn runoff(&self) -> Option<&RoundResult> {
        self.rounds.last().filter(|r| r.is_runoff())
    }

    pub fn elimination_rounds(&self) -> impl Iterator<Item = &RoundResult> {
        self.rounds.iter().filter(|r| !r.is_runoff())
    }
}

/// Errors that prevent the tabulation from completing.
///
/// Both indicate malformed input: ties, exhausted ballots and oversized
/// finalist sets are regular outcomes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TabulationError {
    NoCandidatesInRace,
    NoWinnersElected,
}

impl Error for TabulationError {}

impl Display for TabulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabulationError::NoCandidatesInRace => {
                write!(f, "a round started without any candidate in the race")
            }
            TabulationError::NoWinnersElected => {
                write!(f, "the count ended without electing a candidate")
            }
        }
    }
}
