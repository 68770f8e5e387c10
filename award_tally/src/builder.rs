use log::debug;

pub use crate::config::*;

use crate::irv::tabulate_irv;

/// A builder for adding final ballots.
///
/// ```
/// use award_tally::builder::Builder;
/// # use award_tally::TabulationError;
///
/// let mut builder = Builder::new()
///     .candidates(&["Anna".to_string(), "Bob".to_string(), "No Award".to_string()]);
///
/// builder.add_ballot_simple(&["Anna".to_string(), "".to_string(), "Bob".to_string()]);
/// builder.add_ballot(&["Bob".to_string()], 2);
///
/// let result = builder.tabulate()?;
/// assert_eq!(result.winners()[0].name(), "Bob");
/// # Ok::<(), TabulationError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    pub(crate) _candidates: Option<Vec<Candidate>>,
    pub(crate) _runoff: Option<Candidate>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Declares the candidates. Without it, the candidates are inferred from
    /// the ballots, in order of appearance.
    pub fn candidates(self, cands: &[String]) -> Builder {
        Builder {
            _candidates: Some(cands.iter().map(|name| Candidate::new(name.clone())).collect()),
            ..self
        }
    }

    /// Overrides the default option used for the runoff.
    pub fn runoff_candidate(self, name: &str) -> Builder {
        Builder {
            _runoff: Some(Candidate::new(name)),
            ..self
        }
    }

    /// Adds a single ballot.
    pub fn add_ballot_simple(&mut self, candidates: &[String]) {
        self.add_ballot(candidates, 1)
    }

    /// Adds a ballot, repeated `count` times.
    ///
    /// candidates: the choices made by the voter, in order. Blank choices are
    /// skipped, and so are the names that were not declared as candidates.
    pub fn add_ballot(&mut self, candidates: &[String], count: u32) {
        let mut ranking: Vec<Candidate> = Vec::new();
        for name in candidates.iter().map(|s| s.trim()) {
            if name.is_empty() {
                continue;
            }
            let c = Candidate::new(name);
            let declared = match self._candidates.as_deref() {
                Some(valid) => valid.contains(&c),
                None => true,
            };
            if !declared {
                debug!("add_ballot: skipping undeclared candidate {:?}", name);
            } else if !ranking.contains(&c) {
                ranking.push(c);
            }
        }
        for _ in 0..count {
            self._ballots.push(Ballot::new(ranking.clone()));
        }
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self._ballots
    }

    /// Runs the instant-runoff count on the ballots added so far.
    pub fn tabulate(&self) -> Result<ElectionResult, TabulationError> {
        let candidates: Vec<Candidate> = match self._candidates.clone() {
            Some(cands) => cands,
            None => {
                let mut inferred: Vec<Candidate> = Vec::new();
                for c in self._ballots.iter().flat_map(|b| b.ranking()) {
                    if !inferred.contains(c) {
                        inferred.push(c.clone());
                    }
                }
                inferred
            }
        };
        tabulate_irv(&candidates, &self._ballots, self._runoff.as_ref())
    }
}
