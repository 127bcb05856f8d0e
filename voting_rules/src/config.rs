// ********* Limits enforced when loading a table ***********

use std::error::Error;
use std::fmt::Display;

/// The largest number of voters accepted in a preference table.
pub const MAX_VOTERS: usize = 200;

/// The largest number of candidates accepted in a preference table.
pub const MAX_CANDIDATES: usize = 20;

// ******** Output data structures *********

/// The outcome of a single-tally rule (plurality or Borda count).
///
/// The tally lists every candidate in first-occurrence order. For the
/// Borda count the numbers are point totals and lower is better.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyOutcome {
    pub winner: String,
    pub tally: Vec<(String, u64)>,
}

/// The outcome of plurality with runoff.
///
/// `second_round` is `None` when the first-round leader holds a strict
/// majority and wins outright.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunoffOutcome {
    pub winner: String,
    pub first_round: Vec<(String, u64)>,
    pub second_round: Option<Vec<(String, u64)>>,
}

/// The outcome of the Condorcet pairwise tournament.
///
/// `winner` is `None` when no candidate beats every other candidate.
/// This is a legitimate result of the rule, not an error.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CondorcetOutcome {
    pub winner: Option<String>,
    pub pairwise_wins: Vec<(String, u64)>,
}

/// The results of the four voting rules over one preference table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RuleOutcomes {
    pub plurality: TallyOutcome,
    pub runoff: RunoffOutcome,
    pub condorcet: CondorcetOutcome,
    pub borda: TallyOutcome,
}

/// Everything computed for one dataset.
///
/// `outcomes` is `None` when the fairness conditions failed, in which
/// case none of the voting rules were evaluated.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionReport {
    pub num_voters: usize,
    pub num_candidates: usize,
    pub summary: Vec<(String, u64)>,
    pub conditions_met: bool,
    pub outcomes: Option<RuleOutcomes>,
}

/// Errors that prevent a preference table from being built.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ElectionError {
    EmptyElection,
    TooManyVoters { voters: usize },
    TooManyCandidates { candidates: usize },
    UnevenBallot { row: usize, expected: usize, found: usize },
}

impl Error for ElectionError {}

impl Display for ElectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionError::EmptyElection => write!(f, "the preference table is empty"),
            ElectionError::TooManyVoters { voters } => {
                write!(f, "number of voters n={} exceeds {}", voters, MAX_VOTERS)
            }
            ElectionError::TooManyCandidates { candidates } => {
                write!(
                    f,
                    "number of candidates m={} exceeds {}",
                    candidates, MAX_CANDIDATES
                )
            }
            ElectionError::UnevenBallot {
                row,
                expected,
                found,
            } => {
                write!(
                    f,
                    "ballot at row {} has {} choices, expected {}",
                    row, found, expected
                )
            }
        }
    }
}
