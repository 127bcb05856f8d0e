mod config;
use log::{debug, info};

use std::{
    cmp::{Ordering, Reverse},
    collections::HashMap,
    ops::AddAssign,
};

pub use crate::config::*;

// **** Private structures ****

// Candidates are interned in first-occurrence order: the order their
// names are first seen scanning ballots top-to-bottom, left-to-right.
// A lower id therefore always means "seen first", which is the
// canonical tie-break sequence for every rule.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

/// An immutable table of ranked ballots.
///
/// Each row is one voter's complete ranking, most preferred first.
/// Every row is expected to be a permutation of the same candidate
/// set; this is a precondition of the voting rules and is not
/// validated beyond the size and row-length checks performed at
/// construction.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PreferenceTable {
    // One row of interned candidate ids per voter.
    ballots: Vec<Vec<CandidateId>>,
    // Candidate names in first-occurrence order, indexed by id.
    candidates: Vec<String>,
}

impl PreferenceTable {
    /// Builds a table from raw rows of candidate names.
    ///
    /// Names are stored case-sensitively, exactly as given. The size
    /// bounds (at most [MAX_VOTERS] rows and [MAX_CANDIDATES] columns)
    /// and the equal-row-length invariant are enforced here, before
    /// any rule runs.
    pub fn new(rows: &[Vec<String>]) -> Result<PreferenceTable, ElectionError> {
        if rows.is_empty() {
            return Err(ElectionError::EmptyElection);
        }
        if rows.len() > MAX_VOTERS {
            return Err(ElectionError::TooManyVoters { voters: rows.len() });
        }
        let width = rows[0].len();
        if width == 0 {
            return Err(ElectionError::EmptyElection);
        }
        if width > MAX_CANDIDATES {
            return Err(ElectionError::TooManyCandidates { candidates: width });
        }

        let mut candidates: Vec<String> = Vec::new();
        let mut ids: HashMap<String, CandidateId> = HashMap::new();
        let mut ballots: Vec<Vec<CandidateId>> = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(ElectionError::UnevenBallot {
                    row: idx + 1,
                    expected: width,
                    found: row.len(),
                });
            }
            let mut ballot: Vec<CandidateId> = Vec::with_capacity(width);
            for name in row.iter() {
                let cid = match ids.get(name) {
                    Some(cid) => *cid,
                    None => {
                        let cid = CandidateId(candidates.len() as u32);
                        ids.insert(name.clone(), cid);
                        candidates.push(name.clone());
                        cid
                    }
                };
                ballot.push(cid);
            }
            ballots.push(ballot);
        }
        debug!(
            "PreferenceTable::new: {} ballots over {} candidates",
            ballots.len(),
            candidates.len()
        );
        Ok(PreferenceTable {
            ballots,
            candidates,
        })
    }

    pub fn num_voters(&self) -> usize {
        self.ballots.len()
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Candidate names in first-occurrence order.
    pub fn candidate_names(&self) -> &[String] {
        &self.candidates
    }

    fn name(&self, cid: CandidateId) -> &str {
        &self.candidates[cid.0 as usize]
    }
}

fn first_choice_tally(table: &PreferenceTable) -> Vec<VoteCount> {
    // Zero-initialized over the full roster so that candidates without
    // a single first-rank vote still appear in the output.
    let mut tally = vec![VoteCount::EMPTY; table.candidates.len()];
    for ballot in table.ballots.iter() {
        tally[ballot[0].0 as usize] += VoteCount(1);
    }
    tally
}

// Strict comparison keeps the earliest-seen candidate among ties.
fn leading_candidate(tally: &[VoteCount]) -> CandidateId {
    let mut best = 0usize;
    for (idx, count) in tally.iter().enumerate() {
        if *count > tally[best] {
            best = idx;
        }
    }
    CandidateId(best as u32)
}

fn named_tally(table: &PreferenceTable, tally: &[VoteCount]) -> Vec<(String, u64)> {
    tally
        .iter()
        .enumerate()
        .map(|(idx, vc)| (table.candidates[idx].clone(), vc.0))
        .collect()
}

/// Groups identical ballots under a normalized signature and counts
/// them.
///
/// The signature joins the candidate names of a ballot with `" > "`,
/// each trimmed and uppercased. The result is ordered by descending
/// count, ties broken by ascending signature. The counts sum to the
/// number of voters.
pub fn ballot_summary(table: &PreferenceTable) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for ballot in table.ballots.iter() {
        let signature = ballot
            .iter()
            .map(|cid| table.name(*cid).trim().to_uppercase())
            .collect::<Vec<String>>()
            .join(" > ");
        *counts.entry(signature).or_insert(0) += 1;
    }
    let mut res: Vec<(String, u64)> = counts.into_iter().collect();
    res.sort_by(|(sig_a, count_a), (sig_b, count_b)| {
        count_b.cmp(count_a).then_with(|| sig_a.cmp(sig_b))
    });
    res
}

/// The fairness precondition gate.
///
/// Returns false when some candidate is ranked first by strictly more
/// than 50% of the voters, or ranked last by strictly more than 40%.
/// The comparisons are the integer forms of the strict real-valued
/// thresholds `n * 0.5` and `n * 0.4`.
pub fn voter_conditions_met(table: &PreferenceTable) -> bool {
    let n = table.num_voters() as u64;
    let mut first_counts: HashMap<CandidateId, u64> = HashMap::new();
    let mut last_counts: HashMap<CandidateId, u64> = HashMap::new();
    for ballot in table.ballots.iter() {
        // Rows have at least one entry by construction.
        *first_counts.entry(ballot[0]).or_insert(0) += 1;
        *last_counts.entry(ballot[ballot.len() - 1]).or_insert(0) += 1;
    }
    debug!(
        "voter_conditions_met: first counts {:?}, last counts {:?}",
        first_counts, last_counts
    );
    if first_counts.values().any(|&count| count * 2 > n) {
        info!("voter_conditions_met: a candidate is the first choice of more than half the voters");
        return false;
    }
    if last_counts.values().any(|&count| count * 5 > n * 2) {
        info!("voter_conditions_met: a candidate is the last choice of more than 40% of the voters");
        return false;
    }
    true
}

/// Plurality rule: the candidate with the most first-rank votes wins.
pub fn plurality(table: &PreferenceTable) -> TallyOutcome {
    let tally = first_choice_tally(table);
    let winner = leading_candidate(&tally);
    debug!("plurality: tally {:?}", tally);
    TallyOutcome {
        winner: table.name(winner).to_string(),
        tally: named_tally(table, &tally),
    }
}

/// Plurality with runoff.
///
/// A first-round leader with a strict majority wins outright and no
/// second round is held. Otherwise the two candidates with the highest
/// first-round tallies advance, and each ballot credits whichever of
/// the two appears first in its ranking.
pub fn plurality_runoff(table: &PreferenceTable) -> RunoffOutcome {
    let n = table.num_voters() as u64;
    let tally = first_choice_tally(table);
    let leader = leading_candidate(&tally);
    let first_round = named_tally(table, &tally);

    // Majority test on the real-valued n / 2: an exactly-50% leader
    // must go to the second round.
    if tally[leader.0 as usize].0 * 2 > n {
        debug!(
            "plurality_runoff: {} holds a strict majority, no second round",
            table.name(leader)
        );
        return RunoffOutcome {
            winner: table.name(leader).to_string(),
            first_round,
            second_round: None,
        };
    }

    // The two highest first-round tallies advance. The sort is stable,
    // so equal counts resolve to the candidate seen first.
    let mut order: Vec<usize> = (0..tally.len()).collect();
    order.sort_by_key(|&idx| Reverse(tally[idx]));
    let finalists: Vec<CandidateId> = order
        .into_iter()
        .filter(|&idx| tally[idx] > VoteCount::EMPTY)
        .take(2)
        .map(|idx| CandidateId(idx as u32))
        .collect();
    if finalists.len() < 2 {
        // Degenerate second round: a single candidate received every
        // first-rank vote.
        return RunoffOutcome {
            winner: table.name(leader).to_string(),
            first_round,
            second_round: None,
        };
    }
    let (c1, c2) = (finalists[0], finalists[1]);

    let mut counts = [VoteCount::EMPTY, VoteCount::EMPTY];
    for ballot in table.ballots.iter() {
        // Exactly one credit per ballot: every row contains both
        // finalists under the permutation precondition.
        for cid in ballot.iter() {
            if *cid == c1 {
                counts[0] += VoteCount(1);
                break;
            }
            if *cid == c2 {
                counts[1] += VoteCount(1);
                break;
            }
        }
    }
    debug!(
        "plurality_runoff: second round {}: {:?}, {}: {:?}",
        table.name(c1),
        counts[0],
        table.name(c2),
        counts[1]
    );

    // Higher second-round count wins; a tie goes to the finalist seen
    // first.
    let winner = match counts[0].cmp(&counts[1]) {
        Ordering::Greater => c1,
        Ordering::Less => c2,
        Ordering::Equal => {
            if c1 < c2 {
                c1
            } else {
                c2
            }
        }
    };
    RunoffOutcome {
        winner: table.name(winner).to_string(),
        first_round,
        second_round: Some(vec![
            (table.name(c1).to_string(), counts[0].0),
            (table.name(c2).to_string(), counts[1].0),
        ]),
    }
}

/// Condorcet rule: pairwise comparison over all candidate pairs.
///
/// A candidate wins iff it pairwise-beats every other candidate, that
/// is, its win count equals m - 1. At most one candidate can, so no
/// tie-break is needed. A pairwise tie awards neither side a win.
pub fn condorcet(table: &PreferenceTable) -> CondorcetOutcome {
    let m = table.num_candidates();
    let n = table.num_voters() as u64;

    // Rank position of every candidate on every ballot. An id absent
    // from a malformed row sorts after every real rank.
    let positions: Vec<Vec<usize>> = table
        .ballots
        .iter()
        .map(|ballot| {
            let mut pos = vec![m; m];
            for (rank, cid) in ballot.iter().enumerate() {
                pos[cid.0 as usize] = rank;
            }
            pos
        })
        .collect();

    let mut wins = vec![0u64; m];
    for i in 0..m {
        for j in (i + 1)..m {
            let votes_i = positions.iter().filter(|pos| pos[i] < pos[j]).count() as u64;
            let votes_j = n - votes_i;
            debug!(
                "condorcet: {} vs {}: {} / {}",
                table.candidates[i], table.candidates[j], votes_i, votes_j
            );
            // Only a strict majority earns the pairwise win.
            if votes_i > votes_j {
                wins[i] += 1;
            } else if votes_j > votes_i {
                wins[j] += 1;
            }
        }
    }

    let mut best = 0usize;
    for (idx, count) in wins.iter().enumerate() {
        if *count > wins[best] {
            best = idx;
        }
    }
    let winner = if wins[best] == (m as u64) - 1 {
        Some(table.candidates[best].clone())
    } else {
        None
    };
    CondorcetOutcome {
        winner,
        pairwise_wins: wins
            .iter()
            .enumerate()
            .map(|(idx, count)| (table.candidates[idx].clone(), *count))
            .collect(),
    }
}

/// Borda count: each ballot awards each candidate its zero-based rank
/// as points, and the lowest total wins.
pub fn borda_count(table: &PreferenceTable) -> TallyOutcome {
    let mut points = vec![VoteCount::EMPTY; table.candidates.len()];
    for ballot in table.ballots.iter() {
        for (rank, cid) in ballot.iter().enumerate() {
            points[cid.0 as usize] += VoteCount(rank as u64);
        }
    }
    debug!("borda_count: points {:?}", points);

    // Lower total is better; ties go to the candidate seen first.
    let mut best = 0usize;
    for (idx, total) in points.iter().enumerate() {
        if *total < points[best] {
            best = idx;
        }
    }
    TallyOutcome {
        winner: table.candidates[best].clone(),
        tally: named_tally(table, &points),
    }
}

/// Runs the full election over one preference table.
///
/// Produces the ballot summary, evaluates the fairness conditions and,
/// only when they hold, the four voting rules. All four rules are pure
/// functions of the table and never observe each other's state.
pub fn run_election(table: &PreferenceTable) -> ElectionReport {
    info!(
        "run_election: processing {} ballots over {} candidates",
        table.num_voters(),
        table.num_candidates()
    );
    for (idx, name) in table.candidate_names().iter().enumerate() {
        info!("Candidate {}: {}", idx + 1, name);
    }

    let summary = ballot_summary(table);
    let conditions_met = voter_conditions_met(table);
    if !conditions_met {
        info!("run_election: fairness conditions not met, skipping the voting rules");
        return ElectionReport {
            num_voters: table.num_voters(),
            num_candidates: table.num_candidates(),
            summary,
            conditions_met,
            outcomes: None,
        };
    }

    let plurality_outcome = plurality(table);
    info!("Winner of Plurality: {}", plurality_outcome.winner);
    let runoff_outcome = plurality_runoff(table);
    info!("Winner of Plurality with Runoff: {}", runoff_outcome.winner);
    let condorcet_outcome = condorcet(table);
    match condorcet_outcome.winner {
        Some(ref winner) => info!("Winner of Condorcet: {}", winner),
        None => info!("No Condorcet winner"),
    }
    let borda_outcome = borda_count(table);
    info!("Winner of Borda Count: {}", borda_outcome.winner);

    ElectionReport {
        num_voters: table.num_voters(),
        num_candidates: table.num_candidates(),
        summary,
        conditions_met,
        outcomes: Some(RuleOutcomes {
            plurality: plurality_outcome,
            runoff: runoff_outcome,
            condorcet: condorcet_outcome,
            borda: borda_outcome,
        }),
    }
}
