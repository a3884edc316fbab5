//! Pure rules of the vote ledger and research resolution.
//!
//! Nothing in here touches storage: the database layer reads the current
//! state, asks these functions what to do, and applies the answer inside a
//! single transaction.

use serde::Serialize;

use crate::models::{MythStatus, ResearchStatus, Tally, VoteType};

// -- Vote ledger --

/// What a cast vote did to the caller's stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    Recorded,
    Removed,
}

impl VoteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            VoteOutcome::Recorded => "vote recorded",
            VoteOutcome::Removed => "vote removed",
        }
    }
}

/// Row-level change the ledger applies for one cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    Insert(VoteType),
    Delete(VoteType),
    Flip { from: VoteType, to: VoteType },
}

impl VoteChange {
    /// Decide the change from the caller's existing vote, if any.
    pub fn plan(existing: Option<VoteType>, requested: VoteType) -> Self {
        match existing {
            None => VoteChange::Insert(requested),
            Some(current) if current == requested => VoteChange::Delete(current),
            Some(current) => VoteChange::Flip { from: current, to: requested },
        }
    }

    pub fn outcome(&self) -> VoteOutcome {
        match self {
            VoteChange::Delete(_) => VoteOutcome::Removed,
            VoteChange::Insert(_) | VoteChange::Flip { .. } => VoteOutcome::Recorded,
        }
    }

    /// Counter deltas for this change.
    pub fn delta(&self) -> TallyDelta {
        match *self {
            VoteChange::Insert(t) => TallyDelta::one(t, 1).with_total(1),
            VoteChange::Delete(t) => TallyDelta::one(t, -1).with_total(-1),
            VoteChange::Flip { from, to } => {
                let mut delta = TallyDelta::one(from, -1);
                delta.add(TallyDelta::one(to, 1));
                delta
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallyDelta {
    pub upvotes: i64,
    pub downvotes: i64,
    pub total_votes: i64,
}

impl TallyDelta {
    fn one(vote_type: VoteType, n: i64) -> Self {
        match vote_type {
            VoteType::Upvote => TallyDelta { upvotes: n, ..Default::default() },
            VoteType::Downvote => TallyDelta { downvotes: n, ..Default::default() },
        }
    }

    fn with_total(mut self, n: i64) -> Self {
        self.total_votes = n;
        self
    }

    fn add(&mut self, other: TallyDelta) {
        self.upvotes += other.upvotes;
        self.downvotes += other.downvotes;
        self.total_votes += other.total_votes;
    }
}

impl Tally {
    pub fn apply(&mut self, delta: TallyDelta) {
        self.upvotes += delta.upvotes;
        self.downvotes += delta.downvotes;
        self.total_votes += delta.total_votes;
    }

    /// `total_votes == upvotes + downvotes` and nothing negative.
    pub fn is_consistent(&self) -> bool {
        self.upvotes >= 0
            && self.downvotes >= 0
            && self.total_votes == self.upvotes + self.downvotes
    }
}

// -- Research resolution --

/// Why a research transition was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
}

impl ResearchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResearchStatus::Completed | ResearchStatus::Rejected)
    }
}

/// Guard for `assign`. Re-assigning to the current assignee is allowed.
pub fn check_assign(
    status: ResearchStatus,
    assigned_to: Option<i64>,
    user_id: i64,
) -> Result<(), TransitionError> {
    if status.is_terminal() {
        return Err(TransitionError::Conflict(format!(
            "research request is already {status}"
        )));
    }
    match assigned_to {
        Some(current) if current != user_id => Err(TransitionError::Conflict(
            "This research request is already assigned to someone else.".into(),
        )),
        _ => Ok(()),
    }
}

/// Guard for `complete`: only the assignee or staff, and only from a live state.
pub fn check_complete(
    status: ResearchStatus,
    assigned_to: Option<i64>,
    caller_id: i64,
    caller_is_staff: bool,
) -> Result<(), TransitionError> {
    if assigned_to != Some(caller_id) && !caller_is_staff {
        return Err(TransitionError::Forbidden(
            "You are not authorized to complete this research request.".into(),
        ));
    }
    if status.is_terminal() {
        return Err(TransitionError::Conflict(format!(
            "research request is already {status}"
        )));
    }
    Ok(())
}

/// Guard for a staff status edit. Only `rejected` can be set this way.
pub fn check_status_edit(
    current: ResearchStatus,
    requested: ResearchStatus,
) -> Result<(), TransitionError> {
    if current == requested {
        return Ok(());
    }
    if current.is_terminal() {
        return Err(TransitionError::Conflict(format!(
            "research request is already {current}"
        )));
    }
    if requested != ResearchStatus::Rejected {
        return Err(TransitionError::Conflict(format!(
            "status can only be set to rejected directly, not {requested}"
        )));
    }
    Ok(())
}

/// Classify free-text findings. "verified" is checked before "debunked".
pub fn derive_myth_status(findings: &str) -> MythStatus {
    let findings = findings.to_lowercase();
    if findings.contains("verified") {
        MythStatus::Verified
    } else if findings.contains("debunked") {
        MythStatus::Debunked
    } else {
        MythStatus::Inconclusive
    }
}
