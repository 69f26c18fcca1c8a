//! Status derivation rules.
//!
//! The status of an opportunity is recomputed from scratch on every run from
//! its dates, its participant counts and the current time. Nothing here does
//! I/O; the sync feeds records through these functions and persists the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SyncError;
use super::models::{Learn2Earn, Learn2EarnStatus};
use crate::common::timestamp::parse_optional;

/// What to do with a record whose stored status is already `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// `completed` is final. The sync never moves a record out of it.
    #[default]
    Terminal,
    /// Every record follows its derived status, including reopening.
    Rederive,
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionPolicy::Terminal => write!(f, "terminal"),
            CompletionPolicy::Rederive => write!(f, "rederive"),
        }
    }
}

impl FromStr for CompletionPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminal" => Ok(CompletionPolicy::Terminal),
            "rederive" => Ok(CompletionPolicy::Rederive),
            other => Err(SyncError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Outcome of comparing a stored status with the derived one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Change {
        from: Learn2EarnStatus,
        to: Learn2EarnStatus,
    },
    /// A reopening that the completion policy refused.
    HeldTerminal { derived: Learn2EarnStatus },
}

/// Compute the lifecycle status of an opportunity at `now`.
///
/// First match wins:
/// 1. not started yet -> `draft`
/// 2. past the end date, or participant cap reached -> `completed`
/// 3. started, not past the end date, below the cap -> `active`
/// 4. anything else (e.g. no usable start date) -> `draft`
///
/// Dates that fail to parse count as absent. A participant cap of zero or
/// less counts as no cap.
pub fn derive_status(opportunity: &Learn2Earn, now: DateTime<Utc>) -> Learn2EarnStatus {
    let start = parse_optional(opportunity.start_date.as_deref());
    let end = parse_optional(opportunity.end_date.as_deref());
    let cap = opportunity.max_participants.filter(|max| *max > 0);
    let total = opportunity.total_participants;

    if matches!(start, Some(start) if now < start) {
        return Learn2EarnStatus::Draft;
    }

    let ended = matches!(end, Some(end) if now > end);
    let full = matches!(cap, Some(max) if total >= max);
    if ended || full {
        return Learn2EarnStatus::Completed;
    }

    // Past the two checks above, a present start is <= now, a present end is
    // >= now and a present cap is not reached.
    if start.is_some() {
        return Learn2EarnStatus::Active;
    }

    Learn2EarnStatus::Draft
}

/// Decide whether `stored` should become `derived` under `policy`.
pub fn resolve_transition(
    stored: Learn2EarnStatus,
    derived: Learn2EarnStatus,
    policy: CompletionPolicy,
) -> Transition {
    if stored == derived {
        return Transition::Unchanged;
    }

    if stored == Learn2EarnStatus::Completed && policy == CompletionPolicy::Terminal {
        return Transition::HeldTerminal { derived };
    }

    Transition::Change {
        from: stored,
        to: derived,
    }
}
