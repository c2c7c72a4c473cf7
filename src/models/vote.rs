//! Vote model and the per-(user, target) vote state machine.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Direction of a stored vote. Neutral is represented by the absence of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }

    pub fn from_stored(value: i64) -> Option<Self> {
        match value {
            1 => Some(VoteValue::Up),
            -1 => Some(VoteValue::Down),
            _ => None,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        VoteValue::from_stored(value)
            .ok_or_else(|| AppError::Validation("Vote value must be 1 or -1".to_string()))
    }
}

/// Something that can be voted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteTarget {
    Post(String),
    Comment(String),
}

impl VoteTarget {
    /// Build a target from a pair of optional ids; exactly one must be set.
    pub fn from_parts(
        post_id: Option<String>,
        comment_id: Option<String>,
    ) -> Result<Self, AppError> {
        let post_id = post_id.filter(|id| !id.trim().is_empty());
        let comment_id = comment_id.filter(|id| !id.trim().is_empty());
        match (post_id, comment_id) {
            (Some(id), None) => Ok(VoteTarget::Post(id)),
            (None, Some(id)) => Ok(VoteTarget::Comment(id)),
            _ => Err(AppError::Validation(
                "Exactly one of postId or commentId is required".to_string(),
            )),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            VoteTarget::Post(id) | VoteTarget::Comment(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VoteTarget::Post(_) => "post",
            VoteTarget::Comment(_) => "comment",
        }
    }
}

/// What the ledger must do to move from the stored state to the requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No row existed; store one.
    Insert(VoteValue),
    /// Same direction clicked again; delete the row.
    Remove,
    /// Opposite direction clicked; overwrite the stored value.
    Flip(VoteValue),
}

impl VoteTransition {
    /// Resolve the transition for `current` stored state and a `requested` click.
    pub fn resolve(current: Option<VoteValue>, requested: VoteValue) -> Self {
        match current {
            None => VoteTransition::Insert(requested),
            Some(existing) if existing == requested => VoteTransition::Remove,
            Some(_) => VoteTransition::Flip(requested),
        }
    }

    /// State after the transition is applied.
    pub fn next_state(self) -> Option<VoteValue> {
        match self {
            VoteTransition::Insert(v) | VoteTransition::Flip(v) => Some(v),
            VoteTransition::Remove => None,
        }
    }
}

/// Wire value for an optional vote: 1, -1, or 0 for neutral.
pub fn vote_state_value(state: Option<VoteValue>) -> i64 {
    state.map(VoteValue::as_i64).unwrap_or(0)
}

/// Request body for voting on a known target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub value: i64,
}

/// Request body for voting with an explicit target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastTargetVoteRequest {
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub comment_id: Option<String>,
    pub value: i64,
}

/// Aggregated vote counts for a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

/// Outcome of a cast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResult {
    pub previous_value: i64,
    pub new_value: i64,
    pub new_score: i64,
    pub upvotes: i64,
    pub downvotes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsing() {
        assert_eq!(VoteValue::try_from(1).unwrap(), VoteValue::Up);
        assert_eq!(VoteValue::try_from(-1).unwrap(), VoteValue::Down);
        for bad in [0, 2, -2, i64::MAX] {
            assert!(matches!(
                VoteValue::try_from(bad),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_state_machine_table() {
        use VoteValue::{Down, Up};

        let cases = [
            (None, Up, VoteTransition::Insert(Up), Some(Up)),
            (None, Down, VoteTransition::Insert(Down), Some(Down)),
            (Some(Up), Up, VoteTransition::Remove, None),
            (Some(Up), Down, VoteTransition::Flip(Down), Some(Down)),
            (Some(Down), Down, VoteTransition::Remove, None),
            (Some(Down), Up, VoteTransition::Flip(Up), Some(Up)),
        ];

        for (current, requested, transition, next) in cases {
            let resolved = VoteTransition::resolve(current, requested);
            assert_eq!(resolved, transition);
            assert_eq!(resolved.next_state(), next);
        }
    }

    #[test]
    fn test_repeated_clicks_alternate() {
        let mut state = None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            state = VoteTransition::resolve(state, VoteValue::Up).next_state();
            seen.push(vote_state_value(state));
        }
        assert_eq!(seen, vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_target_requires_exactly_one_id() {
        assert_eq!(
            VoteTarget::from_parts(Some("p".into()), None).unwrap(),
            VoteTarget::Post("p".into())
        );
        assert_eq!(
            VoteTarget::from_parts(None, Some("c".into())).unwrap(),
            VoteTarget::Comment("c".into())
        );
        assert!(VoteTarget::from_parts(None, None).is_err());
        assert!(VoteTarget::from_parts(Some("p".into()), Some("c".into())).is_err());
        assert!(VoteTarget::from_parts(Some("  ".into()), None).is_err());
    }

    #[test]
    fn test_tally_score() {
        let tally = VoteTally {
            upvotes: 3,
            downvotes: 5,
        };
        assert_eq!(tally.score(), -2);
    }
}
