use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// What kind of content a vote lands on. Closed set: anything else is
/// rejected at the boundary before storage is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }

    /// Table that carries the denormalized score for this kind.
    pub fn content_table(&self) -> &'static str {
        match self {
            TargetKind::Post => "posts",
            TargetKind::Comment => "comments",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(TargetKind::Post),
            "comment" => Ok(TargetKind::Comment),
            other => Err(AppError::BadRequest(format!(
                "Unsupported target kind: {}",
                other
            ))),
        }
    }
}

/// Direction of a vote. Stored as SMALLINT (+1/-1) in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum Polarity {
    Up = 1,
    Down = -1,
}

impl Polarity {
    /// Signed contribution of this polarity to a target's score.
    pub fn score_value(&self) -> i64 {
        match self {
            Polarity::Up => 1,
            Polarity::Down => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Up => "up",
            Polarity::Down => "down",
        }
    }
}

impl TryFrom<i16> for Polarity {
    type Error = AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Polarity::Up),
            -1 => Ok(Polarity::Down),
            other => Err(AppError::Internal(format!(
                "Invalid polarity value in storage: {}",
                other
            ))),
        }
    }
}

/// A user's current stance on a target. Absence of a vote row is `NoVote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteState {
    #[serde(rename = "none")]
    NoVote,
    #[serde(rename = "up")]
    Upvoted,
    #[serde(rename = "down")]
    Downvoted,
}

impl VoteState {
    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            VoteState::NoVote => None,
            VoteState::Upvoted => Some(Polarity::Up),
            VoteState::Downvoted => Some(Polarity::Down),
        }
    }
}

impl From<Option<Polarity>> for VoteState {
    fn from(polarity: Option<Polarity>) -> Self {
        match polarity {
            None => VoteState::NoVote,
            Some(Polarity::Up) => VoteState::Upvoted,
            Some(Polarity::Down) => VoteState::Downvoted,
        }
    }
}

/// Identifies one piece of voteable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: Uuid,
}

impl TargetRef {
    pub fn post(id: Uuid) -> Self {
        Self {
            kind: TargetKind::Post,
            id,
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            kind: TargetKind::Comment,
            id,
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// Vote request
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub polarity: Polarity,
}

// Vote response
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub user_vote: VoteState,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_kind_parses_known_kinds() {
        assert_eq!("post".parse::<TargetKind>().unwrap(), TargetKind::Post);
        assert_eq!(
            "comment".parse::<TargetKind>().unwrap(),
            TargetKind::Comment
        );
    }

    #[test]
    fn target_kind_rejects_unknown_kind() {
        let err = "user".parse::<TargetKind>().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn polarity_round_trips_through_storage_repr() {
        assert_eq!(Polarity::try_from(Polarity::Up as i16).unwrap(), Polarity::Up);
        assert_eq!(
            Polarity::try_from(Polarity::Down as i16).unwrap(),
            Polarity::Down
        );
        assert!(Polarity::try_from(0).is_err());
    }

    #[test]
    fn polarity_deserializes_from_request_body() {
        let req: VoteRequest = serde_json::from_str(r#"{"polarity": "down"}"#).unwrap();
        assert_eq!(req.polarity, Polarity::Down);

        assert!(serde_json::from_str::<VoteRequest>(r#"{"polarity": "sideways"}"#).is_err());
    }

    #[test]
    fn vote_state_serializes_as_direction() {
        assert_eq!(
            serde_json::to_string(&VoteState::NoVote).unwrap(),
            r#""none""#
        );
        assert_eq!(serde_json::to_string(&VoteState::Upvoted).unwrap(), r#""up""#);
        assert_eq!(
            serde_json::to_string(&VoteState::Downvoted).unwrap(),
            r#""down""#
        );
    }
}
