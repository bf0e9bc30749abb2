//! Inbound action vocabulary, decoded from the wire envelope.

use super::value_object::PlayerId;

/// Ballot entry: a player or an explicit abstention.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoteTarget {
    Skip,
    Player(PlayerId),
}

impl VoteTarget {
    pub const SKIP: &'static str = "skip";

    /// Parse a raw `targetId`. Blank ids are not a valid ballot.
    pub fn parse(raw: String) -> Option<Self> {
        if raw == Self::SKIP {
            return Some(VoteTarget::Skip);
        }
        PlayerId::new(raw).ok().map(VoteTarget::Player)
    }

    pub fn as_str(&self) -> &str {
        match self {
            VoteTarget::Skip => Self::SKIP,
            VoteTarget::Player(id) => id.as_str(),
        }
    }
}

/// Actions a bound connection submits to its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    StartGame,
    CodeUpdate { code: String },
    CallMeeting,
    CastVote { target: VoteTarget },
    ChatMessage { message: String },
    SubmitTask { passed: bool },
}

/// Everything a connection may ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    CreateRoom { player_name: String },
    JoinRoom { room_code: String, player_name: String },
    Room(PlayerAction),
}
