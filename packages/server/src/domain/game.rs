//! Authoritative per-room game state machine.
//!
//! `GameSession` is pure: it never touches channels, timers or the clock.
//! Every method re-checks the current phase and the caller's membership and
//! returns `None` when the action does not apply, so the caller can ignore it
//! silently. Validated failures are returned as [`GameError`].

use std::collections::{HashMap, VecDeque};

use rand::Rng;

use super::{
    action::VoteTarget,
    entity::{EditRecord, PLAYER_COLORS, Player, Role, Task, Winner},
    error::GameError,
    tally::{self, Verdict, tally_votes},
    value_object::{PlayerId, Timestamp},
};

/// Roster size required to start, and the cap on joins.
pub const MAX_PLAYERS: usize = 4;

const _: () = assert!(PLAYER_COLORS.len() >= MAX_PLAYERS);

/// Number of edits kept in the history.
pub const EDIT_HISTORY_LIMIT: usize = 50;

/// Phase of a room: lobby → playing ⇄ voting → ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    Playing,
    Voting,
    Ended,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Lobby => "lobby",
            GamePhase::Playing => "playing",
            GamePhase::Voting => "voting",
            GamePhase::Ended => "ended",
        }
    }
}

/// Clock lengths, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub game_seconds: u32,
    pub voting_seconds: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            game_seconds: 180,
            voting_seconds: 60,
        }
    }
}

/// Ballots cast so far against the number of players allowed to vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteProgress {
    pub voted: usize,
    pub total: usize,
}

impl VoteProgress {
    pub fn is_complete(&self) -> bool {
        self.voted >= self.total
    }
}

/// Result of counting the ballots of one meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct TallyResult {
    pub ejected: Option<Player>,
    pub was_impostor: bool,
    /// Raw ballots, voter → target.
    pub votes: Vec<(PlayerId, VoteTarget)>,
}

/// Everything revealed when a game ends.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub winner: Winner,
    pub reason: String,
    pub impostor: Option<Player>,
    /// Full roster with roles.
    pub players: Vec<Player>,
}

/// What happens once the post-tally reveal delay elapses.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ended(GameOutcome),
    Resumed { time_remaining: u32 },
}

/// Outcome of a `submit-task` during play.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Passed(GameOutcome),
    Failed,
}

/// One second of a phase clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub time_remaining: u32,
}

impl ClockTick {
    pub fn expired(&self) -> bool {
        self.time_remaining == 0
    }
}

#[derive(Debug, Clone)]
pub struct GameSession {
    rules: GameRules,
    phase: GamePhase,
    /// Join order.
    roster: Vec<Player>,
    task: Option<Task>,
    code: String,
    edit_history: VecDeque<EditRecord>,
    votes: HashMap<PlayerId, VoteTarget>,
    time_remaining: u32,
    voting_time_remaining: u32,
    /// Set between a tally and its resolution; the room stays in `voting`.
    tally_pending: bool,
}

impl GameSession {
    pub fn new(rules: GameRules) -> Self {
        Self {
            rules,
            phase: GamePhase::Lobby,
            roster: Vec::with_capacity(MAX_PLAYERS),
            task: None,
            code: String::new(),
            edit_history: VecDeque::with_capacity(EDIT_HISTORY_LIMIT),
            votes: HashMap::new(),
            time_remaining: rules.game_seconds,
            voting_time_remaining: rules.voting_seconds,
            tally_pending: false,
        }
    }

    pub fn rules(&self) -> GameRules {
        self.rules
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.roster
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.roster.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn alive_count(&self) -> usize {
        self.roster.iter().filter(|p| p.is_alive).count()
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn edit_history(&self) -> impl Iterator<Item = &EditRecord> {
        self.edit_history.iter()
    }

    pub fn edit_count(&self) -> usize {
        self.edit_history.len()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn voting_time_remaining(&self) -> u32 {
        self.voting_time_remaining
    }

    pub fn is_tally_pending(&self) -> bool {
        self.tally_pending
    }

    /// Add a player in the lobby. Re-adding a present id returns the existing record.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<Player, GameError> {
        if let Some(existing) = self.player(&id) {
            return Ok(existing.clone());
        }
        if self.roster.len() >= MAX_PLAYERS {
            return Err(GameError::RoomFull);
        }
        if self.phase != GamePhase::Lobby {
            return Err(GameError::GameInProgress);
        }

        let color = self.free_color().ok_or(GameError::RoomFull)?;
        let player = Player::new(id, name, color);
        self.roster.push(player.clone());
        Ok(player)
    }

    /// First palette colour no current member wears. The palette has at least
    /// `MAX_PLAYERS` entries, so a roster with room left always has one.
    fn free_color(&self) -> Option<&'static str> {
        PLAYER_COLORS
            .iter()
            .copied()
            .find(|color| !self.roster.iter().any(|p| p.color == *color))
    }

    /// Remove a player and withdraw their ballot. Absent ids are a no-op.
    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let index = self.roster.iter().position(|p| &p.id == id)?;
        self.votes.remove(id);
        Some(self.roster.remove(index))
    }

    pub fn ensure_startable(&self) -> Result<(), GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(GameError::GameInProgress);
        }
        if self.roster.len() < MAX_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        Ok(())
    }

    /// Deal roles and move to `playing`. Returns the impostor's id.
    pub fn start<R: Rng>(&mut self, task: Task, rng: &mut R) -> Result<PlayerId, GameError> {
        self.ensure_startable()?;

        let impostor_index = rng.random_range(0..self.roster.len());
        for (index, player) in self.roster.iter_mut().enumerate() {
            player.role = if index == impostor_index {
                Role::Impostor
            } else {
                Role::Engineer
            };
            player.is_alive = true;
        }

        self.code = task.starter_code.clone();
        self.task = Some(task);
        self.phase = GamePhase::Playing;
        self.time_remaining = self.rules.game_seconds;
        self.edit_history.clear();
        self.votes.clear();
        self.tally_pending = false;

        Ok(self.roster[impostor_index].id.clone())
    }

    /// Replace the shared buffer and log the edit.
    pub fn update_code(
        &mut self,
        editor: &PlayerId,
        code: String,
        at: Timestamp,
    ) -> Option<EditRecord> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let player = self.player(editor)?;

        let record = EditRecord {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            timestamp: at,
            char_diff: char_len(&code) - char_len(&self.code),
        };
        self.code = code;

        self.edit_history.push_back(record.clone());
        while self.edit_history.len() > EDIT_HISTORY_LIMIT {
            self.edit_history.pop_front();
        }
        Some(record)
    }

    /// Open a meeting. Returns the caller's display name.
    pub fn call_meeting(&mut self, caller: &PlayerId) -> Option<String> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let name = self.player(caller)?.name.clone();

        self.phase = GamePhase::Voting;
        self.votes.clear();
        self.voting_time_remaining = self.rules.voting_seconds;
        self.tally_pending = false;
        Some(name)
    }

    fn accepts_votes(&self) -> bool {
        self.phase == GamePhase::Voting && !self.tally_pending
    }

    /// Record a ballot from an alive member. Any target is accepted; only an
    /// alive member can be ejected by the tally.
    pub fn cast_vote(&mut self, voter: &PlayerId, target: VoteTarget) -> Option<VoteProgress> {
        if !self.accepts_votes() {
            return None;
        }
        if !self.player(voter)?.is_alive {
            return None;
        }

        self.votes.insert(voter.clone(), target);
        Some(self.vote_progress())
    }

    pub fn vote_progress(&self) -> VoteProgress {
        VoteProgress {
            voted: self.votes.len(),
            total: self.alive_count(),
        }
    }

    /// Whether an open meeting already holds a ballot from every alive player.
    pub fn all_votes_in(&self) -> bool {
        self.accepts_votes() && self.vote_progress().is_complete()
    }

    /// Count the ballots and apply the ejection. The room stays in `voting`
    /// until [`GameSession::resolve_tally`].
    pub fn tally(&mut self) -> Option<TallyResult> {
        if !self.accepts_votes() {
            return None;
        }
        self.tally_pending = true;

        let ejected_id = tally_votes(self.votes.values(), self.alive_count());
        let ejected = ejected_id.and_then(|id| {
            let player = self.roster.iter_mut().find(|p| p.id == id && p.is_alive)?;
            player.is_alive = false;
            Some(player.clone())
        });

        let mut votes: Vec<(PlayerId, VoteTarget)> = self
            .votes
            .iter()
            .map(|(voter, target)| (voter.clone(), target.clone()))
            .collect();
        votes.sort_by(|a, b| a.0.cmp(&b.0));

        Some(TallyResult {
            was_impostor: ejected.as_ref().is_some_and(Player::is_impostor),
            ejected,
            votes,
        })
    }

    pub fn check_win_condition(&self) -> Option<Verdict> {
        let alive = self.roster.iter().filter(|p| p.is_alive);
        let (impostors, engineers) = alive.fold((0, 0), |(i, e), p| {
            if p.is_impostor() { (i + 1, e) } else { (i, e + 1) }
        });
        tally::check_win_condition(impostors, engineers)
    }

    /// Finish a pending tally: end the game or resume the game clock where it stopped.
    pub fn resolve_tally(&mut self) -> Option<Resolution> {
        if self.phase != GamePhase::Voting || !self.tally_pending {
            return None;
        }
        self.tally_pending = false;

        match self.check_win_condition() {
            Some(verdict) => self
                .end(verdict.winner, verdict.reason)
                .map(Resolution::Ended),
            None => {
                self.phase = GamePhase::Playing;
                Some(Resolution::Resumed {
                    time_remaining: self.time_remaining,
                })
            }
        }
    }

    /// Handle a grading result supplied by the submitter's client.
    pub fn submit_task(&mut self, submitter: &PlayerId, passed: bool) -> Option<Submission> {
        if self.phase != GamePhase::Playing || !self.contains(submitter) {
            return None;
        }
        if !passed {
            return Some(Submission::Failed);
        }
        self.end(
            Winner::Engineers,
            "Task completed successfully! All tests passed! 🎉",
        )
        .map(Submission::Passed)
    }

    /// Move to `ended` and reveal every role.
    pub fn end(&mut self, winner: Winner, reason: &str) -> Option<GameOutcome> {
        if matches!(self.phase, GamePhase::Lobby | GamePhase::Ended) {
            return None;
        }
        self.phase = GamePhase::Ended;
        self.tally_pending = false;

        Some(GameOutcome {
            winner,
            reason: reason.to_string(),
            impostor: self.roster.iter().find(|p| p.is_impostor()).cloned(),
            players: self.roster.clone(),
        })
    }

    pub fn tick_game_clock(&mut self) -> Option<ClockTick> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        Some(ClockTick {
            time_remaining: self.time_remaining,
        })
    }

    pub fn tick_voting_clock(&mut self) -> Option<ClockTick> {
        if !self.accepts_votes() {
            return None;
        }
        self.voting_time_remaining = self.voting_time_remaining.saturating_sub(1);
        Some(ClockTick {
            time_remaining: self.voting_time_remaining,
        })
    }

    /// Alive member allowed to chat.
    pub fn chat_sender(&self, id: &PlayerId) -> Option<&Player> {
        self.player(id).filter(|p| p.is_alive)
    }
}

fn char_len(text: &str) -> i64 {
    i64::try_from(text.chars().count()).unwrap_or(i64::MAX)
}
