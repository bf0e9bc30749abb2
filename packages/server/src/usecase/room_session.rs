//! UseCase: ルームセッション
//!
//! One task per room. The task owns the [`GameSession`] and the room's
//! [`MessagePusher`], drains the room's command queue one command at a time
//! and is therefore the only writer of the room's state. Handling a command
//! never waits on I/O: outbound frames go into bounded per-connection queues
//! with `try_send`, and members whose queue refuses a frame are evicted.

use std::sync::Arc;

use lgtm_shared::time::Clock;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{
    ClockKind, GameError, GameEvent, GameSession, MessagePushError, MessagePusher, PlayerAction,
    PlayerId, PusherChannel, Resolution, RoomCode, RoomCommand, RoomHandle, RoomSnapshot,
    Submission, TaskProvider, Timestamp, VoteTarget, Winner,
};

use super::{config::GameConfig, hub::Hub, ticker::Ticker};

const TIME_UP_REASON: &str = "Time ran out!";
const TASK_FAILED_MESSAGE: &str = "Tests failed! Fix the code and try again.";

pub struct RoomSession {
    code: RoomCode,
    created_at: Timestamp,
    game: GameSession,
    pusher: Box<dyn MessagePusher>,
    tasks: Arc<dyn TaskProvider>,
    clock: Arc<dyn Clock>,
    hub: Hub,
    config: GameConfig,
    /// Weak so that clocks and reveal timers never keep the room alive.
    mailbox: mpsc::WeakSender<RoomCommand>,
    ticker: Option<Ticker>,
    next_ticker_id: u64,
    tally_round: u64,
    /// Set by the first accepted join. An opened room closes when it empties.
    opened: bool,
}

impl RoomSession {
    pub fn new(
        handle: &RoomHandle,
        hub: Hub,
        pusher: Box<dyn MessagePusher>,
        tasks: Arc<dyn TaskProvider>,
        clock: Arc<dyn Clock>,
        config: GameConfig,
    ) -> Self {
        Self {
            code: handle.code().clone(),
            created_at: handle.created_at(),
            game: GameSession::new(config.rules),
            pusher,
            tasks,
            clock,
            hub,
            config,
            mailbox: handle.downgrade(),
            ticker: None,
            next_ticker_id: 0,
            tally_round: 0,
            opened: false,
        }
    }

    /// Drain the room's queue until the roster empties.
    pub async fn run(mut self, mut commands: mpsc::Receiver<RoomCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
            if self.opened && self.game.is_empty() {
                break;
            }
        }

        self.stop_ticker();
        // Pending joins see their reply dropped and report the room as gone.
        drop(commands);
        tracing::info!("Room {} closed", self.code);
        self.hub.room_closed(self.code.clone());
    }

    fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                player_id,
                player_name,
                sender,
                creator,
                reply,
            } => self.on_join(player_id, player_name, sender, creator, reply),
            RoomCommand::Leave { player_id } => self.on_leave(&player_id),
            RoomCommand::Action { player_id, action } => self.on_action(&player_id, action),
            RoomCommand::Tick { clock, ticker_id } => self.on_tick(clock, ticker_id),
            RoomCommand::ResolveTally { round } => self.on_resolve_tally(round),
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }

        // A leave, an eviction or the last ballot can each complete the vote.
        if !self.game.is_empty() && self.game.all_votes_in() {
            self.run_tally();
        }
    }

    fn on_join(
        &mut self,
        player_id: PlayerId,
        player_name: String,
        sender: PusherChannel,
        creator: bool,
        reply: oneshot::Sender<Result<(), GameError>>,
    ) {
        let player = match self.game.add_player(player_id.clone(), player_name) {
            Ok(player) => player,
            Err(e) => {
                tracing::debug!("Room {} rejected '{}': {}", self.code, player_id, e);
                let _ = reply.send(Err(e));
                return;
            }
        };
        self.opened = true;

        if reply.send(Ok(())).is_err() {
            tracing::debug!("'{}' left before joining room {}", player_id, self.code);
            self.game.remove_player(&player_id);
            return;
        }

        self.pusher.register_client(player_id.clone(), sender);
        tracing::info!(
            "{} joined room {} ({} players)",
            player.name,
            self.code,
            self.game.len()
        );

        let players = self.game.players().to_vec();
        let room_code = self.code.clone();
        let event = if creator {
            GameEvent::RoomCreated {
                room_code,
                player,
                players,
            }
        } else {
            GameEvent::RoomJoined {
                room_code,
                player,
                players,
            }
        };
        self.send_to(&player_id, &event);

        if !creator {
            self.broadcast_player_list();
        }
    }

    fn on_leave(&mut self, player_id: &PlayerId) {
        let Some(player) = self.game.remove_player(player_id) else {
            return;
        };
        self.pusher.unregister_client(player_id);
        tracing::info!("{} left room {}", player.name, self.code);
        self.broadcast_player_list();
    }

    fn on_action(&mut self, player_id: &PlayerId, action: PlayerAction) {
        if !self.game.contains(player_id) {
            tracing::debug!("Ignoring action from non-member '{}'", player_id);
            return;
        }

        match action {
            PlayerAction::StartGame => self.start_game(player_id),
            PlayerAction::CodeUpdate { code } => self.update_code(player_id, code),
            PlayerAction::CallMeeting => self.call_meeting(player_id),
            PlayerAction::CastVote { target } => self.cast_vote(player_id, target),
            PlayerAction::ChatMessage { message } => self.chat(player_id, message),
            PlayerAction::SubmitTask { passed } => self.submit_task(player_id, passed),
        }
    }

    fn start_game(&mut self, initiator: &PlayerId) {
        match self.game.ensure_startable() {
            Ok(()) => {}
            Err(GameError::GameInProgress) => return,
            Err(e) => {
                self.send_to(initiator, &GameEvent::error(e));
                return;
            }
        }

        let Some(task) = self.tasks.pick_random_task() else {
            tracing::error!("No tasks loaded, room {} cannot start", self.code);
            self.send_to(initiator, &GameEvent::error(GameError::NoTasksAvailable));
            return;
        };

        let impostor = match self.game.start(task, &mut rand::rng()) {
            Ok(impostor) => impostor,
            Err(e) => {
                self.send_to(initiator, &GameEvent::error(e));
                return;
            }
        };
        tracing::info!("Game started in room {}", self.code);
        tracing::debug!("Room {} impostor: '{}'", self.code, impostor);

        let Some(task) = self.game.task().cloned() else {
            return;
        };
        let players = self.game.players().to_vec();
        let time_limit = self.game.rules().game_seconds;
        for player in &players {
            let event = GameEvent::GameStarted {
                role: player.role,
                task: task.clone(),
                time_limit,
                players: players.clone(),
            };
            self.send_to(&player.id, &event);
        }

        self.start_ticker(ClockKind::Game);
    }

    fn update_code(&mut self, editor: &PlayerId, code: String) {
        let at = self.now();
        if self.game.update_code(editor, code, at).is_none() {
            return;
        }
        let Some(editor) = self.game.player(editor).cloned() else {
            return;
        };
        let event = GameEvent::CodeUpdated {
            code: self.game.code().to_string(),
            editor,
        };
        self.broadcast(&event);
    }

    fn call_meeting(&mut self, caller: &PlayerId) {
        let Some(caller) = self.game.call_meeting(caller) else {
            return;
        };
        self.stop_ticker();
        tracing::info!("{} called a meeting in room {}", caller, self.code);

        let event = GameEvent::MeetingCalled {
            caller,
            edit_history: self.game.edit_history().cloned().collect(),
            players: self.game.players().to_vec(),
        };
        self.broadcast(&event);
        self.start_ticker(ClockKind::Voting);
    }

    fn cast_vote(&mut self, voter: &PlayerId, target: VoteTarget) {
        if let Some(progress) = self.game.cast_vote(voter, target) {
            self.broadcast(&GameEvent::VoteCast { progress });
        }
    }

    fn chat(&mut self, sender: &PlayerId, message: String) {
        let Some(player) = self.game.chat_sender(sender).cloned() else {
            return;
        };
        let event = GameEvent::ChatMessage {
            player,
            message,
            timestamp: self.now(),
        };
        self.broadcast(&event);
    }

    fn submit_task(&mut self, submitter: &PlayerId, passed: bool) {
        match self.game.submit_task(submitter, passed) {
            Some(Submission::Passed(outcome)) => {
                self.stop_ticker();
                tracing::info!("Task passed in room {}", self.code);
                self.broadcast(&GameEvent::GameEnded { outcome });
            }
            Some(Submission::Failed) => {
                let event = GameEvent::TaskFailed {
                    message: TASK_FAILED_MESSAGE.to_string(),
                };
                self.send_to(submitter, &event);
            }
            None => {}
        }
    }

    fn on_tick(&mut self, clock: ClockKind, ticker_id: u64) {
        if self.ticker.as_ref().map(Ticker::id) != Some(ticker_id) {
            tracing::trace!("Dropping stale tick #{} in room {}", ticker_id, self.code);
            return;
        }

        match clock {
            ClockKind::Game => {
                let Some(tick) = self.game.tick_game_clock() else {
                    return;
                };
                self.broadcast(&GameEvent::TimeUpdate {
                    time_remaining: tick.time_remaining,
                });
                if tick.expired() {
                    self.finish(Winner::Impostor, TIME_UP_REASON);
                }
            }
            ClockKind::Voting => {
                let Some(tick) = self.game.tick_voting_clock() else {
                    return;
                };
                self.broadcast(&GameEvent::VotingTimeUpdate {
                    time_remaining: tick.time_remaining,
                });
                if tick.expired() {
                    self.run_tally();
                }
            }
        }
    }

    fn run_tally(&mut self) {
        self.stop_ticker();
        let Some(result) = self.game.tally() else {
            return;
        };
        match &result.ejected {
            Some(player) => tracing::info!("{} ejected from room {}", player.name, self.code),
            None => tracing::info!("No one ejected from room {}", self.code),
        }
        self.broadcast(&GameEvent::VotingEnded { result });

        self.tally_round += 1;
        self.schedule_resolution(self.tally_round);
    }

    fn schedule_resolution(&self, round: u64) {
        let mailbox = self.mailbox.clone();
        let delay = self.config.reveal_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(room) = mailbox.upgrade() {
                let _ = room.send(RoomCommand::ResolveTally { round }).await;
            }
        });
    }

    fn on_resolve_tally(&mut self, round: u64) {
        if round != self.tally_round {
            return;
        }
        match self.game.resolve_tally() {
            Some(Resolution::Ended(outcome)) => {
                tracing::info!("Game over in room {}: {}", self.code, outcome.reason);
                self.broadcast(&GameEvent::GameEnded { outcome });
            }
            Some(Resolution::Resumed { time_remaining }) => {
                let event = GameEvent::GameResumed {
                    players: self.game.players().to_vec(),
                    time_remaining,
                };
                self.broadcast(&event);
                self.start_ticker(ClockKind::Game);
            }
            None => {}
        }
    }

    fn finish(&mut self, winner: Winner, reason: &str) {
        self.stop_ticker();
        if let Some(outcome) = self.game.end(winner, reason) {
            tracing::info!("Game over in room {}: {}", self.code, reason);
            self.broadcast(&GameEvent::GameEnded { outcome });
        }
    }

    fn start_ticker(&mut self, kind: ClockKind) {
        self.next_ticker_id += 1;
        // Replacing the handle stops the previous clock.
        self.ticker = Some(Ticker::spawn(
            self.next_ticker_id,
            kind,
            self.config.tick_interval,
            self.mailbox.clone(),
        ));
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            phase: self.game.phase(),
            players: self.game.players().to_vec(),
            time_remaining: self.game.time_remaining(),
            voting_time_remaining: self.game.voting_time_remaining(),
            edit_count: self.game.edit_count(),
            created_at: self.created_at,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    fn member_ids(&self) -> Vec<PlayerId> {
        self.game.players().iter().map(|p| p.id.clone()).collect()
    }

    fn broadcast_player_list(&mut self) {
        if self.game.is_empty() {
            return;
        }
        let event = GameEvent::PlayerList {
            players: self.game.players().to_vec(),
        };
        self.broadcast(&event);
    }

    /// Fan out to every member. Members whose queue refuses the frame are
    /// evicted, and the survivors are told about the new roster.
    fn broadcast(&mut self, event: &GameEvent) {
        let mut refused = self.pusher.broadcast(&self.member_ids(), event);

        while !refused.is_empty() {
            for id in &refused {
                self.evict(id);
            }
            if self.game.is_empty() {
                return;
            }
            let roster = GameEvent::PlayerList {
                players: self.game.players().to_vec(),
            };
            refused = self.pusher.broadcast(&self.member_ids(), &roster);
        }
    }

    fn send_to(&mut self, target: &PlayerId, event: &GameEvent) {
        match self.pusher.push_to(target, event) {
            Ok(()) => {}
            Err(e @ (MessagePushError::QueueFull(_) | MessagePushError::QueueClosed(_))) => {
                tracing::warn!("{}", e);
                self.evict(target);
                self.broadcast_player_list();
            }
            Err(e) => tracing::warn!("Failed to push {}: {}", event.kind(), e),
        }
    }

    /// Drop a slow or vanished consumer. Its queue closes once the pusher lets go.
    fn evict(&mut self, id: &PlayerId) {
        if self.game.remove_player(id).is_none() {
            return;
        }
        self.pusher.unregister_client(id);
        tracing::warn!("Evicted '{}' from room {}", id, self.code);
        self.hub.connection_evicted(id.clone());
    }
}
