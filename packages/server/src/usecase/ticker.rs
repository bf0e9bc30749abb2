//! Phase clocks: one task per active clock, feeding ticks into its room's queue.

use std::time::Duration;

use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, MissedTickBehavior},
};

use crate::domain::{ClockKind, RoomCommand};

/// Handle to a running clock task. Dropping it stops the clock.
#[derive(Debug)]
pub struct Ticker {
    id: u64,
    kind: ClockKind,
    stop: Option<oneshot::Sender<()>>,
}

impl Ticker {
    /// Spawn a clock that submits a `Tick` to `room` every `period`, first after one period.
    ///
    /// The clock also exits on its own once the room is gone.
    pub fn spawn(
        id: u64,
        kind: ClockKind,
        period: Duration,
        room: mpsc::WeakSender<RoomCommand>,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        let Some(room) = room.upgrade() else { break };
                        let tick = RoomCommand::Tick { clock: kind, ticker_id: id };
                        if room.send(tick).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("{:?} clock #{} stopped", kind, id);
        });

        Self {
            id,
            kind,
            stop: Some(stop),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ClockKind {
        self.kind
    }

    /// Whether the clock task is still alive. It drops its stop receiver on exit.
    pub fn is_running(&self) -> bool {
        self.stop.as_ref().is_some_and(|stop| !stop.is_closed())
    }

    /// Best-effort stop. A clock that already exited is not an error.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
