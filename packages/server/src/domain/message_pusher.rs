//! MessagePusher trait: delivery of outbound events to connections.

use tokio::sync::mpsc;

use super::{MessagePushError, event::GameEvent, value_object::PlayerId};

/// Bounded outbound queue of encoded frames owned by one connection.
pub type PusherChannel = mpsc::Sender<String>;

/// Delivers events to the outbound queues of a room's members.
///
/// Every method is non-blocking: a full or closed queue is reported as a
/// failure instead of being waited on.
pub trait MessagePusher: Send {
    /// Start delivering to `client_id` through `sender`.
    fn register_client(&mut self, client_id: PlayerId, sender: PusherChannel);

    /// Stop delivering to `client_id`, dropping its queue handle. Absent ids are a no-op.
    fn unregister_client(&mut self, client_id: &PlayerId) -> bool;

    /// Deliver to one client.
    fn push_to(&self, client_id: &PlayerId, event: &GameEvent) -> Result<(), MessagePushError>;

    /// Deliver to every target. Returns the targets whose queue refused the message.
    fn broadcast(&self, targets: &[PlayerId], event: &GameEvent) -> Vec<PlayerId>;
}
