//! Delivery of scenario notifications to session participants.
//!
//! Message delivery itself belongs to the network layer, reached through
//! [`SessionTransport`]. This module decides who receives what.

mod message;

pub use message::{
    ElapsedTime, Envelope, MessageBody, Recipient, encode_progress_update, encode_scenario_state,
};

/// Handle of a connected player.
pub type PlayerHandle = u64;

/// A player currently present in the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participant {
    pub handle: PlayerHandle,
    pub alive: bool,
    pub game_master: bool,
}

impl Participant {
    pub fn new(handle: PlayerHandle) -> Self {
        Self {
            handle,
            alive: true,
            game_master: false,
        }
    }
}

/// Session membership and message delivery, provided by the host server.
pub trait SessionTransport {
    /// Players currently in the instance.
    fn participants(&self) -> Vec<Participant>;

    /// Deliver an encoded message to one player.
    fn deliver(&mut self, player: PlayerHandle, payload: &[u8]);
}

/// Send `message` to `recipient`. Returns the number of deliveries.
///
/// Broadcasting to an empty session delivers nothing and is not an error.
pub fn send<T: SessionTransport + ?Sized>(
    transport: &mut T,
    mut message: Envelope,
    recipient: Recipient,
) -> usize {
    message.recipient = recipient;
    let payload = match message.to_bytes() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode scenario message");
            return 0;
        }
    };

    match recipient {
        Recipient::Broadcast => {
            let participants = transport.participants();
            for participant in &participants {
                transport.deliver(participant.handle, &payload);
            }
            participants.len()
        }
        Recipient::Player(handle) => {
            transport.deliver(handle, &payload);
            1
        }
    }
}
