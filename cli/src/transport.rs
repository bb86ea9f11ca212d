use sanctum_core::broadcast::{Participant, PlayerHandle, SessionTransport};

/// Session transport that prints every delivery to stdout.
#[derive(Debug, Default)]
pub struct ConsoleTransport {
    players: Vec<Participant>,
    deliveries: usize,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player, or update them if already present.
    pub fn join(&mut self, participant: Participant) {
        match self.players.iter_mut().find(|p| p.handle == participant.handle) {
            Some(existing) => *existing = participant,
            None => self.players.push(participant),
        }
    }

    pub fn leave(&mut self, handle: PlayerHandle) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.handle != handle);
        self.players.len() != before
    }

    pub fn set_alive(&mut self, handle: PlayerHandle, alive: bool) -> bool {
        let Some(player) = self.players.iter_mut().find(|p| p.handle == handle) else {
            return false;
        };
        player.alive = alive;
        true
    }

    pub fn players(&self) -> &[Participant] {
        &self.players
    }

    pub fn deliveries(&self) -> usize {
        self.deliveries
    }
}

impl SessionTransport for ConsoleTransport {
    fn participants(&self) -> Vec<Participant> {
        self.players.clone()
    }

    fn deliver(&mut self, player: PlayerHandle, payload: &[u8]) {
        self.deliveries += 1;
        println!("  -> player {player}: {}", String::from_utf8_lossy(payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_replaces_existing_player() {
        let mut transport = ConsoleTransport::new();
        transport.join(Participant::new(1));
        transport.join(Participant {
            handle: 1,
            alive: true,
            game_master: true,
        });

        assert_eq!(transport.players().len(), 1);
        assert!(transport.players()[0].game_master);
        assert!(transport.leave(1));
        assert!(!transport.leave(1));
    }

    #[test]
    fn deliveries_are_counted() {
        let mut transport = ConsoleTransport::new();
        transport.deliver(3, b"{}");
        transport.deliver(4, b"{}");
        assert_eq!(transport.deliveries(), 2);
    }
}
