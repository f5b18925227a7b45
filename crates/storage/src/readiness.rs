use std::collections::HashMap;

use engine::GameState;
use shared::{
    domain::{ConnectionId, Seat},
    protocol::ReadySummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPhase {
    #[default]
    Waiting,
    Active,
}

/// Lobby gate: both seats confirm before the match goes active.
///
/// Flags are keyed by identity, not seat. Once active the phase never
/// returns to waiting, even if a flag is later cleared.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    flags: HashMap<ConnectionId, bool>,
    phase: MatchPhase,
}

impl Readiness {
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_ready(&self, connection_id: ConnectionId) -> bool {
        self.flags.get(&connection_id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, connection_id: ConnectionId, ready: bool) {
        self.flags.insert(connection_id, ready);
    }

    pub fn forget(&mut self, connection_id: ConnectionId) {
        self.flags.remove(&connection_id);
    }

    pub fn summary(&self, game: &GameState, connected: usize) -> ReadySummary {
        let seat_ready = |seat: Seat| {
            game.occupant(seat)
                .map(|id| self.is_ready(id))
                .unwrap_or(false)
        };
        ReadySummary {
            first_ready: seat_ready(Seat::First),
            second_ready: seat_ready(Seat::Second),
            player_count: connected,
        }
    }

    /// Returns true only on the call that moves the room to active.
    pub fn try_start(&mut self, summary: &ReadySummary) -> bool {
        if self.phase == MatchPhase::Waiting && summary.all_ready() {
            self.phase = MatchPhase::Active;
            return true;
        }
        false
    }
}

#[cfg(test)]
#[path = "tests/readiness_tests.rs"]
mod tests;
