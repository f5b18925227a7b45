use std::collections::VecDeque;

use rand::Rng;
use shared::domain::{RoomCode, ROOM_CODE_ALPHABET, ROOM_CODE_LEN};

/// Source of candidate room codes. Uniqueness is the store's job; a
/// generator may return a code that is already taken.
pub trait CodeGenerator: Send {
    fn generate(&mut self) -> RoomCode;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodes;

impl CodeGenerator for RandomCodes {
    fn generate(&mut self) -> RoomCode {
        let alphabet = ROOM_CODE_ALPHABET.as_bytes();
        let mut rng = rand::thread_rng();
        loop {
            let raw: String = (0..ROOM_CODE_LEN)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
                .collect();
            if let Ok(code) = RoomCode::parse(&raw) {
                return code;
            }
        }
    }
}

/// Hands out a fixed list of codes first, then falls back to random ones.
#[derive(Debug, Default, Clone)]
pub struct ScriptedCodes {
    queue: VecDeque<RoomCode>,
}

impl ScriptedCodes {
    pub fn new(codes: impl IntoIterator<Item = RoomCode>) -> Self {
        Self {
            queue: codes.into_iter().collect(),
        }
    }
}

impl CodeGenerator for ScriptedCodes {
    fn generate(&mut self) -> RoomCode {
        self.queue
            .pop_front()
            .unwrap_or_else(|| RandomCodes.generate())
    }
}
