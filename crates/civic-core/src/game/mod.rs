use std::fmt;

mod citizens;
mod init;
mod promises;
mod snapshot;
mod speech;
mod tiles;
mod turn;

use contracts::{
    CitizenKind, DefeatReason, GameId, GameStatus, PromiseStatus, ResultRank, Resources,
    TileAction, TileKind,
};
use serde::{Deserialize, Serialize};

use crate::language::CompletionError;

pub use citizens::SpawnTemplate;

/// Grid actions allowed per turn.
pub const ACTIONS_PER_TURN: u32 = 2;
/// Hard cap on citizens present at the town hall; spawns beyond it are skipped.
pub const MAX_CITIZENS: usize = 5;
/// A core citizen below this approval counts toward the voted-out check.
pub const VOTED_OUT_APPROVAL: i64 = 25;
/// Either meter below this at end of turn loses the game.
pub const COLLAPSE_THRESHOLD: i64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Tile {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) kind: TileKind,
    pub(crate) turns_in_state: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Citizen {
    pub(crate) name: String,
    pub(crate) kind: CitizenKind,
    pub(crate) profession: String,
    pub(crate) age: u32,
    pub(crate) personality: String,
    pub(crate) approval: i64,
    pub(crate) remaining_turns: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Promise {
    pub(crate) promise_id: u64,
    pub(crate) text: String,
    pub(crate) turn_made: u32,
    pub(crate) deadline: Option<u32>,
    pub(crate) status: PromiseStatus,
    /// Weak reference by name; the promise outlives the citizen.
    pub(crate) target_citizen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct TurnRecord {
    pub(crate) turn: u32,
    pub(crate) speech_text: Option<String>,
    pub(crate) remaining_actions: u32,
}

/// One game aggregate. Loaded whole, mutated only through the operations
/// below, and serialized whole at commit; there is no shared registry of
/// live games inside the kernel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Game {
    game_id: GameId,
    turn: u32,
    status: GameStatus,
    result_rank: ResultRank,
    defeat_reason: DefeatReason,
    resources: Resources,
    tiles: Vec<Tile>,
    citizens: Vec<Citizen>,
    promises: Vec<Promise>,
    turns: Vec<TurnRecord>,
    next_promise_id: u64,
}

impl Game {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn resources(&self) -> Resources {
        self.resources
    }

    pub fn result_rank(&self) -> ResultRank {
        self.result_rank
    }

    pub fn defeat_reason(&self) -> DefeatReason {
        self.defeat_reason
    }

    pub(crate) fn require_running(&self) -> Result<(), GameError> {
        if self.status.is_running() {
            Ok(())
        } else {
            Err(GameError::NotRunning(self.status))
        }
    }

    pub(crate) fn tile_index(&self, x: i32, y: i32) -> Option<usize> {
        self.tiles.iter().position(|tile| tile.x == x && tile.y == y)
    }

    pub(crate) fn current_turn_record(&self) -> &TurnRecord {
        let turn = self.turn;
        self.turns
            .iter()
            .find(|record| record.turn == turn)
            .unwrap_or_else(|| unreachable!("turn record {turn} exists for the active turn"))
    }

    pub(crate) fn current_turn_record_mut(&mut self) -> &mut TurnRecord {
        let turn = self.turn;
        self.turns
            .iter_mut()
            .find(|record| record.turn == turn)
            .unwrap_or_else(|| unreachable!("turn record {turn} exists for the active turn"))
    }

    pub(crate) fn citizen_by_name_mut(&mut self, name: &str) -> Option<&mut Citizen> {
        self.citizens
            .iter_mut()
            .find(|citizen| citizen.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn citizen_by_name(&self, name: &str) -> Option<&Citizen> {
        self.citizens
            .iter()
            .find(|citizen| citizen.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn core_citizens(&self) -> impl Iterator<Item = &Citizen> {
        self.citizens
            .iter()
            .filter(|citizen| citizen.kind == CitizenKind::Core)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    TileNotFound { x: i32, y: i32 },
    InvalidAction { action: TileAction, kind: TileKind },
    BudgetExhausted,
    NotRunning(GameStatus),
    Pipeline(PipelineError),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TileNotFound { x, y } => write!(f, "no tile at ({x},{y})"),
            Self::InvalidAction { action, kind } => {
                write!(f, "action {action} is not available for a {kind:?} tile")
            }
            Self::BudgetExhausted => write!(f, "no tile actions remaining this turn"),
            Self::NotRunning(status) => write!(f, "game is not running (status: {status})"),
            Self::Pipeline(err) => write!(f, "speech pipeline failed: {err}"),
        }
    }
}

impl std::error::Error for GameError {}

impl From<PipelineError> for GameError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The reaction call could not be completed.
    Completion(CompletionError),
    /// The reaction call answered with text that is not the documented schema.
    MalformedReactions(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completion(err) => write!(f, "{err}"),
            Self::MalformedReactions(detail) => {
                write!(f, "malformed citizen reactions payload: {detail}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<CompletionError> for PipelineError {
    fn from(value: CompletionError) -> Self {
        Self::Completion(value)
    }
}

#[cfg(test)]
mod tests;
