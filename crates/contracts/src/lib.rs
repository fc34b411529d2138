//! v1 cross-boundary contracts shared by the kernel, API facade, and CLI.

use std::fmt;

use serde::{Deserialize, Serialize};

mod extraction;

pub use extraction::{
    CitizenReaction, ContradictionFinding, ExtractedPromise, ExtractionPayload, PromiseKind,
    ReactionsPayload, Severity,
};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// A mandate runs for a fixed number of turns; the win check only fires on the last one.
pub const MAX_TURNS: u32 = 7;

pub type GameId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Running,
    Won,
    Lost,
}

impl GameStatus {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Won => write!(f, "won"),
            Self::Lost => write!(f, "lost"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultRank {
    None,
    Bronze,
    Silver,
    Gold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefeatReason {
    None,
    EcologicalCollapse,
    EconomicCollapse,
    VotedOut,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Wasteland,
    HealthyForest,
    SickForest,
    Farmland,
    DeadFarmland,
    CleanRiver,
    PollutedRiver,
    Factory,
    CleanFactory,
    OilRefinery,
    CoalPlant,
    SolarField,
    FusionReactor,
    ResearchCenter,
    CityInner,
    CityOuter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TileAction {
    Demolish,
    PlantForest,
    BuildFactory,
    BuildSolar,
    BuildResearchCenter,
    BuildFusion,
    ReplaceWithSolar,
    UpgradeCarbonCapture,
    ClearFarmland,
}

impl fmt::Display for TileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Demolish => "demolish",
            Self::PlantForest => "plant_forest",
            Self::BuildFactory => "build_factory",
            Self::BuildSolar => "build_solar",
            Self::BuildResearchCenter => "build_research_center",
            Self::BuildFusion => "build_fusion",
            Self::ReplaceWithSolar => "replace_with_solar",
            Self::UpgradeCarbonCapture => "upgrade_carbon_capture",
            Self::ClearFarmland => "clear_farmland",
        };
        write!(f, "{label}")
    }
}

pub const METER_MIN: i64 = 0;
pub const METER_MAX: i64 = 100;

/// The three city meters. Every write path clamps into [0, 100]; an
/// out-of-range delta is corrected, never reported as an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resources {
    pub ecology: i64,
    pub economy: i64,
    pub research: i64,
}

impl Resources {
    pub fn clamped(self) -> Self {
        Self {
            ecology: clamp_meter(self.ecology),
            economy: clamp_meter(self.economy),
            research: clamp_meter(self.research),
        }
    }
}

pub fn clamp_meter(value: i64) -> i64 {
    value.clamp(METER_MIN, METER_MAX)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CitizenKind {
    Core,
    Dynamic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromiseStatus {
    Active,
    Kept,
    Broken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TileSnapshot {
    pub x: i32,
    pub y: i32,
    pub kind: TileKind,
    pub turns_in_state: u32,
    pub available_actions: Vec<TileAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitizenSnapshot {
    pub name: String,
    pub kind: CitizenKind,
    pub profession: String,
    pub age: u32,
    pub personality: String,
    pub approval: i64,
    pub remaining_turns: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromiseSnapshot {
    pub promise_id: u64,
    pub text: String,
    pub turn_made: u32,
    pub deadline: Option<u32>,
    pub status: PromiseStatus,
    pub target_citizen: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnSnapshot {
    pub turn: u32,
    pub speech_text: Option<String>,
    pub remaining_actions: u32,
}

/// Read-only projection of one game aggregate, returned after every
/// operation on the surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSnapshot {
    pub schema_version: String,
    pub game_id: GameId,
    pub turn: u32,
    pub max_turns: u32,
    pub status: GameStatus,
    pub result_rank: ResultRank,
    pub defeat_reason: DefeatReason,
    pub resources: Resources,
    pub tiles: Vec<TileSnapshot>,
    pub citizens: Vec<CitizenSnapshot>,
    pub promises: Vec<PromiseSnapshot>,
    pub turns: Vec<TurnSnapshot>,
}

/// Result payload of one speech-pipeline run: the promises recorded this
/// turn (with their ledger ids), the contradictions the analysis found,
/// and the per-citizen reactions that were applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechOutcome {
    pub schema_version: String,
    pub promises: Vec<PromiseSnapshot>,
    pub contradictions: Vec<ContradictionFinding>,
    pub reactions: Vec<CitizenReaction>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    GameNotFound,
    TileNotFound,
    InvalidAction,
    BudgetExhausted,
    GameNotRunning,
    PipelineFailure,
    InvalidRequest,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}
