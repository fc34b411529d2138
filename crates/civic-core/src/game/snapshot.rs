use super::*;
use contracts::{CitizenSnapshot, GameSnapshot, TileSnapshot, TurnSnapshot, SCHEMA_VERSION_V1};

use super::promises::promise_snapshot;
use super::tiles::actions_for;

impl Game {
    /// Full read-only projection for callers; per-tile action lists are
    /// evaluated against the current research level.
    pub fn snapshot(&self) -> GameSnapshot {
        let research = self.resources.research;

        GameSnapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            game_id: self.game_id,
            turn: self.turn,
            max_turns: contracts::MAX_TURNS,
            status: self.status,
            result_rank: self.result_rank,
            defeat_reason: self.defeat_reason,
            resources: self.resources,
            tiles: self
                .tiles
                .iter()
                .map(|tile| TileSnapshot {
                    x: tile.x,
                    y: tile.y,
                    kind: tile.kind,
                    turns_in_state: tile.turns_in_state,
                    available_actions: actions_for(tile.kind, research),
                })
                .collect(),
            citizens: self
                .citizens
                .iter()
                .map(|citizen| CitizenSnapshot {
                    name: citizen.name.clone(),
                    kind: citizen.kind,
                    profession: citizen.profession.clone(),
                    age: citizen.age,
                    personality: citizen.personality.clone(),
                    approval: citizen.approval,
                    remaining_turns: citizen.remaining_turns,
                })
                .collect(),
            promises: self.promises.iter().map(promise_snapshot).collect(),
            turns: self
                .turns
                .iter()
                .map(|record| TurnSnapshot {
                    turn: record.turn,
                    speech_text: record.speech_text.clone(),
                    remaining_actions: record.remaining_actions,
                })
                .collect(),
        }
    }
}
