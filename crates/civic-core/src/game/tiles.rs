use tracing::{debug, info};

use super::*;

/// Research levels that unlock the cleaner replacement actions.
pub const RESEARCH_CARBON_CAPTURE: i64 = 35;
pub const RESEARCH_SOLAR: i64 = 40;
pub const RESEARCH_FUSION: i64 = 80;

#[derive(Debug, Clone, Copy)]
struct Delta {
    economy: i64,
    ecology: i64,
    research: i64,
}

const fn delta(economy: i64, ecology: i64, research: i64) -> Delta {
    Delta {
        economy,
        ecology,
        research,
    }
}

/// Effect table keyed by (current kind, action): the kind the tile becomes
/// and the meter deltas applied immediately. `None` means the pairing is
/// never legal, regardless of research.
fn action_transition(kind: TileKind, action: TileAction) -> Option<(TileKind, Delta)> {
    use contracts::TileAction as A;
    use contracts::TileKind as K;

    match (kind, action) {
        (K::HealthyForest | K::SickForest, A::Demolish) => Some((K::Wasteland, delta(1, -3, 0))),
        (K::HealthyForest | K::SickForest, A::BuildResearchCenter) => {
            Some((K::ResearchCenter, delta(-2, -2, 5)))
        }
        (K::Factory, A::Demolish) => Some((K::Wasteland, delta(-4, 2, 0))),
        (K::Factory, A::UpgradeCarbonCapture) => Some((K::CleanFactory, delta(-1, 3, 0))),
        (K::Factory, A::ReplaceWithSolar) => Some((K::SolarField, delta(-1, 4, 0))),
        (K::OilRefinery, A::Demolish) => Some((K::Wasteland, delta(-5, 4, 0))),
        (K::OilRefinery, A::ReplaceWithSolar) => Some((K::SolarField, delta(-2, 5, 0))),
        (K::CoalPlant, A::Demolish) => Some((K::Wasteland, delta(-4, 3, 0))),
        (K::CoalPlant, A::ReplaceWithSolar) => Some((K::SolarField, delta(-1, 4, 0))),
        (K::Wasteland, A::PlantForest) => Some((K::HealthyForest, delta(0, 2, 0))),
        (K::Wasteland, A::BuildFactory) => Some((K::Factory, delta(4, -3, 0))),
        (K::Wasteland, A::BuildSolar) => Some((K::SolarField, delta(3, 2, 0))),
        (K::Wasteland, A::BuildResearchCenter) => Some((K::ResearchCenter, delta(-2, 0, 5))),
        (K::Wasteland, A::BuildFusion) => Some((K::FusionReactor, delta(8, 3, 0))),
        (K::Farmland, A::ClearFarmland) => Some((K::Wasteland, delta(0, 0, 0))),
        _ => None,
    }
}

pub(super) fn actions_for(kind: TileKind, research: i64) -> Vec<TileAction> {
    use contracts::TileAction as A;
    use contracts::TileKind as K;

    match kind {
        K::HealthyForest | K::SickForest => vec![A::Demolish, A::BuildResearchCenter],
        K::Factory => {
            let mut actions = vec![A::Demolish];
            if research >= RESEARCH_CARBON_CAPTURE {
                actions.push(A::UpgradeCarbonCapture);
            }
            if research >= RESEARCH_SOLAR {
                actions.push(A::ReplaceWithSolar);
            }
            actions
        }
        K::OilRefinery | K::CoalPlant => {
            let mut actions = vec![A::Demolish];
            if research >= RESEARCH_SOLAR {
                actions.push(A::ReplaceWithSolar);
            }
            actions
        }
        K::Wasteland => {
            let mut actions = vec![A::PlantForest, A::BuildFactory];
            if research >= RESEARCH_SOLAR {
                actions.push(A::BuildSolar);
            }
            actions.push(A::BuildResearchCenter);
            if research >= RESEARCH_FUSION {
                actions.push(A::BuildFusion);
            }
            actions
        }
        K::Farmland => vec![A::ClearFarmland],
        _ => Vec::new(),
    }
}

/// Manhattan reach of a polluting building; 0 for everything harmless.
fn pollution_radius(kind: TileKind) -> i32 {
    match kind {
        TileKind::Factory => 1,
        TileKind::OilRefinery | TileKind::CoalPlant => 2,
        _ => 0,
    }
}

/// One-step degradation under pollution, per kind.
fn degraded_form(kind: TileKind) -> Option<TileKind> {
    match kind {
        TileKind::CleanRiver => Some(TileKind::PollutedRiver),
        TileKind::HealthyForest => Some(TileKind::SickForest),
        TileKind::Farmland => Some(TileKind::DeadFarmland),
        _ => None,
    }
}

fn ecology_contribution(kind: TileKind) -> i64 {
    match kind {
        TileKind::HealthyForest => 2,
        TileKind::SickForest => 1,
        TileKind::CleanRiver => 1,
        TileKind::SolarField => 2,
        TileKind::FusionReactor => 3,
        TileKind::CleanFactory => 1,
        TileKind::Factory => -3,
        TileKind::OilRefinery => -5,
        TileKind::CoalPlant => -4,
        TileKind::PollutedRiver => -1,
        TileKind::DeadFarmland => -1,
        _ => 0,
    }
}

fn economy_contribution(kind: TileKind) -> i64 {
    match kind {
        TileKind::Factory => 3,
        TileKind::CleanFactory => 2,
        TileKind::OilRefinery => 5,
        TileKind::CoalPlant => 4,
        TileKind::Farmland => 1,
        TileKind::SolarField => 3,
        TileKind::FusionReactor => 8,
        TileKind::ResearchCenter => -2,
        TileKind::CityInner => 2,
        TileKind::CityOuter => 1,
        _ => 0,
    }
}

fn research_contribution(kind: TileKind) -> i64 {
    if kind == TileKind::ResearchCenter {
        5
    } else {
        0
    }
}

impl Game {
    /// Valid actions for the tile at (x, y) given the current research level.
    pub fn available_actions(&self, x: i32, y: i32) -> Result<Vec<TileAction>, GameError> {
        let index = self
            .tile_index(x, y)
            .ok_or(GameError::TileNotFound { x, y })?;
        Ok(actions_for(self.tiles[index].kind, self.resources.research))
    }

    /// Executes one grid action: the tile changes kind, the action's meter
    /// deltas land immediately (clamped), the turn budget shrinks by one,
    /// and the spawn rules run against the kind the tile had before.
    pub fn execute_tile_action(
        &mut self,
        x: i32,
        y: i32,
        action: TileAction,
    ) -> Result<(), GameError> {
        let index = self
            .tile_index(x, y)
            .ok_or(GameError::TileNotFound { x, y })?;

        self.require_running()?;

        if self.current_turn_record().remaining_actions == 0 {
            return Err(GameError::BudgetExhausted);
        }

        let previous_kind = self.tiles[index].kind;
        if !actions_for(previous_kind, self.resources.research).contains(&action) {
            return Err(GameError::InvalidAction {
                action,
                kind: previous_kind,
            });
        }

        let (next_kind, change) = action_transition(previous_kind, action)
            .unwrap_or_else(|| unreachable!("available actions always have a transition"));

        self.tiles[index].kind = next_kind;
        self.tiles[index].turns_in_state = 0;

        self.resources.economy = contracts::clamp_meter(self.resources.economy + change.economy);
        self.resources.ecology = contracts::clamp_meter(self.resources.ecology + change.ecology);
        self.resources.research = contracts::clamp_meter(self.resources.research + change.research);

        self.current_turn_record_mut().remaining_actions -= 1;

        info!(
            game_id = self.game_id,
            turn = self.turn,
            %action,
            ?previous_kind,
            ?next_kind,
            x,
            y,
            "tile action applied"
        );

        self.spawn_citizens(previous_kind, action);

        Ok(())
    }

    /// End-of-turn passive pass. Order is load-bearing: sources spread
    /// before sick tiles decay, and rivers only heal after both.
    pub(super) fn tick_tiles(&mut self) {
        self.spread_pollution();
        self.degrade_sick_forests();
        self.regenerate_rivers();
    }

    fn pollution_sources(&self) -> Vec<(i32, i32, i32)> {
        self.tiles
            .iter()
            .filter_map(|tile| {
                let radius = pollution_radius(tile.kind);
                (radius > 0).then_some((tile.x, tile.y, radius))
            })
            .collect()
    }

    fn spread_pollution(&mut self) {
        // Sources are fixed at the start of the phase; degradation never
        // creates a polluter, so no cascade within one tick.
        let sources = self.pollution_sources();
        let game_id = self.game_id;

        for tile in &mut self.tiles {
            let Some(degraded) = degraded_form(tile.kind) else {
                continue;
            };
            let reached = sources.iter().any(|(sx, sy, radius)| {
                let distance = (tile.x - sx).abs() + (tile.y - sy).abs();
                distance > 0 && distance <= *radius
            });
            if reached {
                debug!(
                    game_id,
                    x = tile.x,
                    y = tile.y,
                    from = ?tile.kind,
                    to = ?degraded,
                    "pollution spread"
                );
                tile.kind = degraded;
                tile.turns_in_state = 0;
            }
        }
    }

    fn degrade_sick_forests(&mut self) {
        let game_id = self.game_id;
        for tile in &mut self.tiles {
            if tile.kind != TileKind::SickForest {
                continue;
            }
            if tile.turns_in_state >= 2 {
                debug!(game_id, x = tile.x, y = tile.y, "sick forest collapsed");
                tile.kind = TileKind::Wasteland;
                tile.turns_in_state = 0;
            } else {
                tile.turns_in_state += 1;
            }
        }
    }

    fn regenerate_rivers(&mut self) {
        let sources = self.pollution_sources();
        let game_id = self.game_id;

        for tile in &mut self.tiles {
            if tile.kind != TileKind::PollutedRiver {
                continue;
            }
            let threatened = sources.iter().any(|(sx, sy, radius)| {
                (tile.x - sx).abs() + (tile.y - sy).abs() <= *radius
            });
            if threatened {
                // No recovery progress while a source is still in reach.
                tile.turns_in_state = 0;
            } else if tile.turns_in_state + 1 >= 2 {
                debug!(game_id, x = tile.x, y = tile.y, "river regenerated");
                tile.kind = TileKind::CleanRiver;
                tile.turns_in_state = 0;
            } else {
                tile.turns_in_state += 1;
            }
        }
    }

    /// Re-derives all three meters from the grid. This is the only place
    /// resources come from ground truth instead of accumulated deltas.
    pub(super) fn recompute_resources(&mut self) {
        let mut ecology = 0;
        let mut economy = 0;
        let mut research = 0;

        for tile in &self.tiles {
            ecology += ecology_contribution(tile.kind);
            economy += economy_contribution(tile.kind);
            research += research_contribution(tile.kind);
        }

        self.resources = Resources {
            ecology,
            economy,
            research,
        }
        .clamped();
    }
}
