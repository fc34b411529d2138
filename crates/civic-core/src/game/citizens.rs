use tracing::{debug, info};

use super::*;

/// Dynamic-citizen roles as a closed set, so the spawn and solidarity
/// rules are plain lookup tables instead of name matching at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnTemplate {
    DisplacedDriller,
    DisplacedPlantWorker,
    DisplacedForester,
    DisplacedFarmer,
    SolarTechnician,
    ResearchFellow,
    FusionEngineer,
}

pub(super) struct CitizenTemplate {
    pub name: &'static str,
    pub profession: &'static str,
    pub age: u32,
    pub approval: i64,
    pub countdown: u32,
    pub personality: &'static str,
}

impl SpawnTemplate {
    pub(super) fn citizen(self) -> CitizenTemplate {
        match self {
            Self::DisplacedDriller => CitizenTemplate {
                name: "Oleg",
                profession: "Drill Worker",
                age: 54,
                approval: 15,
                countdown: 3,
                personality: "Angry, fearful, feels discarded after 20 years of service.",
            },
            Self::DisplacedPlantWorker => CitizenTemplate {
                name: "Kerstin",
                profession: "Power Plant Worker",
                age: 38,
                approval: 20,
                countdown: 2,
                personality: "Desperate single mother, needs an alternative immediately.",
            },
            Self::DisplacedForester => CitizenTemplate {
                name: "Bernd",
                profession: "Forester",
                age: 61,
                approval: 25,
                countdown: 2,
                personality: "Sad, disappointed, lives from the forest.",
            },
            Self::DisplacedFarmer => CitizenTemplate {
                name: "Henning",
                profession: "Farmer",
                age: 55,
                approval: 20,
                countdown: 2,
                personality: "Bitter, conservative, 3rd generation farmer.",
            },
            Self::SolarTechnician => CitizenTemplate {
                name: "Lena",
                profession: "Solar Technician",
                age: 28,
                approval: 65,
                countdown: 2,
                personality: "Optimistic, future-oriented, excited about renewables.",
            },
            Self::ResearchFellow => CitizenTemplate {
                name: "Dr. Yuki",
                profession: "PhD Student",
                age: 29,
                approval: 70,
                countdown: 2,
                personality: "Enthusiastic, idealistic, researches fusion energy.",
            },
            Self::FusionEngineer => CitizenTemplate {
                name: "Pavel",
                profession: "Fusion Engineer",
                age: 45,
                approval: 60,
                countdown: 3,
                personality: "Proud, rational progress-optimist.",
            },
        }
    }

    /// Approval shifts on the permanent citizens when this role walks in:
    /// displaced workers pull Karl down and hand Sarah ammunition; a lost
    /// forest stings Mia; new clean-energy arrivals please Mia and Karl.
    pub(super) fn solidarity(self) -> &'static [(&'static str, i64)] {
        match self {
            Self::DisplacedDriller | Self::DisplacedPlantWorker | Self::DisplacedFarmer => {
                &[("Karl", -5), ("Sarah", 3)]
            }
            Self::DisplacedForester => &[("Mia", -3)],
            Self::SolarTechnician | Self::ResearchFellow | Self::FusionEngineer => {
                &[("Mia", 3), ("Karl", 2)]
            }
        }
    }

    /// Role for the building a replacement tore down, if any.
    fn for_destroyed(kind: TileKind) -> Option<Self> {
        match kind {
            TileKind::OilRefinery => Some(Self::DisplacedDriller),
            TileKind::CoalPlant => Some(Self::DisplacedPlantWorker),
            TileKind::HealthyForest => Some(Self::DisplacedForester),
            _ => None,
        }
    }
}

/// Roles triggered by (kind before the action, action), in spawn order.
fn templates_for(previous_kind: TileKind, action: TileAction) -> Vec<SpawnTemplate> {
    match action {
        // Replacing a fossil tile displaces its workforce first, then the
        // solar technician arrives for the new field.
        TileAction::ReplaceWithSolar => {
            let mut templates = Vec::new();
            if let Some(displaced) = SpawnTemplate::for_destroyed(previous_kind) {
                templates.push(displaced);
            }
            templates.push(SpawnTemplate::SolarTechnician);
            templates
        }
        TileAction::Demolish => SpawnTemplate::for_destroyed(previous_kind)
            .into_iter()
            .collect(),
        TileAction::ClearFarmland if previous_kind == TileKind::Farmland => {
            vec![SpawnTemplate::DisplacedFarmer]
        }
        TileAction::BuildSolar => vec![SpawnTemplate::SolarTechnician],
        TileAction::BuildResearchCenter => vec![SpawnTemplate::ResearchFellow],
        TileAction::BuildFusion => vec![SpawnTemplate::FusionEngineer],
        _ => Vec::new(),
    }
}

impl Game {
    /// Runs the spawn rules after a grid action. Each template is
    /// capacity-checked on its own: a full town hall skips the spawn
    /// silently, it never fails the action.
    pub(super) fn spawn_citizens(
        &mut self,
        previous_kind: TileKind,
        action: TileAction,
    ) -> Vec<String> {
        let mut spawned = Vec::new();

        for template in templates_for(previous_kind, action) {
            let who = template.citizen();
            if self.citizens.len() >= MAX_CITIZENS {
                info!(
                    game_id = self.game_id,
                    name = who.name,
                    "spawn skipped, town hall is full"
                );
                continue;
            }

            self.citizens.push(Citizen {
                name: who.name.to_string(),
                kind: CitizenKind::Dynamic,
                profession: who.profession.to_string(),
                age: who.age,
                personality: who.personality.to_string(),
                approval: who.approval,
                remaining_turns: Some(who.countdown),
            });
            info!(
                game_id = self.game_id,
                name = who.name,
                %action,
                ?previous_kind,
                "citizen spawned"
            );
            spawned.push(who.name.to_string());

            self.apply_solidarity(template);
        }

        spawned
    }

    fn apply_solidarity(&mut self, template: SpawnTemplate) {
        let game_id = self.game_id;
        for (name, shift) in template.solidarity() {
            if let Some(citizen) = self.citizen_by_name_mut(name) {
                citizen.approval = contracts::clamp_meter(citizen.approval + shift);
                debug!(
                    game_id,
                    name, approval = citizen.approval, shift, "solidarity shift"
                );
            }
        }
    }

    /// Counts every dynamic citizen down one turn and removes the expired.
    pub(super) fn tick_citizen_lifecycle(&mut self) {
        let game_id = self.game_id;
        self.citizens.retain_mut(|citizen| {
            let Some(remaining) = citizen.remaining_turns else {
                return true;
            };
            let remaining = remaining.saturating_sub(1);
            citizen.remaining_turns = Some(remaining);
            if remaining == 0 {
                info!(game_id, name = %citizen.name, "dynamic citizen left town");
                false
            } else {
                true
            }
        });
    }
}
