use super::*;

/// Opening grid, one glyph per tile. Its per-kind contribution sums equal
/// the seeded meters below, so the first end-of-turn recompute does not
/// jump the values the player starts with.
///
/// Glyphs: W wasteland, F forest, f farmland, R river, I inner city,
/// O outer city, A factory, C coal plant, X oil refinery, L research lab.
const START_MAP: [&str; 10] = [
    "FFFFFFFFFF",
    "FRRFFFFFFW",
    "FRFFOOOOWW",
    "WRFOOIIOOF",
    "WRFOIIIIOf",
    "WRFOIIIIOf",
    "WRFOOOOOOf",
    "FROAWWAWff",
    "FRRAWCWXff",
    "WRRWAWWWLW",
];

const START_RESOURCES: Resources = Resources {
    ecology: 45,
    economy: 65,
    research: 5,
};

fn glyph_kind(glyph: char) -> Option<TileKind> {
    match glyph {
        'W' => Some(TileKind::Wasteland),
        'F' => Some(TileKind::HealthyForest),
        'f' => Some(TileKind::Farmland),
        'R' => Some(TileKind::CleanRiver),
        'I' => Some(TileKind::CityInner),
        'O' => Some(TileKind::CityOuter),
        'A' => Some(TileKind::Factory),
        'C' => Some(TileKind::CoalPlant),
        'X' => Some(TileKind::OilRefinery),
        'L' => Some(TileKind::ResearchCenter),
        _ => None,
    }
}

impl Game {
    /// Fresh aggregate: the start map, the three permanent citizens, the
    /// first turn record with a full action budget, and the seed meters.
    pub fn new(game_id: GameId) -> Self {
        let mut tiles = Vec::new();
        for (y, row) in START_MAP.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                if let Some(kind) = glyph_kind(glyph) {
                    tiles.push(Tile {
                        x: x as i32,
                        y: y as i32,
                        kind,
                        turns_in_state: 0,
                    });
                }
            }
        }

        let citizens = vec![
            Citizen {
                name: "Karl".to_string(),
                kind: CitizenKind::Core,
                profession: "Factory Worker".to_string(),
                age: 48,
                personality: "Conservative, family-oriented, skeptical of change. \
                              Values: jobs, stability, providing for his family."
                    .to_string(),
                approval: 60,
                remaining_turns: None,
            },
            Citizen {
                name: "Mia".to_string(),
                kind: CitizenKind::Core,
                profession: "Climate Activist".to_string(),
                age: 24,
                personality: "Idealistic, impatient, passionate. Values: immediate \
                              climate action, biodiversity, generational justice."
                    .to_string(),
                approval: 35,
                remaining_turns: None,
            },
            Citizen {
                name: "Sarah".to_string(),
                kind: CitizenKind::Core,
                profession: "Opposition Politician".to_string(),
                age: 42,
                personality: "Strategic, opportunistic, sharp-tongued. Exploits the \
                              mayor's weaknesses, quotes verbatim, instrumentalizes \
                              suffering."
                    .to_string(),
                approval: 25,
                remaining_turns: None,
            },
        ];

        Self {
            game_id,
            turn: 1,
            status: GameStatus::Running,
            result_rank: ResultRank::None,
            defeat_reason: DefeatReason::None,
            resources: START_RESOURCES,
            tiles,
            citizens,
            promises: Vec::new(),
            turns: vec![TurnRecord {
                turn: 1,
                speech_text: None,
                remaining_actions: ACTIONS_PER_TURN,
            }],
            next_promise_id: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_map_decodes_completely() {
        let game = Game::new(1);
        assert_eq!(game.tiles.len(), 100);
        assert_eq!(game.turn, 1);
        assert_eq!(game.current_turn_record().remaining_actions, ACTIONS_PER_TURN);
        assert_eq!(game.citizens.len(), 3);
        assert!(game.citizens.iter().all(|c| c.kind == CitizenKind::Core));
    }

    #[test]
    fn start_map_matches_seed_resources() {
        let mut game = Game::new(1);
        game.recompute_resources();
        assert_eq!(game.resources, START_RESOURCES);
    }
}
