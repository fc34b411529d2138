use std::cell::RefCell;
use std::collections::VecDeque;

use super::*;
use contracts::{ContradictionFinding, Severity};

use crate::language::{CompletionClient, CompletionError};
use crate::matcher::WordOverlapMatcher;

fn tile(x: i32, y: i32, kind: TileKind) -> Tile {
    Tile {
        x,
        y,
        kind,
        turns_in_state: 0,
    }
}

fn active_promise(id: u64, text: &str) -> Promise {
    Promise {
        promise_id: id,
        text: text.to_string(),
        turn_made: 1,
        deadline: None,
        status: PromiseStatus::Active,
        target_citizen: None,
    }
}

fn finding(description: &str, severity: Severity) -> ContradictionFinding {
    ContradictionFinding {
        description: description.to_string(),
        speech_quote: None,
        contradicting_action: None,
        severity,
    }
}

/// Replays canned completions in order; a call past the script fails.
struct ScriptedClient {
    responses: RefCell<VecDeque<Result<String, CompletionError>>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
        }
    }

    fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl CompletionClient for ScriptedClient {
    fn complete(&self, _system: &str, _user: &str) -> Result<String, CompletionError> {
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(CompletionError::EmptyResponse))
    }
}

#[test]
fn budget_allows_two_actions_then_fails() {
    let mut game = Game::new(1);

    game.execute_tile_action(0, 3, TileAction::PlantForest)
        .expect("first action");
    game.execute_tile_action(8, 2, TileAction::PlantForest)
        .expect("second action");

    let err = game
        .execute_tile_action(9, 2, TileAction::PlantForest)
        .expect_err("third action must fail");
    assert_eq!(err, GameError::BudgetExhausted);
    assert_eq!(game.current_turn_record().remaining_actions, 0);
}

#[test]
fn action_must_be_available_for_the_tile() {
    let mut game = Game::new(1);

    let err = game
        .execute_tile_action(4, 4, TileAction::PlantForest)
        .expect_err("city tiles have no actions");
    assert!(matches!(err, GameError::InvalidAction { .. }));

    // Fusion is research-gated and the game starts at research 5.
    let err = game
        .execute_tile_action(0, 3, TileAction::BuildFusion)
        .expect_err("fusion locked without research");
    assert!(matches!(err, GameError::InvalidAction { .. }));
    assert_eq!(game.current_turn_record().remaining_actions, ACTIONS_PER_TURN);
}

#[test]
fn research_unlocks_replacement_actions() {
    let mut game = Game::new(1);

    let factory_actions = game.available_actions(3, 7).expect("factory tile");
    assert_eq!(factory_actions, vec![TileAction::Demolish]);

    game.resources.research = 40;
    let factory_actions = game.available_actions(3, 7).expect("factory tile");
    assert!(factory_actions.contains(&TileAction::UpgradeCarbonCapture));
    assert!(factory_actions.contains(&TileAction::ReplaceWithSolar));

    game.resources.research = 80;
    let wasteland_actions = game.available_actions(0, 3).expect("wasteland tile");
    assert!(wasteland_actions.contains(&TileAction::BuildFusion));
}

#[test]
fn actions_rejected_when_game_is_over() {
    let mut game = Game::new(1);
    game.status = GameStatus::Lost;

    let err = game
        .execute_tile_action(0, 3, TileAction::PlantForest)
        .expect_err("finished games accept no actions");
    assert_eq!(err, GameError::NotRunning(GameStatus::Lost));
}

#[test]
fn unknown_coordinates_are_not_found() {
    let mut game = Game::new(1);
    let err = game
        .execute_tile_action(99, 99, TileAction::PlantForest)
        .expect_err("off-grid");
    assert_eq!(err, GameError::TileNotFound { x: 99, y: 99 });
}

#[test]
fn action_deltas_land_immediately_and_clamp() {
    let mut game = Game::new(1);
    game.resources.economy = 99;

    // wasteland + build_factory: economy +4 (clamped to 100), ecology -3
    game.execute_tile_action(0, 3, TileAction::BuildFactory)
        .expect("build factory");
    assert_eq!(game.resources.economy, 100);
    assert_eq!(game.resources.ecology, 42);
}

#[test]
fn pollution_spreads_once_and_stays() {
    let mut game = Game::new(1);
    game.tiles = vec![
        tile(0, 0, TileKind::Factory),
        tile(0, 1, TileKind::CleanRiver),
    ];

    game.tick_tiles();
    assert_eq!(game.tiles[1].kind, TileKind::PollutedRiver);
    assert_eq!(game.tiles[1].turns_in_state, 0);

    // Source still present: polluted, counter pinned at zero.
    game.tick_tiles();
    assert_eq!(game.tiles[1].kind, TileKind::PollutedRiver);
    assert_eq!(game.tiles[1].turns_in_state, 0);
}

#[test]
fn heavy_industry_reaches_two_tiles_out() {
    let mut game = Game::new(1);
    game.tiles = vec![
        tile(0, 0, TileKind::CoalPlant),
        tile(2, 0, TileKind::Farmland),
        tile(3, 0, TileKind::Farmland),
    ];

    game.tick_tiles();
    assert_eq!(game.tiles[1].kind, TileKind::DeadFarmland);
    assert_eq!(game.tiles[2].kind, TileKind::Farmland);
}

#[test]
fn river_regenerates_after_exactly_two_clear_ticks() {
    let mut game = Game::new(1);
    game.tiles = vec![tile(0, 1, TileKind::PollutedRiver)];

    game.tick_tiles();
    assert_eq!(game.tiles[0].kind, TileKind::PollutedRiver);
    assert_eq!(game.tiles[0].turns_in_state, 1);

    game.tick_tiles();
    assert_eq!(game.tiles[0].kind, TileKind::CleanRiver);
    assert_eq!(game.tiles[0].turns_in_state, 0);
}

#[test]
fn sick_forest_collapses_after_two_turns_in_state() {
    let mut game = Game::new(1);
    game.tiles = vec![tile(0, 0, TileKind::SickForest)];
    game.tiles[0].turns_in_state = 2;

    game.tick_tiles();
    assert_eq!(game.tiles[0].kind, TileKind::Wasteland);
    assert_eq!(game.tiles[0].turns_in_state, 0);
}

#[test]
fn citizen_count_never_exceeds_capacity() {
    let mut game = Game::new(1);
    assert_eq!(game.citizens.len(), 3);

    game.spawn_citizens(TileKind::OilRefinery, TileAction::Demolish);
    game.spawn_citizens(TileKind::Wasteland, TileAction::BuildSolar);
    assert_eq!(game.citizens.len(), MAX_CITIZENS);

    // Town hall full: the spawn is skipped silently.
    let spawned = game.spawn_citizens(TileKind::Wasteland, TileAction::BuildResearchCenter);
    assert!(spawned.is_empty());
    assert_eq!(game.citizens.len(), MAX_CITIZENS);
}

#[test]
fn solar_replacement_spawns_displaced_worker_then_technician() {
    let mut game = Game::new(1);
    let spawned = game.spawn_citizens(TileKind::OilRefinery, TileAction::ReplaceWithSolar);
    assert_eq!(spawned, vec!["Oleg".to_string(), "Lena".to_string()]);
    assert_eq!(game.citizens.len(), 5);

    // Oleg: Karl -5, Sarah +3. Lena: Mia +3, Karl +2.
    assert_eq!(game.citizen_by_name("Karl").expect("karl").approval, 57);
    assert_eq!(game.citizen_by_name("Sarah").expect("sarah").approval, 28);
    assert_eq!(game.citizen_by_name("Mia").expect("mia").approval, 38);
}

#[test]
fn solidarity_shifts_clamp_at_the_floor() {
    let mut game = Game::new(1);
    game.citizen_by_name_mut("Karl").expect("karl").approval = 2;

    game.spawn_citizens(TileKind::CoalPlant, TileAction::Demolish);
    assert_eq!(game.citizen_by_name("Karl").expect("karl").approval, 0);
}

#[test]
fn dynamic_citizens_expire_on_schedule() {
    let mut game = Game::new(1);
    game.spawn_citizens(TileKind::CoalPlant, TileAction::Demolish);
    assert!(game.citizen_by_name("Kerstin").is_some());

    game.tick_citizen_lifecycle();
    assert_eq!(
        game.citizen_by_name("Kerstin")
            .expect("kerstin")
            .remaining_turns,
        Some(1)
    );

    game.tick_citizen_lifecycle();
    assert!(game.citizen_by_name("Kerstin").is_none());
    // Core citizens are untouched by the lifecycle tick.
    assert_eq!(game.citizens.len(), 3);
}

#[test]
fn low_severity_contradictions_never_break_promises() {
    let mut game = Game::new(1);
    game.promises
        .push(active_promise(1, "keep the refinery open"));

    game.mark_broken(
        &WordOverlapMatcher,
        &[finding(
            "the mayor said to keep the refinery open and closed it",
            Severity::Low,
        )],
    );
    assert_eq!(game.promises[0].status, PromiseStatus::Active);

    game.mark_broken(
        &WordOverlapMatcher,
        &[finding(
            "the mayor said to keep the refinery open and closed it",
            Severity::High,
        )],
    );
    assert_eq!(game.promises[0].status, PromiseStatus::Broken);
}

#[test]
fn one_contradiction_breaks_at_most_one_promise() {
    let mut game = Game::new(1);
    game.promises
        .push(active_promise(1, "protect every forest tile"));
    game.promises
        .push(active_promise(2, "protect every forest tile we have"));

    game.mark_broken(
        &WordOverlapMatcher,
        &[finding(
            "promised to protect every forest tile, then cleared the woods",
            Severity::Medium,
        )],
    );

    assert_eq!(game.promises[0].status, PromiseStatus::Broken);
    assert_eq!(game.promises[1].status, PromiseStatus::Active);
}

#[test]
fn ecological_collapse_precedes_economic_collapse() {
    let mut game = Game::new(1);
    // Recomputes to ecology 15 and economy 15; ecology is checked first.
    // The refinery sits far from the forests so the tick changes nothing.
    let mut tiles: Vec<Tile> = (0..10)
        .map(|x| tile(x, 0, TileKind::HealthyForest))
        .collect();
    tiles.extend((0..10).map(|x| tile(x, 5, TileKind::CityOuter)));
    tiles.push(tile(50, 50, TileKind::OilRefinery));
    game.tiles = tiles;
    for citizen in &mut game.citizens {
        citizen.approval = 80;
    }

    game.end_turn().expect("resolution runs");
    assert_eq!(game.resources.ecology, 15);
    assert_eq!(game.resources.economy, 15);
    assert_eq!(game.status, GameStatus::Lost);
    assert_eq!(game.defeat_reason, DefeatReason::EcologicalCollapse);
}

#[test]
fn economic_collapse_reported_when_ecology_holds() {
    let mut game = Game::new(1);
    game.tiles = (0..20)
        .map(|x| tile(x, 0, TileKind::HealthyForest))
        .collect();

    game.end_turn().expect("resolution runs");
    assert_eq!(game.status, GameStatus::Lost);
    assert_eq!(game.defeat_reason, DefeatReason::EconomicCollapse);
}

#[test]
fn unanimous_disapproval_votes_the_mayor_out() {
    let mut game = Game::new(1);
    let mut tiles: Vec<Tile> = (0..15)
        .map(|x| tile(x, 0, TileKind::HealthyForest))
        .collect();
    tiles.extend((0..20).map(|x| tile(x, 1, TileKind::CityOuter)));
    game.tiles = tiles;
    for citizen in &mut game.citizens {
        citizen.approval = 10;
    }

    game.end_turn().expect("resolution runs");
    assert_eq!(game.status, GameStatus::Lost);
    assert_eq!(game.defeat_reason, DefeatReason::VotedOut);
}

#[test]
fn win_ranking_tiers() {
    let cases = [
        (85, 82, 78, ResultRank::Gold),
        (70, 70, 40, ResultRank::Silver),
        (50, 50, 10, ResultRank::Bronze),
        (81, 81, 75, ResultRank::Silver), // research misses the gold bar
    ];

    for (ecology, economy, research, expected) in cases {
        let mut game = Game::new(1);
        game.resources = Resources {
            ecology,
            economy,
            research,
        };
        game.decide_rank();
        assert_eq!(game.status, GameStatus::Won);
        assert_eq!(game.result_rank, expected, "({ecology},{economy},{research})");
    }
}

#[test]
fn final_turn_resolution_settles_active_promises() {
    let mut game = Game::new(1);
    game.turn = contracts::MAX_TURNS;
    game.turns = vec![TurnRecord {
        turn: contracts::MAX_TURNS,
        speech_text: None,
        remaining_actions: ACTIONS_PER_TURN,
    }];
    let mut tiles: Vec<Tile> = (0..20)
        .map(|x| tile(x, 0, TileKind::HealthyForest))
        .collect();
    tiles.extend((0..25).map(|x| tile(x, 1, TileKind::CityOuter)));
    game.tiles = tiles;
    game.promises.push(active_promise(1, "see the mandate out"));

    game.end_turn().expect("final resolution");
    assert_eq!(game.status, GameStatus::Won);
    assert_eq!(game.result_rank, ResultRank::Bronze);
    assert_eq!(game.promises[0].status, PromiseStatus::Kept);
}

#[test]
fn end_turn_advances_and_resets_the_budget() {
    let mut game = Game::new(1);
    game.execute_tile_action(0, 3, TileAction::PlantForest)
        .expect("spend one action");

    game.end_turn().expect("advance");
    assert_eq!(game.turn, 2);
    assert_eq!(game.turns.len(), 2);
    assert_eq!(game.current_turn_record().remaining_actions, ACTIONS_PER_TURN);
    assert!(game.status.is_running());
}

#[test]
fn promise_with_passed_deadline_is_kept_at_resolution() {
    let mut game = Game::new(1);
    let mut promise = active_promise(1, "deliver the solar field this turn");
    promise.deadline = Some(1);
    game.promises.push(promise);

    game.end_turn().expect("advance");
    assert_eq!(game.promises[0].status, PromiseStatus::Kept);
}

#[test]
fn speech_pipeline_records_links_breaks_and_applies() {
    let mut game = Game::new(1);
    game.promises
        .push(active_promise(900, "keep the refinery open"));
    game.next_promise_id = 901;

    let extraction = r#"{
        "promises": [
            {"text": "a new park by the river", "type": "explicit", "targetCitizen": "mia", "deadlineTurn": 3}
        ],
        "contradictions": [
            {"description": "said keep the refinery open, then tore it down", "speechQuote": "jobs stay", "contradictingAction": "demolished the refinery", "severity": "high"}
        ]
    }"#;
    let reactions = r#"{
        "reactions": [
            {"citizenName": "Karl", "dialogue": "You tore it down anyway.", "tone": "angry", "approvalDelta": -40},
            {"citizenName": "Ghost", "dialogue": "Nobody hears me.", "tone": "neutral", "approvalDelta": 10}
        ]
    }"#;

    let client = ScriptedClient::new(vec![
        Ok(extraction.to_string()),
        Ok(reactions.to_string()),
    ]);

    let outcome = game
        .process_speech(&client, &WordOverlapMatcher, "Jobs stay. A new park by the river.")
        .expect("pipeline commits");

    assert_eq!(outcome.promises.len(), 1);
    assert_eq!(outcome.promises[0].promise_id, 901);
    assert_eq!(outcome.promises[0].target_citizen.as_deref(), Some("Mia"));
    assert_eq!(outcome.promises[0].deadline, Some(3));
    assert_eq!(outcome.contradictions.len(), 1);
    assert_eq!(outcome.reactions.len(), 2);

    // The pre-existing promise matched the high-severity contradiction.
    assert_eq!(game.promises[0].status, PromiseStatus::Broken);
    // Delta -40 clamps to -15: Karl 60 -> 45. The unknown name is skipped.
    assert_eq!(game.citizen_by_name("Karl").expect("karl").approval, 45);
    assert_eq!(
        game.current_turn_record().speech_text.as_deref(),
        Some("Jobs stay. A new park by the river.")
    );
    assert_eq!(client.remaining(), 0);
}

#[test]
fn reaction_failure_rolls_the_whole_turn_back() {
    let mut game = Game::new(1);
    game.promises
        .push(active_promise(900, "keep the refinery open"));
    let before = game.clone();

    let extraction = r#"{
        "promises": [{"text": "a brand new promise", "type": "explicit", "targetCitizen": null, "deadlineTurn": null}],
        "contradictions": [{"description": "said keep the refinery open, then tore it down", "speechQuote": null, "contradictingAction": null, "severity": "high"}]
    }"#;
    let client = ScriptedClient::new(vec![
        Ok(extraction.to_string()),
        Err(CompletionError::Transport("connection reset".to_string())),
    ]);

    let err = game
        .process_speech(&client, &WordOverlapMatcher, "Jobs stay.")
        .expect_err("pipeline fails");
    assert!(matches!(err, GameError::Pipeline(PipelineError::Completion(_))));

    // No partial commit: ledger, approvals, and speech text are untouched.
    assert_eq!(game, before);
}

#[test]
fn malformed_reactions_fail_the_pipeline() {
    let mut game = Game::new(1);
    let before = game.clone();

    let client = ScriptedClient::new(vec![
        Ok(r#"{"promises": [], "contradictions": []}"#.to_string()),
        Ok("the townsfolk cheer wildly".to_string()),
    ]);

    let err = game
        .process_speech(&client, &WordOverlapMatcher, "Friends!")
        .expect_err("unparseable reactions are fatal");
    assert!(matches!(
        err,
        GameError::Pipeline(PipelineError::MalformedReactions(_))
    ));
    assert_eq!(game, before);
}

#[test]
fn extraction_failure_degrades_to_an_empty_result() {
    let mut game = Game::new(1);

    let reactions = r#"{"reactions": [{"citizenName": "Mia", "dialogue": "Finally some action.", "tone": "hopeful", "approvalDelta": 5}]}"#;
    let client = ScriptedClient::new(vec![
        Err(CompletionError::Unavailable("cold start".to_string())),
        Ok(reactions.to_string()),
    ]);

    let outcome = game
        .process_speech(&client, &WordOverlapMatcher, "We plant trees.")
        .expect("pipeline still commits");

    assert!(outcome.promises.is_empty());
    assert!(outcome.contradictions.is_empty());
    assert_eq!(game.citizen_by_name("Mia").expect("mia").approval, 40);
}

#[test]
fn speeches_rejected_when_game_is_over() {
    let mut game = Game::new(1);
    game.status = GameStatus::Won;

    let client = ScriptedClient::new(Vec::new());
    let err = game
        .process_speech(&client, &WordOverlapMatcher, "One more term!")
        .expect_err("finished games take no speeches");
    assert_eq!(err, GameError::NotRunning(GameStatus::Won));
}
