use std::env;
use std::net::SocketAddr;

use contracts::{GameId, GameSnapshot, TileAction};

use civic_api::{GameDirectory, HttpCompletionClient, UnconfiguredClient};
use civic_core::CompletionClient;

fn print_usage() {
    println!("civic-cli <command>");
    println!("commands:");
    println!("  new");
    println!("  list");
    println!("  show <game_id>");
    println!("  actions <game_id> <x> <y>");
    println!("  act <game_id> <x> <y> <action>");
    println!("  speech <game_id> <text...>");
    println!("  end-turn <game_id>");
    println!("  delete <game_id>");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("environment:");
    println!("  CIVIC_SQLITE_PATH   game store (default: civic_games.sqlite)");
    println!("  CIVIC_MODEL_URL     completion endpoint for speech processing");
    println!("  CIVIC_MODEL_TOKEN   bearer token for the endpoint");
}

fn default_sqlite_path() -> String {
    env::var("CIVIC_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "civic_games.sqlite".to_string())
}

fn completion_client() -> Box<dyn CompletionClient + Send + Sync> {
    match env::var("CIVIC_MODEL_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let token = env::var("CIVIC_MODEL_TOKEN")
                .ok()
                .filter(|value| !value.trim().is_empty());
            Box::new(HttpCompletionClient::new(url, token))
        }
        _ => Box::new(UnconfiguredClient),
    }
}

fn open_directory() -> Result<GameDirectory, String> {
    GameDirectory::open(default_sqlite_path(), completion_client())
        .map_err(|err| format!("failed to open game store: {err}"))
}

fn parse_game_id(value: Option<&String>) -> Result<GameId, String> {
    let raw = value.ok_or_else(|| "missing game_id".to_string())?;
    raw.parse::<GameId>()
        .map_err(|_| format!("invalid game_id: {raw}"))
}

fn parse_coordinate(value: Option<&String>, label: &str) -> Result<i32, String> {
    let raw = value.ok_or_else(|| format!("missing {label}"))?;
    raw.parse::<i32>()
        .map_err(|_| format!("invalid {label}: {raw}"))
}

fn parse_action(value: Option<&String>) -> Result<TileAction, String> {
    let raw = value.ok_or_else(|| "missing action".to_string())?;
    serde_json::from_value(serde_json::Value::String(raw.clone()))
        .map_err(|_| format!("invalid action: {raw}"))
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn print_summary(snapshot: &GameSnapshot) {
    println!(
        "game={} turn={}/{} status={} ecology={} economy={} research={} actions_left={}",
        snapshot.game_id,
        snapshot.turn,
        snapshot.max_turns,
        snapshot.status,
        snapshot.resources.ecology,
        snapshot.resources.economy,
        snapshot.resources.research,
        snapshot
            .turns
            .iter()
            .find(|record| record.turn == snapshot.turn)
            .map(|record| record.remaining_actions)
            .unwrap_or(0),
    );
    for citizen in &snapshot.citizens {
        println!(
            "  citizen {} ({}) approval={} remaining={:?}",
            citizen.name, citizen.profession, citizen.approval, citizen.remaining_turns
        );
    }
}

fn run_command(args: &[String]) -> Result<(), String> {
    let command = args.get(1).map(String::as_str);

    match command {
        Some("new") => {
            let directory = open_directory()?;
            let snapshot = directory
                .create_game()
                .map_err(|err| format!("create failed: {err}"))?;
            print_summary(&snapshot);
            Ok(())
        }
        Some("list") => {
            let directory = open_directory()?;
            let games = directory
                .list_games(200)
                .map_err(|err| format!("list failed: {err}"))?;
            for game in games {
                println!(
                    "game={} turn={} status={}",
                    game.game_id, game.turn, game.status
                );
            }
            Ok(())
        }
        Some("show") => {
            let game_id = parse_game_id(args.get(2))?;
            let directory = open_directory()?;
            let snapshot = directory
                .game(game_id)
                .map_err(|err| format!("show failed: {err}"))?;
            let rendered = serde_json::to_string_pretty(&snapshot)
                .map_err(|err| format!("render failed: {err}"))?;
            println!("{rendered}");
            Ok(())
        }
        Some("actions") => {
            let game_id = parse_game_id(args.get(2))?;
            let x = parse_coordinate(args.get(3), "x")?;
            let y = parse_coordinate(args.get(4), "y")?;
            let directory = open_directory()?;
            let actions = directory
                .available_actions(game_id, x, y)
                .map_err(|err| format!("actions failed: {err}"))?;
            for action in actions {
                println!("{action}");
            }
            Ok(())
        }
        Some("act") => {
            let game_id = parse_game_id(args.get(2))?;
            let x = parse_coordinate(args.get(3), "x")?;
            let y = parse_coordinate(args.get(4), "y")?;
            let action = parse_action(args.get(5))?;
            let directory = open_directory()?;
            let snapshot = directory
                .execute_tile_action(game_id, x, y, action)
                .map_err(|err| format!("action failed: {err}"))?;
            print_summary(&snapshot);
            Ok(())
        }
        Some("speech") => {
            let game_id = parse_game_id(args.get(2))?;
            let text = args[3..].join(" ");
            if text.trim().is_empty() {
                return Err("missing speech text".to_string());
            }
            let directory = open_directory()?;
            let outcome = directory
                .submit_speech(game_id, &text)
                .map_err(|err| format!("speech failed: {err}"))?;
            for promise in &outcome.promises {
                println!("promise #{}: {}", promise.promise_id, promise.text);
            }
            for finding in &outcome.contradictions {
                println!("contradiction [{:?}]: {}", finding.severity, finding.description);
            }
            for reaction in &outcome.reactions {
                println!(
                    "{} ({:+}): {}",
                    reaction.citizen_name, reaction.approval_delta, reaction.dialogue
                );
            }
            Ok(())
        }
        Some("end-turn") => {
            let game_id = parse_game_id(args.get(2))?;
            let directory = open_directory()?;
            let snapshot = directory
                .end_turn(game_id)
                .map_err(|err| format!("end-turn failed: {err}"))?;
            print_summary(&snapshot);
            Ok(())
        }
        Some("delete") => {
            let game_id = parse_game_id(args.get(2))?;
            let directory = open_directory()?;
            directory
                .delete_game(game_id)
                .map_err(|err| format!("delete failed: {err}"))?;
            println!("deleted game {game_id}");
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn serve_command(args: &[String]) {
    match (parse_socket_addr(args.get(2)), open_directory()) {
        (Ok(addr), Ok(directory)) => {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    eprintln!("error: failed to start runtime: {err}");
                    std::process::exit(1);
                }
            };
            println!("serving api on http://{addr}");
            if let Err(err) = runtime.block_on(civic_api::serve(addr, directory)) {
                eprintln!("server error: {err}");
                std::process::exit(1);
            }
        }
        (Err(err), _) | (_, Err(err)) => {
            eprintln!("error: {err}");
            print_usage();
            std::process::exit(2);
        }
    }
}

// The plain commands drive the directory synchronously (the completion
// client blocks); only `serve` needs an async runtime.
fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    if command == Some("serve") {
        serve_command(&args);
        return;
    }

    if let Err(err) = run_command(&args) {
        eprintln!("error: {err}");
        print_usage();
        std::process::exit(2);
    }
}
