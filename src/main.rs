//! Play one engine-vs-random game against a UCI engine binary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use plum_board::game_state::chess_types::Color;
use plum_board::uci::engine_session::{EngineSession, SessionConfig};
use plum_board::uci::process_launcher::StdProcessLauncher;
use plum_board::utils::engine_match_harness::{play_engine_match, MatchConfig, MatchError, MatchResult};
use plum_board::utils::render_game_state::render_board_state;

#[derive(Parser, Debug)]
#[command(name = "plum_board")]
#[command(about = "Drive a UCI engine through one game on a FEN-synchronized board", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the UCI engine binary
    #[arg(long)]
    engine: PathBuf,

    /// Extra argument passed to the engine (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Engine think time per move in milliseconds
    #[arg(long, default_value = "100")]
    movetime: u64,

    /// Stop after this many plies
    #[arg(long, default_value = "200")]
    max_plies: u16,

    /// Seed for the random mover
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Starting position (defaults to the standard start)
    #[arg(long)]
    fen: Option<String>,

    /// Let the engine play black instead of white
    #[arg(long)]
    engine_black: bool,

    /// Random plies for both sides before the engine takes over
    #[arg(long, default_value = "0")]
    opening_plies: u8,

    /// Engine option passed through as `setoption` (repeatable)
    #[arg(long = "option", value_name = "NAME=VALUE", value_parser = parse_option)]
    options: Vec<(String, String)>,

    /// Give up on an engine reply after this many milliseconds
    #[arg(long)]
    response_timeout_ms: Option<u64>,
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_owned(), value.trim().to_owned())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,plum_board=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(result) => {
            print_result(&result);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "match aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<MatchResult, MatchError> {
    let session_config = SessionConfig {
        response_timeout: cli.response_timeout_ms.map(Duration::from_millis),
        ..SessionConfig::default()
    };
    let match_config = MatchConfig {
        max_plies: cli.max_plies,
        movetime_ms: cli.movetime,
        start_fen: cli.fen,
        engine_color: if cli.engine_black { Color::Dark } else { Color::Light },
        opening_plies: cli.opening_plies,
        seed: cli.seed,
        options: cli.options,
    };

    let launcher = StdProcessLauncher::new(&cli.engine).with_args(cli.engine_args);
    let session = EngineSession::new(session_config);
    session.start(&launcher)?;
    info!(engine = %cli.engine.display(), "engine started");

    let result = play_engine_match(&session, &match_config);
    session.stop()?;
    result
}

fn print_result(result: &MatchResult) {
    for (index, pair) in result.played_moves_lan.chunks(2).enumerate() {
        println!("{:>3}. {}", index + 1, pair.join(" "));
    }
    println!();
    println!("{}", render_board_state(&result.final_board));
    println!();
    println!("fen: {}", result.final_board.fen());
    println!("outcome: {}", result.outcome);
    if let Some(token) = &result.offending_token {
        println!("engine reply: {token}");
    }
    if result.engine_move_count > 0 {
        let average = result.engine_total_time / result.engine_move_count;
        println!("engine moves: {} (avg {:?})", result.engine_move_count, average);
    }
}
