//! Engine-vs-random-mover match harness.
//!
//! Drives one game through `BoardState` and an `EngineSession`: the engine
//! plays one color, a seeded random mover plays the other (and both sides
//! during an optional random opening prefix). Every engine move is checked
//! with the move generator before it is applied.

use std::time::{Duration, Instant};

use derive_more::{Display, Error, From};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::errors::{BoardError, EngineError};
use crate::game_state::board_state::BoardState;
use crate::game_state::chess_types::Color;
use crate::game_state::move_record::MoveRequest;
use crate::move_generation::legal_move_generator::{all_legal_moves, game_status, is_move_legal, GameStatus};
use crate::uci::engine_session::EngineSession;
use crate::utils::long_algebraic::{long_algebraic_to_move, record_to_long_algebraic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MatchOutcome {
    #[display("checkmate, {winner} wins")]
    Checkmate { winner: Color },
    #[display("stalemate")]
    Stalemate,
    #[display("ply limit reached")]
    MaxPlies,
    /// The engine answered with a move that is not legal here.
    #[display("engine played an illegal move")]
    IllegalEngineMove,
    /// The engine reported no move in a position that still has one.
    #[display("engine returned no move")]
    EngineHasNoMove,
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub max_plies: u16,
    pub movetime_ms: u64,
    /// Starting position; `None` plays from the standard start.
    pub start_fen: Option<String>,
    pub engine_color: Color,
    /// Random plies for both sides before the engine takes over.
    pub opening_plies: u8,
    pub seed: u64,
    /// Passed through verbatim as `setoption` before the game.
    pub options: Vec<(String, String)>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_plies: 200,
            movetime_ms: 100,
            start_fen: None,
            engine_color: Color::Light,
            opening_plies: 0,
            seed: 0,
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    pub final_board: BoardState,
    pub played_moves_lan: Vec<String>,
    /// The last engine reply token when the outcome blames the engine.
    pub offending_token: Option<String>,
    pub engine_move_count: u32,
    pub engine_total_time: Duration,
}

#[derive(Debug, Display, Error, From)]
pub enum MatchError {
    #[display("board error: {_0}")]
    Board(BoardError),
    #[display("engine error: {_0}")]
    Engine(EngineError),
}

/// Play one game against the engine behind `session`, which must be started.
pub fn play_engine_match(session: &EngineSession, config: &MatchConfig) -> Result<MatchResult, MatchError> {
    let mut board = match &config.start_fen {
        Some(fen) => BoardState::from_fen(fen)?,
        None => BoardState::new_game(),
    };
    let mut rng = StdRng::seed_from_u64(config.seed);

    session.uci()?;
    for (name, value) in &config.options {
        session.set_option(name, value)?;
    }
    session.is_ready()?;
    session.new_game()?;
    info!(engine = %config.engine_color, fen = %board.fen(), "match started");

    let mut played_moves_lan = Vec::<String>::new();
    let mut offending_token = None;
    let mut engine_move_count = 0u32;
    let mut engine_total_time = Duration::ZERO;

    let outcome = loop {
        match game_status(&board)? {
            GameStatus::Checkmate { winner } => break MatchOutcome::Checkmate { winner },
            GameStatus::Stalemate => break MatchOutcome::Stalemate,
            GameStatus::Ongoing | GameStatus::Check => {}
        }
        if played_moves_lan.len() >= usize::from(config.max_plies) {
            break MatchOutcome::MaxPlies;
        }

        let engine_turn = board.side_to_move() == config.engine_color
            && played_moves_lan.len() >= usize::from(config.opening_plies);
        let mv = if engine_turn {
            session.set_position(board.fen())?;
            let started = Instant::now();
            let token = session.go_movetime(config.movetime_ms)?;
            engine_total_time += started.elapsed();
            engine_move_count += 1;

            let Some(token) = token else {
                break MatchOutcome::EngineHasNoMove;
            };
            match engine_move(&board, &token)? {
                Some(mv) => mv,
                None => {
                    warn!(%token, fen = %board.fen(), "engine move rejected");
                    offending_token = Some(token);
                    break MatchOutcome::IllegalEngineMove;
                }
            }
        } else {
            let legal = all_legal_moves(&board)?;
            legal[rng.random_range(0..legal.len())]
        };

        let record = board.move_piece(mv)?;
        let lan = record_to_long_algebraic(&record);
        debug!(ply = played_moves_lan.len() + 1, mv = %lan, engine = engine_turn, "played");
        played_moves_lan.push(lan);
    };

    info!(%outcome, plies = played_moves_lan.len(), "match finished");
    Ok(MatchResult {
        outcome,
        final_board: board,
        played_moves_lan,
        offending_token,
        engine_move_count,
        engine_total_time,
    })
}

/// Decode and legality-check an engine token; `None` if it is unusable.
fn engine_move(board: &BoardState, token: &str) -> Result<Option<MoveRequest>, BoardError> {
    let Ok(mv) = long_algebraic_to_move(token, board) else {
        return Ok(None);
    };
    Ok(is_move_legal(board, mv)?.then_some(mv))
}
