//! Crate root module declarations for plum_board.
//!
//! Exposes the board state and its FEN codec, the legal move generator, and
//! the ordered UCI engine session so the binary and tests can import stable
//! module paths.

pub mod errors;

pub mod game_state {
    pub mod board_state;
    pub mod chess_rules;
    pub mod chess_types;
    pub mod move_record;
    pub mod piece_register;
}

pub mod move_generation {
    pub mod legal_move_checks;
    pub mod legal_move_generator;
    pub mod legal_move_shared;
    pub mod legal_moves_bishop;
    pub mod legal_moves_king;
    pub mod legal_moves_knight;
    pub mod legal_moves_pawn;
    pub mod legal_moves_queen;
    pub mod legal_moves_rook;
    pub mod perft;
}

pub mod uci {
    pub mod engine_session;
    #[cfg(test)]
    pub(crate) mod fake_engine;
    pub mod process_launcher;
    pub mod protocol;
}

pub mod utils {
    pub mod algebraic;
    pub mod engine_match_harness;
    pub mod fen_editor;
    pub mod fen_generator;
    pub mod fen_parser;
    pub mod long_algebraic;
    pub mod render_game_state;
}
