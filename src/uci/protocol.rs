//! UCI command text and reply helpers.
//!
//! Only the handful of commands a GUI needs to drive an engine through one
//! game are covered. Replies are matched by prefix.

use tracing::warn;

pub const UCI: &str = "uci";
pub const UCI_OK: &str = "uciok";
pub const IS_READY: &str = "isready";
pub const READY_OK: &str = "readyok";
pub const UCI_NEW_GAME: &str = "ucinewgame";
pub const QUIT: &str = "quit";
pub const STOP: &str = "stop";
pub const BEST_MOVE: &str = "bestmove";

/// Canonical reply for "the engine has no legal move".
pub const NO_MOVE_REPLY: &str = "bestmove (none)";

/// Known-bad "no move" replies some engines emit in place of `bestmove (none)`.
const MALFORMED_NO_MOVE_REPLIES: [&str; 2] = ["bestmove a1a1", "bestmove 0000"];

pub fn position_fen(fen: &str) -> String {
    format!("position fen {fen}")
}

pub fn go_movetime(millis: u64) -> String {
    format!("go movetime {millis}")
}

/// `setoption name <N> [value <V>]`; an empty value sends a button-style option.
pub fn set_option(name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("setoption name {name}")
    } else {
        format!("setoption name {name} value {value}")
    }
}

/// Rewrite the enumerated malformed replies to [`NO_MOVE_REPLY`].
///
/// Trailing tokens (`ponder ...`) after a malformed move are dropped along
/// with it. Every other line is returned unchanged.
pub fn canonicalize_reply(line: &str) -> &str {
    let trimmed = line.trim_end();
    for malformed in MALFORMED_NO_MOVE_REPLIES {
        let Some(rest) = trimmed.strip_prefix(malformed) else {
            continue;
        };
        if rest.is_empty() || rest.starts_with(' ') {
            warn!(reply = %trimmed, "canonicalizing malformed engine reply");
            return NO_MOVE_REPLY;
        }
    }
    trimmed
}

/// The move token of a `bestmove` reply, or `None` when the engine had no move.
pub fn parse_best_move(reply: &str) -> Option<&str> {
    let mut tokens = reply.split_whitespace();
    if tokens.next() != Some(BEST_MOVE) {
        return None;
    }
    match tokens.next() {
        Some("(none)") | None => None,
        Some(token) => Some(token),
    }
}
