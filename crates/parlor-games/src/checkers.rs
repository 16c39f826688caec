//! Checkers (English draughts) with forced captures, multi-jump sequences
//! submitted as one command, promotion, and a best-of-three series.
//!
//! Board cells hold `"r"`/`"b"` for men, `"R"`/`"B"` for kings, or null.
//! Red sits on rows 5–7 and moves toward row 0; black sits on rows 0–2 and
//! moves toward row 7. Play happens on dark squares (`(row+col) % 2 == 1`).

use std::collections::BTreeMap;

use parlor_protocol::ErrorCode;
use parlor_room::{
    CommandContext, GameDef, GameError, Outcome, SetupContext, Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode_state;

pub const GAME_ID: &str = "checkers";

/// Rounds needed to win the series.
const SERIES_TARGET: u32 = 2;

type Board = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seat {
    display_name: String,
    color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Series {
    round: u32,
    wins: BTreeMap<String, u32>,
    target: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    phase: String,
    current_player_id: Option<String>,
    player_order: Vec<String>,
    is_complete: bool,
    players: BTreeMap<String, Seat>,
    board: Board,
    winner: Option<String>,
    series: Series,
}

#[derive(Debug, Deserialize)]
struct MovePiece {
    from: [usize; 2],
    /// Landing squares in order; a single entry is a plain step or one
    /// jump, more entries are a multi-jump sequence.
    path: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

impl Color {
    fn letter(self) -> char {
        match self {
            Color::Red => 'r',
            Color::Black => 'b',
        }
    }

    fn opponent(self) -> Color {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }

    /// Row direction a man of this color advances in.
    fn forward(self) -> i32 {
        match self {
            Color::Red => -1,
            Color::Black => 1,
        }
    }

    /// The promotion rank.
    fn back_rank(self) -> usize {
        match self {
            Color::Red => 0,
            Color::Black => 7,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    color: Color,
    king: bool,
}

fn parse_cell(cell: &Option<String>) -> Option<Piece> {
    match cell.as_deref() {
        Some("r") => Some(Piece { color: Color::Red, king: false }),
        Some("R") => Some(Piece { color: Color::Red, king: true }),
        Some("b") => Some(Piece { color: Color::Black, king: false }),
        Some("B") => Some(Piece { color: Color::Black, king: true }),
        _ => None,
    }
}

fn cell_for(piece: Piece) -> String {
    let c = piece.color.letter();
    if piece.king {
        c.to_ascii_uppercase().to_string()
    } else {
        c.to_string()
    }
}

fn in_bounds(r: i32, c: i32) -> bool {
    (0..8).contains(&r) && (0..8).contains(&c)
}

fn piece_at(board: &Board, r: usize, c: usize) -> Option<Piece> {
    parse_cell(&board[r][c])
}

/// Diagonal directions a piece may move/capture in. Men go forward only;
/// kings go everywhere.
fn directions(piece: Piece) -> Vec<(i32, i32)> {
    if piece.king {
        vec![(-1, -1), (-1, 1), (1, -1), (1, 1)]
    } else {
        let f = piece.color.forward();
        vec![(f, -1), (f, 1)]
    }
}

/// Whether the piece at (r, c) has at least one capture available.
fn has_capture_from(board: &Board, r: usize, c: usize) -> bool {
    let Some(piece) = piece_at(board, r, c) else {
        return false;
    };
    for (dr, dc) in directions(piece) {
        let (mr, mc) = (r as i32 + dr, c as i32 + dc);
        let (tr, tc) = (r as i32 + 2 * dr, c as i32 + 2 * dc);
        if !in_bounds(tr, tc) {
            continue;
        }
        let middle = piece_at(board, mr as usize, mc as usize);
        let target = piece_at(board, tr as usize, tc as usize);
        if target.is_none()
            && middle.is_some_and(|m| m.color == piece.color.opponent())
        {
            return true;
        }
    }
    false
}

fn any_capture_for(board: &Board, color: Color) -> bool {
    for r in 0..8 {
        for c in 0..8 {
            if piece_at(board, r, c).is_some_and(|p| p.color == color)
                && has_capture_from(board, r, c)
            {
                return true;
            }
        }
    }
    false
}

/// Whether the piece at (r, c) has any legal move at all.
fn has_any_move(board: &Board, r: usize, c: usize) -> bool {
    let Some(piece) = piece_at(board, r, c) else {
        return false;
    };
    if has_capture_from(board, r, c) {
        return true;
    }
    for (dr, dc) in directions(piece) {
        let (tr, tc) = (r as i32 + dr, c as i32 + dc);
        if in_bounds(tr, tc) && piece_at(board, tr as usize, tc as usize).is_none() {
            return true;
        }
    }
    false
}

fn color_has_moves(board: &Board, color: Color) -> bool {
    for r in 0..8 {
        for c in 0..8 {
            if piece_at(board, r, c).is_some_and(|p| p.color == color)
                && has_any_move(board, r, c)
            {
                return true;
            }
        }
    }
    false
}

fn starting_board() -> Board {
    let mut board: Board = vec![vec![None; 8]; 8];
    for (r, row) in board.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            if (r + c) % 2 == 1 {
                if r < 3 {
                    *cell = Some("b".to_string());
                } else if r > 4 {
                    *cell = Some("r".to_string());
                }
            }
        }
    }
    board
}

/// Validates and applies one move (step or capture sequence) on a scratch
/// board. Returns the applied board or a rejection message.
fn apply_move(board: &Board, mv: &MovePiece, color: Color) -> Result<Board, String> {
    let [mut r, mut c] = mv.from;
    if r >= 8 || c >= 8 {
        return Err("origin out of bounds".into());
    }
    if mv.path.is_empty() {
        return Err("empty move path".into());
    }
    let piece = piece_at(board, r, c).ok_or("no piece at origin")?;
    if piece.color != color {
        return Err("that piece is not yours".into());
    }

    let must_capture = any_capture_for(board, color);
    let mut scratch = board.clone();
    scratch[r][c] = None;
    let mut captured_any = false;

    for &[tr, tc] in &mv.path {
        if tr >= 8 || tc >= 8 {
            return Err("destination out of bounds".into());
        }
        if piece_at(&scratch, tr, tc).is_some() {
            return Err("destination occupied".into());
        }
        let (dr, dc) = (tr as i32 - r as i32, tc as i32 - c as i32);
        let legal_dir = directions(piece)
            .iter()
            .any(|&(fr, fc)| (dr.signum(), dc.signum()) == (fr, fc));
        if !legal_dir {
            return Err("illegal direction".into());
        }

        match (dr.abs(), dc.abs()) {
            (1, 1) => {
                // Plain step: only as the sole hop and only when no
                // capture is available anywhere.
                if mv.path.len() > 1 {
                    return Err("steps cannot chain".into());
                }
                if must_capture {
                    return Err("capture is mandatory".into());
                }
            }
            (2, 2) => {
                let (mr, mc) =
                    ((r as i32 + dr / 2) as usize, (c as i32 + dc / 2) as usize);
                let jumped = piece_at(&scratch, mr, mc)
                    .ok_or("nothing to capture")?;
                if jumped.color != color.opponent() {
                    return Err("cannot capture your own piece".into());
                }
                scratch[mr][mc] = None;
                captured_any = true;
            }
            _ => return Err("moves are diagonal".into()),
        }

        r = tr;
        c = tc;
    }

    // A capture sequence must be exhausted: place the piece, then verify
    // no further jump exists from the landing square.
    let promoted = !piece.king && r == color.back_rank();
    let landed = Piece {
        color,
        king: piece.king || promoted,
    };
    scratch[r][c] = Some(cell_for(landed));
    if captured_any && !promoted && has_capture_from(&scratch, r, c) {
        return Err("capture sequence must continue".into());
    }

    Ok(scratch)
}

struct MovePieceStrategy;

impl Strategy for MovePieceStrategy {
    fn execute(&self, ctx: CommandContext) -> Outcome {
        let mut st: State = match decode_state(&ctx) {
            Ok(s) => s,
            Err(out) => return out,
        };
        let player = match ctx.require_player() {
            Ok(p) => p.as_str().to_string(),
            Err(out) => return out,
        };

        if st.is_complete || st.phase != "playing" {
            return Outcome::reject(ErrorCode::InvalidMove, "series is over");
        }
        if st.current_player_id.as_deref() != Some(&player) {
            return Outcome::reject(ErrorCode::NotYourTurn, "not your turn");
        }
        let mv: MovePiece = match serde_json::from_value(ctx.payload.clone()) {
            Ok(m) => m,
            Err(_) => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "movePiece needs {from, path}",
                );
            }
        };
        let color = match st.players.get(&player).map(|s| s.color.as_str()) {
            Some("red") => Color::Red,
            Some("black") => Color::Black,
            _ => {
                return Outcome::reject(ErrorCode::ValidationError, "unknown seat")
            }
        };

        let board = match apply_move(&st.board, &mv, color) {
            Ok(b) => b,
            Err(reason) => return Outcome::reject(ErrorCode::InvalidMove, reason),
        };
        st.board = board;

        let opponent_color = color.opponent();
        let opponent = st
            .player_order
            .iter()
            .find(|id| id.as_str() != player)
            .cloned();
        let opponent_alive = color_has_moves(&st.board, opponent_color);

        if opponent_alive {
            st.current_player_id = opponent;
        } else {
            // Round over: no pieces or no moves left.
            let wins = st.series.wins.entry(player.clone()).or_insert(0);
            *wins += 1;
            if *wins >= st.series.target {
                st.winner = Some(player);
                st.is_complete = true;
                st.phase = "complete".into();
                st.current_player_id = None;
            } else {
                // Next round of the series; the other seat opens.
                st.series.round += 1;
                st.board = starting_board();
                st.current_player_id = st
                    .player_order
                    .get(st.series.round as usize % 2)
                    .cloned();
            }
        }

        Outcome::accept_state(&st)
    }
}

/// The Checkers game definition: best-of-three series between two seats.
pub struct Checkers;

impl GameDef for Checkers {
    fn game_id(&self) -> &'static str {
        GAME_ID
    }

    fn min_players(&self) -> usize {
        2
    }

    fn max_players(&self) -> usize {
        2
    }

    fn initial_state(&self, ctx: &SetupContext) -> Result<Value, GameError> {
        if ctx.roster.len() != 2 {
            return Err(GameError::Setup("checkers needs exactly 2 players".into()));
        }
        let colors = ["red", "black"];
        let mut players = BTreeMap::new();
        let mut order = Vec::new();
        for (entry, color) in ctx.roster.iter().zip(colors) {
            players.insert(
                entry.id.as_str().to_string(),
                Seat {
                    display_name: entry.display_name.clone(),
                    color: color.to_string(),
                },
            );
            order.push(entry.id.as_str().to_string());
        }
        let state = State {
            phase: "playing".into(),
            current_player_id: order.first().cloned(),
            player_order: order,
            is_complete: false,
            players,
            board: starting_board(),
            winner: None,
            series: Series {
                round: 0,
                wins: BTreeMap::new(),
                target: SERIES_TARGET,
            },
        };
        serde_json::to_value(&state).map_err(GameError::State)
    }

    fn strategy(&self, kind: &str) -> Option<&dyn Strategy> {
        match kind {
            "movePiece" => Some(&MovePieceStrategy),
            _ => None,
        }
    }

    fn command_kinds(&self) -> &'static [&'static str] {
        &["movePiece"]
    }
}
