//! Tic-Tac-Toe: the smallest shipped game, and the reference for how a
//! [`GameDef`] is put together.

use std::collections::BTreeMap;

use parlor_protocol::ErrorCode;
use parlor_room::{
    CommandContext, GameDef, GameError, Outcome, SetupContext, Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode_state;

pub const GAME_ID: &str = "tictactoe";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seat {
    display_name: String,
    marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    phase: String,
    current_player_id: Option<String>,
    player_order: Vec<String>,
    is_complete: bool,
    players: BTreeMap<String, Seat>,
    /// 3×3 grid of markers ("X"/"O") or null.
    board: Vec<Vec<Option<String>>>,
    winner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceMark {
    row: usize,
    col: usize,
}

fn winning_line(board: &[Vec<Option<String>>]) -> Option<String> {
    let cell = |r: usize, c: usize| board[r][c].as_deref();
    let lines: [[(usize, usize); 3]; 8] = [
        [(0, 0), (0, 1), (0, 2)],
        [(1, 0), (1, 1), (1, 2)],
        [(2, 0), (2, 1), (2, 2)],
        [(0, 0), (1, 0), (2, 0)],
        [(0, 1), (1, 1), (2, 1)],
        [(0, 2), (1, 2), (2, 2)],
        [(0, 0), (1, 1), (2, 2)],
        [(0, 2), (1, 1), (2, 0)],
    ];
    for line in lines {
        let [a, b, c] = line;
        if let Some(mark) = cell(a.0, a.1) {
            if cell(b.0, b.1) == Some(mark) && cell(c.0, c.1) == Some(mark) {
                return Some(mark.to_string());
            }
        }
    }
    None
}

struct PlaceMarkStrategy;

impl Strategy for PlaceMarkStrategy {
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
            return Outcome::reject(ErrorCode::InvalidMove, "game is over");
        }
        if st.current_player_id.as_deref() != Some(&player) {
            return Outcome::reject(ErrorCode::NotYourTurn, "not your turn");
        }

        let mv: PlaceMark = match serde_json::from_value(ctx.payload.clone()) {
            Ok(m) => m,
            Err(_) => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "placeMark needs {row, col}",
                );
            }
        };
        if mv.row >= 3 || mv.col >= 3 {
            return Outcome::reject(ErrorCode::InvalidMove, "cell out of bounds");
        }
        if st.board[mv.row][mv.col].is_some() {
            return Outcome::reject(ErrorCode::InvalidMove, "cell occupied");
        }

        let marker = match st.players.get(&player) {
            Some(seat) => seat.marker.clone(),
            None => {
                return Outcome::reject(ErrorCode::ValidationError, "unknown seat");
            }
        };
        st.board[mv.row][mv.col] = Some(marker);

        if let Some(winning_mark) = winning_line(&st.board) {
            let winner = st
                .players
                .iter()
                .find(|(_, seat)| seat.marker == winning_mark)
                .map(|(id, _)| id.clone());
            st.winner = winner;
            st.is_complete = true;
            st.phase = "complete".into();
            st.current_player_id = None;
        } else if st.board.iter().flatten().all(Option::is_some) {
            // Full board, no line: a draw.
            st.winner = None;
            st.is_complete = true;
            st.phase = "complete".into();
            st.current_player_id = None;
        } else {
            let next = st
                .player_order
                .iter()
                .find(|id| id.as_str() != player)
                .cloned();
            st.current_player_id = next;
        }

        Outcome::accept_state(&st)
    }
}

/// The Tic-Tac-Toe game definition.
pub struct TicTacToe;

impl GameDef for TicTacToe {
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
            return Err(GameError::Setup("tictactoe needs exactly 2 players".into()));
        }
        let markers = ["X", "O"];
        let mut players = BTreeMap::new();
        let mut order = Vec::new();
        for (entry, marker) in ctx.roster.iter().zip(markers) {
            players.insert(
                entry.id.as_str().to_string(),
                Seat {
                    display_name: entry.display_name.clone(),
                    marker: marker.to_string(),
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
            board: vec![vec![None; 3]; 3],
            winner: None,
        };
        serde_json::to_value(&state).map_err(GameError::State)
    }

    fn strategy(&self, kind: &str) -> Option<&dyn Strategy> {
        match kind {
            "placeMark" => Some(&PlaceMarkStrategy),
            _ => None,
        }
    }

    fn command_kinds(&self) -> &'static [&'static str] {
        &["placeMark"]
    }
}
