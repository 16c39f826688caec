//! Texas Hold'em with 5/10 blinds.
//!
//! Streets run preflop → flop → turn → river → showdown. The betting
//! engine is the shared [`BettingManager`]; this module owns turn order,
//! street advancement, and showdown evaluation (best five of seven).

use std::collections::BTreeMap;

use parlor_protocol::ErrorCode;
use parlor_room::{
    CommandContext, GameDef, GameError, Outcome, SetupContext, Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::betting::{BetError, BettingManager, PayoutMode, SeatStatus};
use crate::cards::{Card, Deck};
use crate::hand::best_hand;
use crate::voting::{VoteChoice, VotingManager};
use crate::{GameRng, decode_state};

pub const GAME_ID: &str = "texas-holdem";

pub const SMALL_BLIND: u64 = 5;
pub const BIG_BLIND: u64 = 10;
const DEFAULT_BALANCE: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seat {
    display_name: String,
    hole: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    phase: String,
    current_player_id: Option<String>,
    player_order: Vec<String>,
    is_complete: bool,
    players: BTreeMap<String, Seat>,
    betting: BettingManager,
    community: Vec<Card>,
    deck: Deck,
    /// Button position as an index into `player_order`.
    dealer_index: usize,
    /// Players still owed an action on the current street.
    need_action: Vec<String>,
    winners: Vec<String>,
    seed: u64,
    round: u32,
    votes: VotingManager,
}

impl State {
    fn seat_index(&self, player: &str) -> Option<usize> {
        self.player_order.iter().position(|p| p == player)
    }

    fn is_active(&self, player: &str) -> bool {
        self.betting
            .seats
            .get(player)
            .is_some_and(|s| s.status == SeatStatus::Active)
    }

    fn active_players(&self) -> Vec<String> {
        self.player_order
            .iter()
            .filter(|p| self.is_active(p))
            .cloned()
            .collect()
    }

    /// Next player needing action, scanning clockwise from `after`.
    fn next_needing(&self, after: &str) -> Option<String> {
        let start = self.seat_index(after)?;
        let n = self.player_order.len();
        (1..=n)
            .map(|i| &self.player_order[(start + i) % n])
            .find(|p| self.need_action.contains(p))
            .cloned()
    }

    /// First active player after the given seat index, clockwise.
    fn first_active_after(&self, index: usize) -> Option<String> {
        let n = self.player_order.len();
        (1..=n)
            .map(|i| &self.player_order[(index + i) % n])
            .find(|p| self.is_active(p))
            .cloned()
    }

    fn deal_hand(&mut self) {
        for id in self.player_order.clone() {
            let hole = self.deck.deal(2);
            if let Some(seat) = self.players.get_mut(&id) {
                seat.hole = hole;
            }
        }

        self.betting.start_round("preflop");
        let n = self.player_order.len();
        // Heads-up: the button posts the small blind.
        let (sb_idx, bb_idx) = if n == 2 {
            (self.dealer_index, (self.dealer_index + 1) % n)
        } else {
            ((self.dealer_index + 1) % n, (self.dealer_index + 2) % n)
        };
        let sb = self.player_order[sb_idx].clone();
        let bb = self.player_order[bb_idx].clone();
        // A short stack posts what it has.
        if self.betting.place_bet(&sb, SMALL_BLIND).is_err() {
            let _ = self.betting.all_in(&sb);
        }
        if self.betting.place_bet(&bb, BIG_BLIND).is_err() {
            let _ = self.betting.all_in(&bb);
        }

        self.phase = "preflop".into();
        self.need_action = self.active_players();
        self.current_player_id = self.first_active_after(bb_idx);
    }

    /// Advances to the next street, or showdown past the river. When fewer
    /// than two seats can still act, the remaining board runs out.
    fn advance_street(&mut self) {
        loop {
            match self.phase.as_str() {
                "preflop" => {
                    self.community.extend(self.deck.deal(3));
                    self.phase = "flop".into();
                }
                "flop" => {
                    self.community.extend(self.deck.deal(1));
                    self.phase = "turn".into();
                }
                "turn" => {
                    self.community.extend(self.deck.deal(1));
                    self.phase = "river".into();
                }
                _ => {
                    self.showdown();
                    return;
                }
            }

            let actives = self.active_players();
            if actives.len() >= 2 {
                self.betting.start_round(&self.phase.clone());
                self.need_action = actives;
                self.current_player_id = self.first_active_after(self.dealer_index);
                return;
            }
            // All-in runout: nobody can act, keep dealing.
        }
    }

    fn showdown(&mut self) {
        let contenders = self.betting.contenders();
        let mut best: Option<crate::hand::HandRank> = None;
        let mut winners: Vec<String> = Vec::new();
        for id in &contenders {
            let Some(seat) = self.players.get(id) else { continue };
            let mut cards = seat.hole.clone();
            cards.extend(self.community.iter().copied());
            let rank = best_hand(&cards);
            match &best {
                Some(b) if rank > *b => {
                    best = Some(rank);
                    winners = vec![id.clone()];
                }
                Some(b) if rank == *b => winners.push(id.clone()),
                Some(_) => {}
                None => {
                    best = Some(rank);
                    winners = vec![id.clone()];
                }
            }
        }
        self.finish(winners);
    }

    fn finish(&mut self, winners: Vec<String>) {
        let _ = self.betting.payout(&winners, PayoutMode::Equal);
        self.winners = winners;
        self.phase = "complete".into();
        self.is_complete = true;
        self.current_player_id = None;
        self.need_action.clear();
    }

    fn next_round(&mut self) {
        self.round += 1;
        self.dealer_index = (self.dealer_index + 1) % self.player_order.len();
        let mut rng = GameRng::for_round(self.seed, self.round);
        self.deck = Deck::shuffled(&mut rng);
        self.community.clear();
        self.winners.clear();
        self.votes = VotingManager::new();
        for seat in self.players.values_mut() {
            seat.hole.clear();
        }
        // Balances carry over; bets and statuses reset.
        let balances: Vec<(String, u64)> = self
            .player_order
            .iter()
            .map(|id| {
                let balance = self
                    .betting
                    .seats
                    .get(id)
                    .map(|s| s.balance)
                    .unwrap_or(0);
                (id.clone(), balance)
            })
            .collect();
        self.betting = BettingManager::new(&balances);
        self.is_complete = false;
        self.deal_hand();
    }
}

fn bet_error(e: BetError) -> Outcome {
    let code = match e {
        BetError::InsufficientBalance => ErrorCode::InsufficientBalance,
        _ => ErrorCode::InvalidMove,
    };
    Outcome::reject(code, e.to_string())
}

#[derive(Debug, Deserialize)]
struct BetMove {
    action: String,
    amount: Option<u64>,
}

struct BetStrategy;

impl Strategy for BetStrategy {
    fn execute(&self, ctx: CommandContext) -> Outcome {
        let mut st: State = match decode_state(&ctx) {
            Ok(s) => s,
            Err(out) => return out,
        };
        let player = match ctx.require_player() {
            Ok(p) => p.as_str().to_string(),
            Err(out) => return out,
        };
        if !matches!(st.phase.as_str(), "preflop" | "flop" | "turn" | "river") {
            return Outcome::reject(ErrorCode::InvalidMove, "no betting street open");
        }
        if st.current_player_id.as_deref() != Some(&player) {
            return Outcome::reject(ErrorCode::NotYourTurn, "not your turn");
        }
        let mv: BetMove = match serde_json::from_value(ctx.payload.clone()) {
            Ok(m) => m,
            Err(_) => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "bet needs {action, amount?}",
                );
            }
        };

        let mut reopened = false;
        match mv.action.as_str() {
            "call" => {
                if let Err(e) = st.betting.call(&player) {
                    return bet_error(e);
                }
            }
            "check" => {
                if let Err(e) = st.betting.check(&player) {
                    return bet_error(e);
                }
            }
            "fold" => {
                if let Err(e) = st.betting.fold(&player) {
                    return bet_error(e);
                }
            }
            "raise" => {
                let Some(amount) = mv.amount else {
                    return Outcome::reject(
                        ErrorCode::ValidationError,
                        "raise needs {amount}",
                    );
                };
                if let Err(e) = st.betting.raise(&player, amount) {
                    return bet_error(e);
                }
                reopened = true;
            }
            "allIn" => {
                let before = st.betting.current_bet;
                if let Err(e) = st.betting.all_in(&player) {
                    return bet_error(e);
                }
                reopened = st.betting.current_bet > before;
            }
            _ => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "action must be call, raise, check, fold, or allIn",
                );
            }
        }

        // A raise re-opens the action for everyone else still active.
        if reopened {
            st.need_action = st
                .active_players()
                .into_iter()
                .filter(|p| p != &player)
                .collect();
        } else {
            st.need_action.retain(|p| p != &player);
        }
        // Folded and all-in seats owe nothing.
        let still_active = st.active_players();
        st.need_action.retain(|p| still_active.contains(p));

        let contenders = st.betting.contenders();
        if contenders.len() == 1 {
            // Everyone else folded; no showdown.
            st.finish(contenders);
        } else if st.need_action.is_empty() && st.betting.is_round_complete() {
            st.advance_street();
        } else {
            st.current_player_id = st.next_needing(&player);
        }

        Outcome::accept_state(&st)
    }
}

#[derive(Debug, Deserialize)]
struct Vote {
    choice: VoteChoice,
}

struct VoteStrategy;

impl Strategy for VoteStrategy {
    fn execute(&self, ctx: CommandContext) -> Outcome {
        let mut st: State = match decode_state(&ctx) {
            Ok(s) => s,
            Err(out) => return out,
        };
        let player = match ctx.require_player() {
            Ok(p) => p.as_str().to_string(),
            Err(out) => return out,
        };
        if st.phase != "complete" {
            return Outcome::reject(ErrorCode::InvalidMove, "hand still running");
        }
        let vote: Vote = match serde_json::from_value(ctx.payload.clone()) {
            Ok(v) => v,
            Err(_) => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "vote needs {choice: newGame|lobby}",
                );
            }
        };
        if st.votes.cast(&player, vote.choice).is_err() {
            return Outcome::reject(ErrorCode::InvalidMove, "already voted");
        }
        match st.votes.resolve(&st.player_order) {
            Some(VoteChoice::NewGame) => st.next_round(),
            Some(VoteChoice::Lobby) => {
                st.phase = "lobby".into();
                st.current_player_id = None;
            }
            None => {}
        }
        Outcome::accept_state(&st)
    }
}

/// The Texas Hold'em game definition.
pub struct TexasHoldem;

impl GameDef for TexasHoldem {
    fn game_id(&self) -> &'static str {
        GAME_ID
    }

    fn min_players(&self) -> usize {
        2
    }

    fn max_players(&self) -> usize {
        8
    }

    fn initial_state(&self, ctx: &SetupContext) -> Result<Value, GameError> {
        if ctx.roster.len() < 2 {
            return Err(GameError::Setup("holdem needs at least 2 players".into()));
        }
        let balance = ctx
            .options
            .as_ref()
            .and_then(|o| o.get("startingBalance"))
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_BALANCE);

        let mut players = BTreeMap::new();
        let mut order = Vec::new();
        let mut balances = Vec::new();
        for entry in &ctx.roster {
            players.insert(
                entry.id.as_str().to_string(),
                Seat {
                    display_name: entry.display_name.clone(),
                    hole: Vec::new(),
                },
            );
            order.push(entry.id.as_str().to_string());
            balances.push((entry.id.as_str().to_string(), balance));
        }

        let mut rng = GameRng::for_round(ctx.seed, 0);
        let mut state = State {
            phase: "preflop".into(),
            current_player_id: None,
            player_order: order,
            is_complete: false,
            players,
            betting: BettingManager::new(&balances),
            community: Vec::new(),
            deck: Deck::shuffled(&mut rng),
            dealer_index: 0,
            need_action: Vec::new(),
            winners: Vec::new(),
            seed: ctx.seed,
            round: 0,
            votes: VotingManager::new(),
        };
        state.deal_hand();
        serde_json::to_value(&state).map_err(GameError::State)
    }

    fn strategy(&self, kind: &str) -> Option<&dyn Strategy> {
        match kind {
            "bet" => Some(&BetStrategy),
            "vote" => Some(&VoteStrategy),
            _ => None,
        }
    }

    fn command_kinds(&self) -> &'static [&'static str] {
        &["bet", "vote"]
    }
}
