//! Blackjack against a house dealer.
//!
//! Dealer hits on 16 or less and stands on 17 or more; naturals pay 3:2;
//! ties push. Bets are escrowed out of the balance when placed and paid
//! back (or not) at settlement.

use std::collections::BTreeMap;

use parlor_protocol::ErrorCode;
use parlor_room::{
    CommandContext, GameDef, GameError, Outcome, SetupContext, Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cards::{Card, Deck, blackjack_total, is_natural};
use crate::voting::{VoteChoice, VotingManager};
use crate::{GameRng, decode_state};

pub const GAME_ID: &str = "blackjack";

const DEFAULT_BALANCE: u64 = 100;
/// Dealer stands at this total or above.
const DEALER_STAND: u8 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum SeatStatus {
    /// Waiting to place a bet.
    Betting,
    /// Bet placed, waiting for the deal.
    Ready,
    /// In the hand, still deciding.
    Acting,
    Standing,
    Busted,
    /// Two-card 21.
    Natural,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seat {
    display_name: String,
    balance: u64,
    bet: u64,
    hand: Vec<Card>,
    status: SeatStatus,
    result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    phase: String,
    current_player_id: Option<String>,
    player_order: Vec<String>,
    is_complete: bool,
    players: BTreeMap<String, Seat>,
    dealer: Vec<Card>,
    deck: Deck,
    seed: u64,
    round: u32,
    votes: VotingManager,
}

impl State {
    fn seat_mut(&mut self, player: &str) -> Option<&mut Seat> {
        self.players.get_mut(player)
    }

    /// Moves the turn to the next seat still acting, or runs the dealer
    /// and settles if everyone is done.
    fn advance_or_settle(&mut self) {
        let next = self
            .player_order
            .iter()
            .find(|id| {
                self.players
                    .get(*id)
                    .is_some_and(|s| s.status == SeatStatus::Acting)
            })
            .cloned();
        match next {
            Some(id) => self.current_player_id = Some(id),
            None => self.settle(),
        }
    }

    fn deal_initial(&mut self) {
        for id in self.player_order.clone() {
            let cards = self.deck.deal(2);
            if let Some(seat) = self.seat_mut(&id) {
                seat.hand = cards;
                seat.status = if is_natural(&seat.hand) {
                    SeatStatus::Natural
                } else {
                    SeatStatus::Acting
                };
            }
        }
        self.dealer = self.deck.deal(2);
        self.phase = "acting".into();
        self.advance_or_settle();
    }

    fn settle(&mut self) {
        while blackjack_total(&self.dealer).0 < DEALER_STAND {
            match self.deck.draw() {
                Some(card) => self.dealer.push(card),
                None => break,
            }
        }
        let dealer_total = blackjack_total(&self.dealer).0;
        let dealer_bust = dealer_total > 21;
        let dealer_natural = is_natural(&self.dealer);

        for seat in self.players.values_mut() {
            let total = blackjack_total(&seat.hand).0;
            let (payout, result) = match seat.status {
                SeatStatus::Busted => (0, "lose"),
                SeatStatus::Natural if !dealer_natural => {
                    // Stake back plus three-to-two winnings.
                    (seat.bet + seat.bet * 3 / 2, "blackjack")
                }
                SeatStatus::Natural => (seat.bet, "push"),
                _ if dealer_natural => (0, "lose"),
                _ if dealer_bust || total > dealer_total => (seat.bet * 2, "win"),
                _ if total == dealer_total => (seat.bet, "push"),
                _ => (0, "lose"),
            };
            seat.balance += payout;
            seat.result = Some(result.to_string());
        }

        self.phase = "settled".into();
        self.is_complete = true;
        self.current_player_id = None;
    }

    fn next_round(&mut self) {
        self.round += 1;
        let mut rng = GameRng::for_round(self.seed, self.round);
        self.deck = Deck::shuffled(&mut rng);
        self.dealer.clear();
        self.votes = VotingManager::new();
        for seat in self.players.values_mut() {
            seat.bet = 0;
            seat.hand.clear();
            seat.status = SeatStatus::Betting;
            seat.result = None;
        }
        self.phase = "betting".into();
        self.is_complete = false;
        self.current_player_id = None;
    }
}

#[derive(Debug, Deserialize)]
struct PlaceBet {
    amount: u64,
}

struct PlaceBetStrategy;

impl Strategy for PlaceBetStrategy {
    fn execute(&self, ctx: CommandContext) -> Outcome {
        let mut st: State = match decode_state(&ctx) {
            Ok(s) => s,
            Err(out) => return out,
        };
        let player = match ctx.require_player() {
            Ok(p) => p.as_str().to_string(),
            Err(out) => return out,
        };
        if st.phase != "betting" {
            return Outcome::reject(ErrorCode::InvalidMove, "betting is closed");
        }
        let bet: PlaceBet = match serde_json::from_value(ctx.payload.clone()) {
            Ok(b) => b,
            Err(_) => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "placeBet needs {amount}",
                );
            }
        };
        if bet.amount == 0 {
            return Outcome::reject(ErrorCode::InvalidMove, "bet must be positive");
        }
        let Some(seat) = st.seat_mut(&player) else {
            return Outcome::reject(ErrorCode::ValidationError, "unknown seat");
        };
        if seat.status != SeatStatus::Betting {
            return Outcome::reject(ErrorCode::InvalidMove, "bet already placed");
        }
        if seat.balance < bet.amount {
            return Outcome::reject(
                ErrorCode::InsufficientBalance,
                "insufficient balance",
            );
        }
        seat.balance -= bet.amount;
        seat.bet = bet.amount;
        seat.status = SeatStatus::Ready;

        if st
            .players
            .values()
            .all(|s| s.status == SeatStatus::Ready)
        {
            st.deal_initial();
        }
        Outcome::accept_state(&st)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Action {
    action: String,
}

struct ActionStrategy;

impl Strategy for ActionStrategy {
    fn execute(&self, ctx: CommandContext) -> Outcome {
        let mut st: State = match decode_state(&ctx) {
            Ok(s) => s,
            Err(out) => return out,
        };
        let player = match ctx.require_player() {
            Ok(p) => p.as_str().to_string(),
            Err(out) => return out,
        };
        if st.phase != "acting" {
            return Outcome::reject(ErrorCode::InvalidMove, "no hand in play");
        }
        if st.current_player_id.as_deref() != Some(&player) {
            return Outcome::reject(ErrorCode::NotYourTurn, "not your turn");
        }
        let action: Action = match serde_json::from_value(ctx.payload.clone()) {
            Ok(a) => a,
            Err(_) => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "action needs {action}",
                );
            }
        };

        match action.action.as_str() {
            "hit" => {
                let card = st.deck.draw();
                let Some(seat) = st.seat_mut(&player) else {
                    return Outcome::reject(ErrorCode::ValidationError, "unknown seat");
                };
                if let Some(card) = card {
                    seat.hand.push(card);
                }
                if blackjack_total(&seat.hand).0 > 21 {
                    seat.status = SeatStatus::Busted;
                    st.advance_or_settle();
                }
            }
            "stand" => {
                if let Some(seat) = st.seat_mut(&player) {
                    seat.status = SeatStatus::Standing;
                }
                st.advance_or_settle();
            }
            "double" => {
                let card = st.deck.draw();
                let Some(seat) = st.seat_mut(&player) else {
                    return Outcome::reject(ErrorCode::ValidationError, "unknown seat");
                };
                if seat.hand.len() != 2 {
                    return Outcome::reject(
                        ErrorCode::InvalidMove,
                        "double only on the first two cards",
                    );
                }
                if seat.balance < seat.bet {
                    return Outcome::reject(
                        ErrorCode::InsufficientBalance,
                        "insufficient balance to double",
                    );
                }
                seat.balance -= seat.bet;
                seat.bet *= 2;
                if let Some(card) = card {
                    seat.hand.push(card);
                }
                seat.status = if blackjack_total(&seat.hand).0 > 21 {
                    SeatStatus::Busted
                } else {
                    SeatStatus::Standing
                };
                st.advance_or_settle();
            }
            _ => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "action must be hit, stand, or double",
                );
            }
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
        if st.phase != "settled" {
            return Outcome::reject(ErrorCode::InvalidMove, "nothing to vote on");
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

/// The Blackjack game definition.
pub struct Blackjack;

impl GameDef for Blackjack {
    fn game_id(&self) -> &'static str {
        GAME_ID
    }

    fn min_players(&self) -> usize {
        1
    }

    fn max_players(&self) -> usize {
        6
    }

    fn initial_state(&self, ctx: &SetupContext) -> Result<Value, GameError> {
        if ctx.roster.is_empty() {
            return Err(GameError::Setup("blackjack needs players".into()));
        }
        let balance = ctx
            .options
            .as_ref()
            .and_then(|o| o.get("startingBalance"))
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_BALANCE);

        let mut players = BTreeMap::new();
        let mut order = Vec::new();
        for entry in &ctx.roster {
            players.insert(
                entry.id.as_str().to_string(),
                Seat {
                    display_name: entry.display_name.clone(),
                    balance,
                    bet: 0,
                    hand: Vec::new(),
                    status: SeatStatus::Betting,
                    result: None,
                },
            );
            order.push(entry.id.as_str().to_string());
        }

        let mut rng = GameRng::for_round(ctx.seed, 0);
        let state = State {
            phase: "betting".into(),
            current_player_id: None,
            player_order: order,
            is_complete: false,
            players,
            dealer: Vec::new(),
            deck: Deck::shuffled(&mut rng),
            seed: ctx.seed,
            round: 0,
            votes: VotingManager::new(),
        };
        serde_json::to_value(&state).map_err(GameError::State)
    }

    fn strategy(&self, kind: &str) -> Option<&dyn Strategy> {
        match kind {
            "placeBet" => Some(&PlaceBetStrategy),
            "action" => Some(&ActionStrategy),
            "vote" => Some(&VoteStrategy),
            _ => None,
        }
    }

    fn command_kinds(&self) -> &'static [&'static str] {
        &["placeBet", "action", "vote"]
    }
}
