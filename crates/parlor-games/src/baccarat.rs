//! Punto banco baccarat. Players stake on the player hand, the banker
//! hand, or a tie; the table then plays itself out by the standard
//! third-card tableau.
//!
//! Payouts: player 1:1, banker 0.95:1, tie 8:1. Player/banker stakes push
//! when the result is a tie.

use std::collections::BTreeMap;

use parlor_protocol::ErrorCode;
use parlor_room::{
    CommandContext, GameDef, GameError, Outcome, SetupContext, Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cards::{Card, Deck, baccarat_points};
use crate::voting::{VoteChoice, VotingManager};
use crate::{GameRng, decode_state};

pub const GAME_ID: &str = "baccarat";

const DEFAULT_BALANCE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BetTarget {
    Player,
    Banker,
    Tie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stake {
    on: BetTarget,
    amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seat {
    display_name: String,
    balance: u64,
    stake: Option<Stake>,
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
    player_hand: Vec<Card>,
    banker_hand: Vec<Card>,
    /// "player" | "banker" | "tie" once dealt.
    outcome: Option<String>,
    deck: Deck,
    seed: u64,
    round: u32,
    votes: VotingManager,
}

/// Whether the banker draws a third card, per the standard tableau.
/// `player_third` is the baccarat value of the player's third card, or
/// `None` when the player stood.
fn banker_draws(banker_total: u8, player_third: Option<u8>) -> bool {
    match player_third {
        None => banker_total <= 5,
        Some(v) => match banker_total {
            0..=2 => true,
            3 => v != 8,
            4 => (2..=7).contains(&v),
            5 => (4..=7).contains(&v),
            6 => v == 6 || v == 7,
            _ => false,
        },
    }
}

impl State {
    fn deal_and_settle(&mut self) {
        // Alternating deal: player, banker, player, banker.
        for _ in 0..2 {
            self.player_hand.extend(self.deck.deal(1));
            self.banker_hand.extend(self.deck.deal(1));
        }

        let player_total = baccarat_points(&self.player_hand);
        let banker_total = baccarat_points(&self.banker_hand);
        let natural = player_total >= 8 || banker_total >= 8;

        let mut player_third: Option<u8> = None;
        if !natural {
            if player_total <= 5 {
                if let Some(card) = self.deck.draw() {
                    player_third = Some(baccarat_points(&[card]));
                    self.player_hand.push(card);
                }
            }
            if banker_draws(banker_total, player_third) {
                if let Some(card) = self.deck.draw() {
                    self.banker_hand.push(card);
                }
            }
        }

        let player_total = baccarat_points(&self.player_hand);
        let banker_total = baccarat_points(&self.banker_hand);
        let outcome = match player_total.cmp(&banker_total) {
            std::cmp::Ordering::Greater => BetTarget::Player,
            std::cmp::Ordering::Less => BetTarget::Banker,
            std::cmp::Ordering::Equal => BetTarget::Tie,
        };
        self.outcome = Some(
            match outcome {
                BetTarget::Player => "player",
                BetTarget::Banker => "banker",
                BetTarget::Tie => "tie",
            }
            .to_string(),
        );

        for seat in self.players.values_mut() {
            let Some(stake) = &seat.stake else { continue };
            let (payout, result) = if stake.on == outcome {
                let winnings = match outcome {
                    BetTarget::Player => stake.amount,
                    // Banker pays 0.95:1 (the house nicks five percent).
                    BetTarget::Banker => stake.amount * 95 / 100,
                    BetTarget::Tie => stake.amount * 8,
                };
                (stake.amount + winnings, "win")
            } else if outcome == BetTarget::Tie {
                // Player/banker stakes push on a tie.
                (stake.amount, "push")
            } else {
                (0, "lose")
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
        self.player_hand.clear();
        self.banker_hand.clear();
        self.outcome = None;
        self.votes = VotingManager::new();
        for seat in self.players.values_mut() {
            seat.stake = None;
            seat.result = None;
        }
        self.phase = "betting".into();
        self.is_complete = false;
    }
}

#[derive(Debug, Deserialize)]
struct PlaceBet {
    on: BetTarget,
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
                    "placeBet needs {on: player|banker|tie, amount}",
                );
            }
        };
        if bet.amount == 0 {
            return Outcome::reject(ErrorCode::InvalidMove, "stake must be positive");
        }
        let Some(seat) = st.players.get_mut(&player) else {
            return Outcome::reject(ErrorCode::ValidationError, "unknown seat");
        };
        if seat.stake.is_some() {
            return Outcome::reject(ErrorCode::InvalidMove, "stake already placed");
        }
        if seat.balance < bet.amount {
            return Outcome::reject(
                ErrorCode::InsufficientBalance,
                "insufficient balance",
            );
        }
        seat.balance -= bet.amount;
        seat.stake = Some(Stake {
            on: bet.on,
            amount: bet.amount,
        });

        if st.players.values().all(|s| s.stake.is_some()) {
            st.deal_and_settle();
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

/// The baccarat game definition.
pub struct Baccarat;

impl GameDef for Baccarat {
    fn game_id(&self) -> &'static str {
        GAME_ID
    }

    fn min_players(&self) -> usize {
        1
    }

    fn max_players(&self) -> usize {
        8
    }

    fn initial_state(&self, ctx: &SetupContext) -> Result<Value, GameError> {
        if ctx.roster.is_empty() {
            return Err(GameError::Setup("baccarat needs players".into()));
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
                    stake: None,
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
            player_hand: Vec::new(),
            banker_hand: Vec::new(),
            outcome: None,
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
            "vote" => Some(&VoteStrategy),
            _ => None,
        }
    }

    fn command_kinds(&self) -> &'static [&'static str] {
        &["placeBet", "vote"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;
    use crate::test_support::{ctx, setup};
    use parlor_room::GameState;
    use serde_json::json;

    fn c(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn initial(players: &[&str]) -> GameState {
        let doc = Baccarat.initial_state(&setup(players, 13)).unwrap();
        GameState::new(doc)
    }

    /// Scripts the deck; the last card is dealt first. Deal order is
    /// player, banker, player, banker, then player third, banker third.
    fn script_deck(state: &mut GameState, cards: Vec<Card>) {
        let mut doc = state.doc().clone();
        doc["deck"] = serde_json::to_value(Deck::from_cards(cards)).unwrap();
        state.replace(doc);
    }

    fn stake(state: &mut GameState, player: &str, on: &str, amount: u64) {
        match PlaceBetStrategy.execute(ctx(
            state,
            player,
            json!({"on": on, "amount": amount}),
        )) {
            Outcome::Accept { next } => {
                state.replace(next);
            }
            Outcome::Reject { code, message } => panic!("rejected: {code} {message}"),
        }
    }

    #[test]
    fn test_banker_draw_tableau() {
        // Player stood: banker draws to 5, stands on 6.
        assert!(banker_draws(5, None));
        assert!(!banker_draws(6, None));
        // Player drew: the conditional rows.
        assert!(banker_draws(2, Some(0)));
        assert!(banker_draws(3, Some(7)));
        assert!(!banker_draws(3, Some(8)));
        assert!(banker_draws(4, Some(2)));
        assert!(!banker_draws(4, Some(1)));
        assert!(banker_draws(5, Some(4)));
        assert!(!banker_draws(5, Some(3)));
        assert!(banker_draws(6, Some(6)));
        assert!(!banker_draws(6, Some(5)));
        assert!(!banker_draws(7, Some(6)));
    }

    #[test]
    fn test_naturals_stand_pat() {
        // Player 4+4=8 natural, banker 2+5=7: player wins, two cards each.
        let mut state = initial(&["a"]);
        script_deck(
            &mut state,
            vec![
                c(5, Suit::Hearts),  // banker 2nd
                c(4, Suit::Clubs),   // player 2nd
                c(2, Suit::Spades),  // banker 1st
                c(4, Suit::Diamonds), // player 1st
            ],
        );
        stake(&mut state, "a", "player", 10);

        let doc = state.doc();
        assert_eq!(doc["playerHand"].as_array().unwrap().len(), 2);
        assert_eq!(doc["bankerHand"].as_array().unwrap().len(), 2);
        assert_eq!(doc["outcome"], "player");
        // 1:1 — stake back plus equal winnings.
        assert_eq!(doc["players"]["a"]["balance"], 110);
        assert!(state.is_complete());
    }

    #[test]
    fn test_banker_win_pays_ninety_five_percent() {
        // Player K+6=6 stands; banker 3+4=7 stands. Banker wins.
        let mut state = initial(&["a"]);
        script_deck(
            &mut state,
            vec![
                c(4, Suit::Hearts),        // banker 2nd
                c(6, Suit::Clubs),         // player 2nd
                c(3, Suit::Spades),        // banker 1st
                c(Card::KING, Suit::Diamonds), // player 1st
            ],
        );
        stake(&mut state, "a", "banker", 100);
        let doc = state.doc();
        assert_eq!(doc["outcome"], "banker");
        // 100 - 100 + (100 + 95) = 195.
        assert_eq!(doc["players"]["a"]["balance"], 195);
    }

    #[test]
    fn test_tie_pays_eight_to_one_and_pushes_side_bets() {
        // Both hands total 7 with no draws.
        let mut state = initial(&["tied", "sided"]);
        script_deck(
            &mut state,
            vec![
                c(3, Suit::Hearts),  // banker 2nd (4+3=7)
                c(2, Suit::Clubs),   // player 2nd (5+2=7)
                c(4, Suit::Spades),  // banker 1st
                c(5, Suit::Diamonds), // player 1st
            ],
        );
        stake(&mut state, "tied", "tie", 10);
        stake(&mut state, "sided", "player", 30);

        let doc = state.doc();
        assert_eq!(doc["outcome"], "tie");
        // Tie stake: 100 - 10 + (10 + 80) = 180.
        assert_eq!(doc["players"]["tied"]["balance"], 180);
        // Player stake pushes: back to 100.
        assert_eq!(doc["players"]["sided"]["balance"], 100);
    }

    #[test]
    fn test_player_third_card_drives_banker_draw() {
        // Player 2+3=5 draws a 9 (value 9); banker 3+3=6 with player
        // third 9 → banker stands (6 draws only on 6-7).
        let mut state = initial(&["a"]);
        script_deck(
            &mut state,
            vec![
                c(9, Suit::Hearts),  // player third
                c(3, Suit::Clubs),   // banker 2nd
                c(3, Suit::Hearts),  // player 2nd
                c(3, Suit::Spades),  // banker 1st
                c(2, Suit::Diamonds), // player 1st
            ],
        );
        stake(&mut state, "a", "player", 10);
        let doc = state.doc();
        assert_eq!(doc["playerHand"].as_array().unwrap().len(), 3);
        assert_eq!(doc["bankerHand"].as_array().unwrap().len(), 2);
        // Player 5+9 = 14 → 4; banker 6. Banker wins.
        assert_eq!(doc["outcome"], "banker");
    }

    #[test]
    fn test_double_stake_rejected() {
        let mut state = initial(&["a", "b"]);
        stake(&mut state, "a", "player", 10);
        match PlaceBetStrategy.execute(ctx(&state, "a", json!({"on": "tie", "amount": 5}))) {
            Outcome::Reject { code, .. } => assert_eq!(code, ErrorCode::InvalidMove),
            Outcome::Accept { .. } => panic!("double stake accepted"),
        }
    }

    #[test]
    fn test_vote_flow() {
        let mut state = initial(&["a", "b"]);
        stake(&mut state, "a", "player", 10);
        stake(&mut state, "b", "banker", 10);
        assert!(state.is_complete());

        for (p, choice) in [("a", "newGame"), ("b", "newGame")] {
            match VoteStrategy.execute(ctx(&state, p, json!({"choice": choice}))) {
                Outcome::Accept { next } => {
                    state.replace(next);
                }
                Outcome::Reject { code, message } => panic!("{code} {message}"),
            }
        }
        assert!(!state.is_complete());
        assert_eq!(state.phase(), Some("betting"));
        assert_eq!(state.doc()["round"], 1);
    }
}
