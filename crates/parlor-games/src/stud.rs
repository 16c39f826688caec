//! Five-card stud: one hole card down, four up, a betting street after
//! every deal. The highest showing hand acts first on each street.

use std::collections::BTreeMap;

use parlor_protocol::ErrorCode;
use parlor_room::{
    CommandContext, GameDef, GameError, Outcome, SetupContext, Strategy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::betting::{BetError, BettingManager, PayoutMode, SeatStatus};
use crate::cards::{Card, Deck};
use crate::hand::evaluate_five;
use crate::voting::{VoteChoice, VotingManager};
use crate::{GameRng, decode_state};

pub const GAME_ID: &str = "five-card-stud";

/// Ante posted by every seat when a hand starts.
const ANTE: u64 = 5;
const DEFAULT_BALANCE: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seat {
    display_name: String,
    /// The single face-down card.
    down: Vec<Card>,
    /// Face-up cards, dealt one per street.
    up: Vec<Card>,
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
    deck: Deck,
    need_action: Vec<String>,
    winners: Vec<String>,
    seed: u64,
    round: u32,
    votes: VotingManager,
}

/// Orders showing hands: group sizes first (pair beats high card), then
/// ranks, compared lexicographically.
fn showing_strength(up: &[Card]) -> Vec<(u8, u8)> {
    let mut ranks: Vec<u8> = up.iter().map(|c| c.rank).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));
    let mut distinct = ranks.clone();
    distinct.dedup();
    let mut groups: Vec<(u8, u8)> = distinct
        .iter()
        .map(|&r| (ranks.iter().filter(|&&x| x == r).count() as u8, r))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));
    groups
}

impl State {
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

    /// The active player showing the strongest up cards; seat order
    /// breaks ties.
    fn highest_showing(&self) -> Option<String> {
        self.active_players()
            .into_iter()
            .max_by(|a, b| {
                let sa = self.players.get(a).map(|s| showing_strength(&s.up));
                let sb = self.players.get(b).map(|s| showing_strength(&s.up));
                // max_by keeps the *later* of equal elements; reverse the
                // equal case so the earlier seat wins ties.
                match sa.cmp(&sb) {
                    std::cmp::Ordering::Equal => std::cmp::Ordering::Greater,
                    other => other,
                }
            })
    }

    fn next_needing(&self, after: &str) -> Option<String> {
        let start = self.player_order.iter().position(|p| p == after)?;
        let n = self.player_order.len();
        (1..=n)
            .map(|i| &self.player_order[(start + i) % n])
            .find(|p| self.need_action.contains(p))
            .cloned()
    }

    fn deal_hand(&mut self) {
        for id in self.player_order.clone() {
            let down = self.deck.deal(1);
            let up = self.deck.deal(1);
            if let Some(seat) = self.players.get_mut(&id) {
                seat.down = down;
                seat.up = up;
            }
        }
        for id in self.player_order.clone() {
            if self.betting.place_bet(&id, ANTE).is_err() {
                let _ = self.betting.all_in(&id);
            }
        }
        self.phase = "street2".into();
        self.betting.start_round("street2");
        self.open_street();
    }

    fn open_street(&mut self) {
        self.need_action = self.active_players();
        self.current_player_id = self.highest_showing();
    }

    /// Deals the next up card, or runs the showdown after fifth street.
    fn advance_street(&mut self) {
        let next = match self.phase.as_str() {
            "street2" => "street3",
            "street3" => "street4",
            "street4" => "street5",
            _ => {
                self.showdown();
                return;
            }
        };
        for id in self.betting.contenders() {
            let card = self.deck.deal(1);
            if let Some(seat) = self.players.get_mut(&id) {
                seat.up.extend(card);
            }
        }
        self.phase = next.to_string();
        self.betting.start_round(next);
        if self.active_players().len() >= 2 {
            self.open_street();
        } else {
            // All-in: nothing left to bet, keep dealing.
            self.advance_street();
        }
    }

    fn showdown(&mut self) {
        let contenders = self.betting.contenders();
        let mut best: Option<crate::hand::HandRank> = None;
        let mut winners: Vec<String> = Vec::new();
        for id in &contenders {
            let Some(seat) = self.players.get(id) else { continue };
            let mut cards = seat.down.clone();
            cards.extend(seat.up.iter().copied());
            if cards.len() != 5 {
                continue;
            }
            let rank = evaluate_five(&cards);
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
        let mut rng = GameRng::for_round(self.seed, self.round);
        self.deck = Deck::shuffled(&mut rng);
        self.winners.clear();
        self.votes = VotingManager::new();
        for seat in self.players.values_mut() {
            seat.down.clear();
            seat.up.clear();
        }
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
struct PokerAction {
    action: String,
    amount: Option<u64>,
}

struct PokerActionStrategy;

impl Strategy for PokerActionStrategy {
    fn execute(&self, ctx: CommandContext) -> Outcome {
        let mut st: State = match decode_state(&ctx) {
            Ok(s) => s,
            Err(out) => return out,
        };
        let player = match ctx.require_player() {
            Ok(p) => p.as_str().to_string(),
            Err(out) => return out,
        };
        if !st.phase.starts_with("street") {
            return Outcome::reject(ErrorCode::InvalidMove, "no street open");
        }
        if st.current_player_id.as_deref() != Some(&player) {
            return Outcome::reject(ErrorCode::NotYourTurn, "not your turn");
        }
        let mv: PokerAction = match serde_json::from_value(ctx.payload.clone()) {
            Ok(m) => m,
            Err(_) => {
                return Outcome::reject(
                    ErrorCode::ValidationError,
                    "pokerAction needs {action, amount?}",
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

        if reopened {
            st.need_action = st
                .active_players()
                .into_iter()
                .filter(|p| p != &player)
                .collect();
        } else {
            st.need_action.retain(|p| p != &player);
        }
        let still_active = st.active_players();
        st.need_action.retain(|p| still_active.contains(p));

        let contenders = st.betting.contenders();
        if contenders.len() == 1 {
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

/// The five-card stud game definition.
pub struct FiveCardStud;

impl GameDef for FiveCardStud {
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
            return Err(GameError::Setup("stud needs at least 2 players".into()));
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
                    down: Vec::new(),
                    up: Vec::new(),
                },
            );
            order.push(entry.id.as_str().to_string());
            balances.push((entry.id.as_str().to_string(), balance));
        }

        let mut rng = GameRng::for_round(ctx.seed, 0);
        let mut state = State {
            phase: "street2".into(),
            current_player_id: None,
            player_order: order,
            is_complete: false,
            players,
            betting: BettingManager::new(&balances),
            deck: Deck::shuffled(&mut rng),
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
            "pokerAction" => Some(&PokerActionStrategy),
            "vote" => Some(&VoteStrategy),
            _ => None,
        }
    }

    fn command_kinds(&self) -> &'static [&'static str] {
        &["pokerAction", "vote"]
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
        let doc = FiveCardStud.initial_state(&setup(players, 5)).unwrap();
        GameState::new(doc)
    }

    fn act(state: &mut GameState, player: &str, action: &str) {
        match PokerActionStrategy.execute(ctx(state, player, json!({"action": action}))) {
            Outcome::Accept { next } => {
                state.replace(next);
            }
            Outcome::Reject { code, message } => panic!("rejected: {code} {message}"),
        }
    }

    #[test]
    fn test_deal_is_one_down_one_up_with_antes() {
        let state = initial(&["a", "b", "c"]);
        let doc = state.doc();
        for p in ["a", "b", "c"] {
            assert_eq!(doc["players"][p]["down"].as_array().unwrap().len(), 1);
            assert_eq!(doc["players"][p]["up"].as_array().unwrap().len(), 1);
        }
        assert_eq!(doc["betting"]["pot"], 15, "three antes of 5");
        assert_eq!(doc["phase"], "street2");
    }

    #[test]
    fn test_highest_showing_acts_first() {
        let mut state = initial(&["a", "b"]);
        let mut doc = state.doc().clone();
        doc["players"]["a"]["up"] =
            serde_json::to_value(vec![c(7, Suit::Clubs)]).unwrap();
        doc["players"]["b"]["up"] =
            serde_json::to_value(vec![c(Card::KING, Suit::Hearts)]).unwrap();
        doc["currentPlayerId"] = json!(null);
        state.replace(doc);

        let st: State = state.decode().unwrap();
        assert_eq!(st.highest_showing().as_deref(), Some("b"));
    }

    #[test]
    fn test_showing_pair_beats_high_card() {
        let pair = showing_strength(&[c(4, Suit::Clubs), c(4, Suit::Hearts)]);
        let high = showing_strength(&[c(Card::ACE, Suit::Clubs), c(9, Suit::Hearts)]);
        assert!(pair > high);
    }

    #[test]
    fn test_streets_deal_up_cards_until_five_total() {
        let mut state = initial(&["a", "b"]);
        // Check every street down; whoever is current acts first.
        for expected_phase in ["street3", "street4", "street5", "complete"] {
            // Two checks close the street (whatever the order is).
            for _ in 0..2 {
                let current = state.current_player_id().unwrap();
                act(&mut state, current.as_str(), "check");
            }
            assert_eq!(state.phase(), Some(expected_phase));
        }
        assert!(state.is_complete());
        let doc = state.doc();
        for p in ["a", "b"] {
            assert_eq!(doc["players"][p]["up"].as_array().unwrap().len(), 4);
            assert_eq!(doc["players"][p]["down"].as_array().unwrap().len(), 1);
        }
        assert!(!doc["winners"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_fold_ends_hand() {
        let mut state = initial(&["a", "b"]);
        let current = state.current_player_id().unwrap();
        let other = if current.as_str() == "a" { "b" } else { "a" };
        act(&mut state, current.as_str(), "fold");
        assert!(state.is_complete());
        assert_eq!(state.doc()["winners"], json!([other]));
    }

    #[test]
    fn test_raise_requires_response() {
        let mut state = initial(&["a", "b"]);
        let current = state.current_player_id().unwrap();
        let other = if current.as_str() == "a" { "b" } else { "a" };
        match PokerActionStrategy.execute(ctx(
            &state,
            current.as_str(),
            json!({"action": "raise", "amount": 20}),
        )) {
            Outcome::Accept { next } => {
                state.replace(next);
            }
            Outcome::Reject { code, message } => panic!("{code} {message}"),
        }
        assert_eq!(state.phase(), Some("street2"), "street stays open");
        assert_eq!(state.current_player_id().unwrap().as_str(), other);
        act(&mut state, other, "call");
        assert_eq!(state.phase(), Some("street3"));
    }
}
