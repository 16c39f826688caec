//! The games shipped with Parlor.
//!
//! Each game implements [`GameDef`] from `parlor-room`: a state factory
//! plus named strategies. Shared machinery lives here too — cards and
//! decks, poker hand evaluation, the betting engine, and post-game voting.

mod baccarat;
mod betting;
mod blackjack;
mod cards;
mod checkers;
mod hand;
mod holdem;
mod rng;
mod stud;
mod tictactoe;
mod voting;

pub use baccarat::Baccarat;
pub use betting::{BetError, BettingManager, PayoutMode, Seat, SeatStatus};
pub use blackjack::Blackjack;
pub use cards::{Card, Deck, Suit, baccarat_points, blackjack_total, is_natural};
pub use checkers::Checkers;
pub use hand::{HandCategory, HandRank, best_hand, evaluate_five};
pub use holdem::{BIG_BLIND, SMALL_BLIND, TexasHoldem};
pub use rng::GameRng;
pub use stud::FiveCardStud;
pub use tictactoe::TicTacToe;
pub use voting::{AlreadyVoted, VoteChoice, VotingManager};

use std::collections::HashMap;
use std::sync::Arc;

use parlor_protocol::ErrorCode;
use parlor_room::{CommandContext, GameDef, Outcome};
use serde::de::DeserializeOwned;

/// Decodes the context's state document into a game's typed state,
/// converting corruption into a rejection instead of a panic.
pub(crate) fn decode_state<T: DeserializeOwned>(
    ctx: &CommandContext,
) -> Result<T, Outcome> {
    ctx.state.decode().map_err(|e| {
        Outcome::reject(ErrorCode::ValidationError, format!("corrupt state: {e}"))
    })
}

/// Catalog of available game definitions, keyed by game id.
#[derive(Default)]
pub struct GameRegistry {
    games: HashMap<String, Arc<dyn GameDef>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with every shipped game.
    pub fn with_builtin_games() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TicTacToe));
        registry.register(Arc::new(Checkers));
        registry.register(Arc::new(Blackjack));
        registry.register(Arc::new(TexasHoldem));
        registry.register(Arc::new(FiveCardStud));
        registry.register(Arc::new(Baccarat));
        registry
    }

    pub fn register(&mut self, game: Arc<dyn GameDef>) {
        tracing::debug!(game = game.game_id(), "game registered");
        self.games.insert(game.game_id().to_string(), game);
    }

    pub fn get(&self, game_id: &str) -> Option<Arc<dyn GameDef>> {
        self.games.get(game_id).cloned()
    }

    pub fn contains(&self, game_id: &str) -> bool {
        self.games.contains_key(game_id)
    }

    pub fn game_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.games.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
