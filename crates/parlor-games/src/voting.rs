//! Post-game voting: play again or return to the lobby.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A player's choice after a round ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteChoice {
    NewGame,
    Lobby,
}

/// Collects one vote per player and resolves the outcome.
///
/// Resolution: with exactly two players any `lobby` vote wins; otherwise
/// majority wins and ties resolve to `lobby`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingManager {
    pub votes: BTreeMap<String, VoteChoice>,
}

impl VotingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a vote. A player votes exactly once.
    pub fn cast(&mut self, player: &str, choice: VoteChoice) -> Result<(), AlreadyVoted> {
        if self.votes.contains_key(player) {
            return Err(AlreadyVoted);
        }
        self.votes.insert(player.to_string(), choice);
        Ok(())
    }

    /// Whether everyone in `order` has voted.
    pub fn is_complete(&self, order: &[String]) -> bool {
        !order.is_empty() && order.iter().all(|p| self.votes.contains_key(p))
    }

    /// Resolves the vote once complete; `None` while votes are missing.
    pub fn resolve(&self, order: &[String]) -> Option<VoteChoice> {
        if !self.is_complete(order) {
            return None;
        }
        if order.len() == 2 {
            let any_lobby = order
                .iter()
                .any(|p| self.votes.get(p) == Some(&VoteChoice::Lobby));
            return Some(if any_lobby {
                VoteChoice::Lobby
            } else {
                VoteChoice::NewGame
            });
        }
        let lobby = order
            .iter()
            .filter(|p| self.votes.get(*p) == Some(&VoteChoice::Lobby))
            .count();
        let new_game = order.len() - lobby;
        Some(if new_game > lobby {
            VoteChoice::NewGame
        } else {
            VoteChoice::Lobby
        })
    }
}

/// The player has already cast a vote this round.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("player already voted")]
pub struct AlreadyVoted;
