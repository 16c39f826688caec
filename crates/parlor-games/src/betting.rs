//! The betting engine shared by every casino game.
//!
//! Chip-conservation invariant: `pot` always equals the sum of every
//! seat's `total_contribution`, and no balance ever goes negative. A
//! betting round is complete iff every active (non-folded, non-all-in)
//! seat's round contribution equals the current bet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Seat status within a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeatStatus {
    Active,
    Folded,
    AllIn,
}

/// One player's chips and standing in the current hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub balance: u64,
    /// Chips put in during the current betting round.
    pub round_bet: u64,
    /// Chips put in across the whole hand.
    pub total_contribution: u64,
    pub status: SeatStatus,
}

/// How a pot is distributed at the end of a hand.
#[derive(Debug, Clone)]
pub enum PayoutMode {
    /// Split equally; the remainder goes to the first winner in seat order.
    Equal,
    /// Explicit per-player amounts (must sum to the pot).
    Custom(Vec<(String, u64)>),
}

/// Errors from betting operations. These become domain rejections on the
/// wire, never panics.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BetError {
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("seat is not active")]
    NotActive,
    #[error("cannot check facing a bet")]
    CannotCheck,
    #[error("raise must exceed the current bet")]
    RaiseTooSmall,
    #[error("payout does not match the pot")]
    BadPayout,
}

/// Pot, current bet, and seats for one hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BettingManager {
    pub pot: u64,
    pub current_bet: u64,
    pub round: String,
    /// Seats keyed by player id.
    pub seats: BTreeMap<String, Seat>,
    /// Seat order; drives remainder assignment on equal splits.
    pub order: Vec<String>,
}

impl BettingManager {
    pub fn new(players: &[(String, u64)]) -> Self {
        let mut seats = BTreeMap::new();
        let mut order = Vec::with_capacity(players.len());
        for (id, balance) in players {
            seats.insert(
                id.clone(),
                Seat {
                    balance: *balance,
                    round_bet: 0,
                    total_contribution: 0,
                    status: SeatStatus::Active,
                },
            );
            order.push(id.clone());
        }
        Self {
            pot: 0,
            current_bet: 0,
            round: String::new(),
            seats,
            order,
        }
    }

    fn seat_mut(&mut self, player: &str) -> Result<&mut Seat, BetError> {
        self.seats.get_mut(player).ok_or(BetError::UnknownPlayer)
    }

    fn active_seat_mut(&mut self, player: &str) -> Result<&mut Seat, BetError> {
        let seat = self.seat_mut(player)?;
        if seat.status != SeatStatus::Active {
            return Err(BetError::NotActive);
        }
        Ok(seat)
    }

    /// Moves chips from a seat into the pot.
    fn commit(seat: &mut Seat, pot: &mut u64, amount: u64) -> Result<(), BetError> {
        if seat.balance < amount {
            return Err(BetError::InsufficientBalance);
        }
        seat.balance -= amount;
        seat.round_bet += amount;
        seat.total_contribution += amount;
        *pot += amount;
        Ok(())
    }

    /// Begins a named betting round: round bets reset, current bet to zero.
    pub fn start_round(&mut self, name: &str) {
        self.round = name.to_string();
        self.current_bet = 0;
        for seat in self.seats.values_mut() {
            seat.round_bet = 0;
        }
    }

    /// Puts `amount` additional chips in (blinds, antes, opening bets).
    pub fn place_bet(&mut self, player: &str, amount: u64) -> Result<(), BetError> {
        let mut pot = self.pot;
        let seat = self.active_seat_mut(player)?;
        Self::commit(seat, &mut pot, amount)?;
        let round_bet = seat.round_bet;
        self.pot = pot;
        self.current_bet = self.current_bet.max(round_bet);
        Ok(())
    }

    /// Matches the current bet. Returns the chips paid.
    pub fn call(&mut self, player: &str) -> Result<u64, BetError> {
        let current_bet = self.current_bet;
        let mut pot = self.pot;
        let seat = self.active_seat_mut(player)?;
        let owed = current_bet.saturating_sub(seat.round_bet);
        Self::commit(seat, &mut pot, owed)?;
        self.pot = pot;
        Ok(owed)
    }

    /// Raises the current bet *to* `amount` (total for the round).
    pub fn raise(&mut self, player: &str, amount: u64) -> Result<(), BetError> {
        if amount <= self.current_bet {
            return Err(BetError::RaiseTooSmall);
        }
        let mut pot = self.pot;
        let seat = self.active_seat_mut(player)?;
        let owed = amount.saturating_sub(seat.round_bet);
        Self::commit(seat, &mut pot, owed)?;
        self.pot = pot;
        self.current_bet = amount;
        Ok(())
    }

    /// Passes without betting; only legal when nothing is owed.
    pub fn check(&mut self, player: &str) -> Result<(), BetError> {
        let current_bet = self.current_bet;
        let seat = self.active_seat_mut(player)?;
        if seat.round_bet != current_bet {
            return Err(BetError::CannotCheck);
        }
        Ok(())
    }

    pub fn fold(&mut self, player: &str) -> Result<(), BetError> {
        let seat = self.active_seat_mut(player)?;
        seat.status = SeatStatus::Folded;
        Ok(())
    }

    /// Commits the entire remaining balance. Returns the chips paid.
    pub fn all_in(&mut self, player: &str) -> Result<u64, BetError> {
        let mut pot = self.pot;
        let seat = self.active_seat_mut(player)?;
        let stake = seat.balance;
        Self::commit(seat, &mut pot, stake)?;
        seat.status = SeatStatus::AllIn;
        let round_bet = seat.round_bet;
        self.pot = pot;
        self.current_bet = self.current_bet.max(round_bet);
        Ok(stake)
    }

    /// Whether every active seat has matched the current bet.
    pub fn is_round_complete(&self) -> bool {
        self.seats
            .values()
            .filter(|s| s.status == SeatStatus::Active)
            .all(|s| s.round_bet == self.current_bet)
    }

    /// Players still contesting the pot (active or all-in).
    pub fn contenders(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| {
                self.seats
                    .get(*id)
                    .is_some_and(|s| s.status != SeatStatus::Folded)
            })
            .cloned()
            .collect()
    }

    /// Distributes the pot and zeroes it.
    ///
    /// With [`PayoutMode::Equal`] the remainder (`pot mod winners`) goes to
    /// the first winner in seat order.
    pub fn payout(
        &mut self,
        winners: &[String],
        mode: PayoutMode,
    ) -> Result<(), BetError> {
        match mode {
            PayoutMode::Equal => {
                if winners.is_empty() {
                    return Err(BetError::BadPayout);
                }
                for w in winners {
                    if !self.seats.contains_key(w) {
                        return Err(BetError::UnknownPlayer);
                    }
                }
                let share = self.pot / winners.len() as u64;
                let remainder = self.pot % winners.len() as u64;
                for w in winners {
                    let seat = self.seat_mut(w)?;
                    seat.balance += share;
                }
                if remainder > 0 {
                    let first = self
                        .order
                        .iter()
                        .find(|id| winners.contains(id))
                        .cloned()
                        .ok_or(BetError::BadPayout)?;
                    self.seat_mut(&first)?.balance += remainder;
                }
            }
            PayoutMode::Custom(shares) => {
                let total: u64 = shares.iter().map(|(_, amt)| amt).sum();
                if total != self.pot {
                    return Err(BetError::BadPayout);
                }
                for (id, amt) in shares {
                    let seat = self.seat_mut(&id)?;
                    seat.balance += amt;
                }
            }
        }
        self.pot = 0;
        Ok(())
    }

    /// The chip-conservation check: pot equals total contributions minus
    /// what has been paid back out.
    #[cfg(test)]
    fn assert_pot_invariant(&self) {
        let contributed: u64 = self.seats.values().map(|s| s.total_contribution).sum();
        assert!(
            self.pot <= contributed,
            "pot {} exceeds contributions {}",
            self.pot,
            contributed
        );
    }
}
