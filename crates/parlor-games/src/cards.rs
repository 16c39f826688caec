//! Playing-card primitives shared by the casino games.

use serde::{Deserialize, Serialize};

use crate::GameRng;

/// Card suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

/// One playing card. `rank` runs 2..=14 with 11=J, 12=Q, 13=K, 14=A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: u8,
    pub suit: Suit,
}

impl Card {
    pub const JACK: u8 = 11;
    pub const QUEEN: u8 = 12;
    pub const KING: u8 = 13;
    pub const ACE: u8 = 14;

    pub fn new(rank: u8, suit: Suit) -> Self {
        debug_assert!((2..=14).contains(&rank));
        Self { rank, suit }
    }

    /// Whether this is a ten-valued card in blackjack (10/J/Q/K).
    pub fn is_ten_value(&self) -> bool {
        (10..=Self::KING).contains(&self.rank)
    }
}

/// A draw pile. Cards are dealt from the back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// All 52 cards in a fixed reference order.
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in 2..=14 {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    /// A full deck shuffled by the given deterministic rng.
    pub fn shuffled(rng: &mut GameRng) -> Self {
        let mut deck = Self::standard();
        rng.shuffle(&mut deck.cards);
        deck
    }

    /// Builds a deck from explicit cards (tests and seeded scenarios).
    /// The *last* card is dealt first.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.draw() {
                Some(c) => out.push(c),
                None => break,
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Blackjack hand value: best total ≤ 21 when possible, plus whether an
/// ace is currently counted as eleven (a "soft" hand).
pub fn blackjack_total(cards: &[Card]) -> (u8, bool) {
    let mut total: u32 = 0;
    let mut aces = 0;
    for card in cards {
        total += match card.rank {
            Card::ACE => {
                aces += 1;
                11
            }
            r if r >= 10 => 10,
            r => r as u32,
        };
    }
    while total > 21 && aces > 0 {
        total -= 10;
        aces -= 1;
    }
    (total.min(255) as u8, aces > 0)
}

/// A natural: exactly two cards totalling 21.
pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && blackjack_total(cards).0 == 21
}

/// Baccarat point value of a hand: tens and faces are zero, aces one,
/// everything mod 10.
pub fn baccarat_points(cards: &[Card]) -> u8 {
    let sum: u32 = cards
        .iter()
        .map(|c| match c.rank {
            Card::ACE => 1,
            r if r >= 10 => 0,
            r => r as u32,
        })
        .sum();
    (sum % 10) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn test_standard_deck_is_52_unique() {
        let deck = Deck::standard();
        assert_eq!(deck.len(), 52);
        let mut seen = std::collections::HashSet::new();
        let mut deck = deck;
        while let Some(card) = deck.draw() {
            assert!(seen.insert(card));
        }
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn test_shuffled_deck_is_deterministic_per_seed() {
        let mut a = Deck::shuffled(&mut GameRng::from_seed(9));
        let mut b = Deck::shuffled(&mut GameRng::from_seed(9));
        for _ in 0..52 {
            assert_eq!(a.draw(), b.draw());
        }
    }

    #[test]
    fn test_blackjack_totals() {
        // Hard 16.
        let (t, soft) = blackjack_total(&[c(9, Suit::Clubs), c(7, Suit::Hearts)]);
        assert_eq!((t, soft), (16, false));
        // Soft 17.
        let (t, soft) = blackjack_total(&[c(Card::ACE, Suit::Clubs), c(6, Suit::Hearts)]);
        assert_eq!((t, soft), (17, true));
        // Ace demotes on bust.
        let (t, soft) = blackjack_total(&[
            c(Card::ACE, Suit::Clubs),
            c(9, Suit::Hearts),
            c(5, Suit::Spades),
        ]);
        assert_eq!((t, soft), (15, false));
        // Natural 21.
        assert!(is_natural(&[c(Card::ACE, Suit::Clubs), c(Card::KING, Suit::Spades)]));
        assert!(!is_natural(&[
            c(7, Suit::Clubs),
            c(7, Suit::Hearts),
            c(7, Suit::Spades)
        ]));
    }

    #[test]
    fn test_baccarat_points() {
        assert_eq!(baccarat_points(&[c(Card::KING, Suit::Clubs), c(9, Suit::Hearts)]), 9);
        assert_eq!(baccarat_points(&[c(7, Suit::Clubs), c(8, Suit::Hearts)]), 5);
        assert_eq!(
            baccarat_points(&[c(Card::ACE, Suit::Clubs), c(Card::ACE, Suit::Hearts)]),
            2
        );
    }
}
