//! Poker hand evaluation for Hold'em and Stud.
//!
//! A hand ranks as `(category, kickers…)` compared lexicographically:
//! category first, then kickers element-wise. Best-5-of-7 enumerates all
//! 21 five-card combinations and keeps the greatest.

use serde::Serialize;

use crate::cards::Card;

/// Hand categories in ascending rank. Derived `Ord` follows declaration
/// order, so the enum order *is* the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HandCategory {
    HighCard,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

/// A fully evaluated hand. `Ord` compares category, then kickers
/// element-wise — exactly the tie-break rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandRank {
    pub category: HandCategory,
    pub kickers: Vec<u8>,
}

/// Detects a straight in a sorted-desc list of distinct ranks, returning
/// the high card. The wheel (A-2-3-4-5) counts with high card 5.
fn straight_high(distinct_desc: &[u8]) -> Option<u8> {
    if distinct_desc.len() < 5 {
        return None;
    }
    for window in distinct_desc.windows(5) {
        if window[0] - window[4] == 4 {
            return Some(window[0]);
        }
    }
    // Wheel: A,5,4,3,2.
    if distinct_desc[0] == Card::ACE
        && distinct_desc[distinct_desc.len() - 4..] == [5, 4, 3, 2]
    {
        return Some(5);
    }
    None
}

/// Evaluates exactly five cards.
pub fn evaluate_five(cards: &[Card]) -> HandRank {
    assert_eq!(cards.len(), 5, "evaluate_five needs exactly 5 cards");

    let mut ranks: Vec<u8> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let flush = cards.iter().all(|c| c.suit == cards[0].suit);

    let mut distinct: Vec<u8> = ranks.clone();
    distinct.dedup();
    let straight = straight_high(&distinct);

    if let (true, Some(high)) = (flush, straight) {
        return if high == Card::ACE {
            HandRank {
                category: HandCategory::RoyalFlush,
                kickers: vec![high],
            }
        } else {
            HandRank {
                category: HandCategory::StraightFlush,
                kickers: vec![high],
            }
        };
    }

    // Count multiplicity per rank, then order groups by (count, rank) desc.
    let mut groups: Vec<(u8, u8)> = distinct
        .iter()
        .map(|&r| (ranks.iter().filter(|&&x| x == r).count() as u8, r))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let kickers: Vec<u8> = groups.iter().map(|&(_, r)| r).collect();
    match groups[0].0 {
        4 => HandRank {
            category: HandCategory::FourOfAKind,
            kickers,
        },
        3 if groups[1].0 == 2 => HandRank {
            category: HandCategory::FullHouse,
            kickers,
        },
        _ if flush => HandRank {
            category: HandCategory::Flush,
            kickers: ranks,
        },
        _ if straight.is_some() => HandRank {
            category: HandCategory::Straight,
            kickers: vec![straight.unwrap()],
        },
        3 => HandRank {
            category: HandCategory::ThreeOfAKind,
            kickers,
        },
        2 if groups[1].0 == 2 => HandRank {
            category: HandCategory::TwoPair,
            kickers,
        },
        2 => HandRank {
            category: HandCategory::Pair,
            kickers,
        },
        _ => HandRank {
            category: HandCategory::HighCard,
            kickers: ranks,
        },
    }
}

/// Best five-card hand from five or more cards (seven at showdown).
pub fn best_hand(cards: &[Card]) -> HandRank {
    assert!(cards.len() >= 5, "need at least 5 cards");
    if cards.len() == 5 {
        return evaluate_five(cards);
    }

    let mut best: Option<HandRank> = None;
    let n = cards.len();
    // Choose 5 of n by excluding n-5 indices; for 7 cards this is the 21
    // pair-exclusion enumeration.
    let mut pick = [0usize; 5];
    enumerate_combinations(n, &mut pick, 0, 0, &mut |idx| {
        let five: Vec<Card> = idx.iter().map(|&i| cards[i]).collect();
        let rank = evaluate_five(&five);
        if best.as_ref().is_none_or(|b| rank > *b) {
            best = Some(rank);
        }
    });
    best.expect("at least one combination")
}

fn enumerate_combinations(
    n: usize,
    pick: &mut [usize; 5],
    depth: usize,
    start: usize,
    visit: &mut impl FnMut(&[usize; 5]),
) {
    if depth == 5 {
        visit(pick);
        return;
    }
    for i in start..n {
        pick[depth] = i;
        enumerate_combinations(n, pick, depth + 1, i + 1, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit::{self, *};

    fn c(rank: u8, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn hand(cards: &[(u8, Suit)]) -> Vec<Card> {
        cards.iter().map(|&(r, s)| c(r, s)).collect()
    }

    #[test]
    fn test_category_ordering_is_ascending() {
        assert!(HandCategory::RoyalFlush > HandCategory::StraightFlush);
        assert!(HandCategory::FourOfAKind > HandCategory::FullHouse);
        assert!(HandCategory::Flush > HandCategory::Straight);
        assert!(HandCategory::Pair > HandCategory::HighCard);
    }

    #[test]
    fn test_royal_flush() {
        let h = hand(&[(14, Spades), (13, Spades), (12, Spades), (11, Spades), (10, Spades)]);
        assert_eq!(evaluate_five(&h).category, HandCategory::RoyalFlush);
    }

    #[test]
    fn test_wheel_straight_is_five_high() {
        let h = hand(&[(14, Spades), (2, Clubs), (3, Hearts), (4, Diamonds), (5, Clubs)]);
        let rank = evaluate_five(&h);
        assert_eq!(rank.category, HandCategory::Straight);
        assert_eq!(rank.kickers, vec![5]);

        // A six-high straight beats the wheel.
        let six_high = hand(&[(2, Clubs), (3, Hearts), (4, Diamonds), (5, Clubs), (6, Spades)]);
        assert!(evaluate_five(&six_high) > rank);
    }

    #[test]
    fn test_full_house_kickers() {
        let h = hand(&[(9, Spades), (9, Clubs), (9, Hearts), (4, Diamonds), (4, Clubs)]);
        let rank = evaluate_five(&h);
        assert_eq!(rank.category, HandCategory::FullHouse);
        assert_eq!(rank.kickers, vec![9, 4]);
    }

    #[test]
    fn test_two_pair_tiebreak_by_kicker() {
        let a = evaluate_five(&hand(&[(13, Spades), (13, Clubs), (8, Hearts), (8, Diamonds), (11, Clubs)]));
        let b = evaluate_five(&hand(&[(13, Hearts), (13, Diamonds), (8, Spades), (8, Clubs), (9, Clubs)]));
        assert_eq!(a.category, HandCategory::TwoPair);
        assert!(a > b, "jack kicker beats nine kicker");
    }

    #[test]
    fn test_flush_beats_straight() {
        let flush = evaluate_five(&hand(&[(2, Clubs), (5, Clubs), (9, Clubs), (11, Clubs), (13, Clubs)]));
        let straight = evaluate_five(&hand(&[(5, Clubs), (6, Hearts), (7, Spades), (8, Clubs), (9, Diamonds)]));
        assert!(flush > straight);
    }

    #[test]
    fn test_best_of_seven_finds_hidden_straight() {
        // Hole 6,7 + board 8,9,10,K,K → 10-high straight beats the pair.
        let seven = hand(&[
            (6, Clubs),
            (7, Hearts),
            (8, Spades),
            (9, Diamonds),
            (10, Clubs),
            (13, Hearts),
            (13, Spades),
        ]);
        let rank = best_hand(&seven);
        assert_eq!(rank.category, HandCategory::Straight);
        assert_eq!(rank.kickers, vec![10]);
    }

    #[test]
    fn test_best_of_seven_identical_boards_tie() {
        // Both players play the board: identical straights.
        let board = [(8u8, Spades), (9u8, Diamonds), (10u8, Clubs), (11u8, Hearts), (12u8, Spades)];
        let a: Vec<Card> = hand(&[(2, Clubs), (3, Hearts)])
            .into_iter()
            .chain(hand(&board))
            .collect();
        let b: Vec<Card> = hand(&[(2, Diamonds), (3, Spades)])
            .into_iter()
            .chain(hand(&board))
            .collect();
        assert_eq!(best_hand(&a), best_hand(&b));
    }

    #[test]
    fn test_quads_with_kicker() {
        let h = hand(&[(5, Spades), (5, Clubs), (5, Hearts), (5, Diamonds), (14, Clubs)]);
        let rank = evaluate_five(&h);
        assert_eq!(rank.category, HandCategory::FourOfAKind);
        assert_eq!(rank.kickers, vec![5, 14]);
    }
}
