// Card lifecycle (spec §4.6: `Minted -> Equipped -> Consumed|Expired`)
// and the effect-composition rules from the Card entity in spec §3:
// effects compose multiplicatively within a category, and a synergy
// bonus applies only while cards from two or more categories are
// simultaneously active.

use crate::state::types::{Card, CardStatus};
use reward_common::model::CardCategory;
use reward_common::time::TimestampSeconds;
use std::collections::HashSet;

/// Flat bonus applied on top of the per-category product once cards
/// from >=2 distinct categories are active at the same time.
pub const SYNERGY_BONUS: f64 = 0.10;

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("card is not in Minted status")]
    NotMinted,
    #[error("card is not Equipped")]
    NotEquipped,
}

/// `Minted -> Equipped`.
pub fn equip(card: &mut Card) -> Result<(), CardError> {
    if card.status != CardStatus::Minted {
        return Err(CardError::NotMinted);
    }
    card.status = CardStatus::Equipped;
    Ok(())
}

/// Consume one use of an equipped card (spec §4.6: "consumption
/// decrements uses or sets expiry"). Transitions to `Consumed` once uses
/// run out, or to `Expired` once `now` passes `expires_at`.
pub fn consume_use(card: &mut Card, now: TimestampSeconds) -> Result<(), CardError> {
    if card.status != CardStatus::Equipped {
        return Err(CardError::NotEquipped);
    }
    if card.uses_remaining > 0 {
        card.uses_remaining -= 1;
    }
    if card.uses_remaining == 0 {
        card.status = CardStatus::Consumed;
    } else if let Some(expires_at) = card.expires_at {
        if now >= expires_at {
            card.status = CardStatus::Expired;
        }
    }
    Ok(())
}

/// Multiplicative product of every active card's effect within one
/// category. 1.0 (neutral) when no card of that category is active.
fn category_product(active_cards: &[Card], category: CardCategory) -> f64 {
    active_cards
        .iter()
        .filter(|c| c.category == category)
        .map(|c| c.effect_multiplier)
        .product()
}

fn synergy_factor(active_cards: &[Card]) -> f64 {
    let categories: HashSet<CardCategory> = active_cards.iter().map(|c| c.category).collect();
    if categories.len() >= 2 {
        1.0 + SYNERGY_BONUS
    } else {
        1.0
    }
}

/// The combined multiplier the calculator should apply for `category`,
/// given the caller's already-filtered set of currently-active cards
/// (`CardStore::active_cards_for`). Includes the cross-category synergy
/// bonus when applicable.
pub fn combined_multiplier(active_cards: &[Card], category: CardCategory) -> f64 {
    category_product(active_cards, category) * synergy_factor(active_cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_common::id::UserId;

    fn card(category: CardCategory, multiplier: f64) -> Card {
        Card {
            id: 1,
            owner_id: UserId::zero(),
            category,
            effect_multiplier: multiplier,
            duration_ms: 0,
            uses_remaining: 1,
            expires_at: None,
            status: CardStatus::Equipped,
        }
    }

    #[test]
    fn equip_requires_minted() {
        let mut c = card(CardCategory::Mining, 1.2);
        assert!(matches!(equip(&mut c), Err(CardError::NotMinted)));
    }

    #[test]
    fn consume_use_exhausts_to_consumed() {
        let mut c = card(CardCategory::Mining, 1.2);
        c.uses_remaining = 1;
        consume_use(&mut c, 0).unwrap();
        assert_eq!(c.status, CardStatus::Consumed);
    }

    #[test]
    fn single_category_has_no_synergy() {
        let cards = vec![card(CardCategory::Mining, 1.2)];
        assert_eq!(combined_multiplier(&cards, CardCategory::Mining), 1.2);
    }

    #[test]
    fn two_categories_active_grants_synergy_on_each() {
        let cards = vec![card(CardCategory::Mining, 1.2), card(CardCategory::Xp, 1.1)];
        let mining = combined_multiplier(&cards, CardCategory::Mining);
        assert!((mining - 1.2 * 1.10).abs() < 1e-9);
    }

    #[test]
    fn multiple_cards_same_category_compose_multiplicatively() {
        let cards = vec![card(CardCategory::Mining, 1.2), card(CardCategory::Mining, 1.1)];
        let mining = combined_multiplier(&cards, CardCategory::Mining);
        assert!((mining - 1.2 * 1.1).abs() < 1e-9);
    }
}
