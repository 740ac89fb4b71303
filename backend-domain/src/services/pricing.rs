// Cart normalization, promo codes and pricing

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    CartLine, CartRequest, Discount, Event, PricedCart, PromoCode, PurchaseLine, TicketTier,
};
use crate::utils::{basis_points_of, round_to_minor};
use crate::value_objects::Currency;

// Upper bound for any ticket or tier price, in minor units.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("quantity must be between 1 and {max}")]
    InvalidQuantity { max: u32 },
    #[error("at most {max} tickets per order")]
    TooManyTickets { max: u32 },
    #[error("event is not on sale")]
    EventNotPublished,
    #[error("ticket tier {0} not found for this event")]
    UnknownTier(Uuid),
    #[error("sales for {0} have not started")]
    SalesNotStarted(String),
    #[error("sales for {0} have ended")]
    SalesEnded(String),
    #[error("{0} is sold out")]
    SoldOut(String),
    #[error("only {remaining} tickets left for {name}")]
    InsufficientInventory { name: String, remaining: i32 },
    #[error("promo code {0}")]
    PromoRejected(&'static str),
    #[error("order amount is out of range")]
    AmountOutOfRange,
}

pub fn normalize_cart(request: &CartRequest, max_per_order: u32) -> Result<Vec<CartLine>, PricingError> {
    let raw: Vec<(Option<Uuid>, u32)> = match &request.items {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|item| (item.tier_id, item.quantity))
            .collect(),
        _ => vec![(request.tier_id, request.quantity.unwrap_or(1))],
    };

    let mut merged: BTreeMap<Option<Uuid>, u32> = BTreeMap::new();
    for (tier_id, quantity) in raw {
        if quantity == 0 || quantity > max_per_order {
            return Err(PricingError::InvalidQuantity { max: max_per_order });
        }
        *merged.entry(tier_id).or_default() += quantity;
    }
    if merged.is_empty() {
        return Err(PricingError::EmptyCart);
    }
    let total: u32 = merged.values().sum();
    if total > max_per_order {
        return Err(PricingError::TooManyTickets { max: max_per_order });
    }

    Ok(merged
        .into_iter()
        .map(|(tier_id, quantity)| CartLine { tier_id, quantity })
        .collect())
}

pub fn apply_discount(price: i64, discount: &Discount) -> i64 {
    let discounted = match discount {
        Discount::Percentage(percent) => {
            let percent = (*percent).clamp(0, 100) as u32;
            price - basis_points_of(price, percent * 100)
        }
        Discount::Fixed(amount) => price - (*amount).max(0),
    };
    discounted.max(0)
}

pub fn check_promo(promo: &PromoCode, event_id: Uuid, now: DateTime<Utc>) -> Result<(), PricingError> {
    if promo.event_id != event_id {
        return Err(PricingError::PromoRejected("does not apply to this event"));
    }
    if !promo.active {
        return Err(PricingError::PromoRejected("is not active"));
    }
    if promo.expires_at.is_some_and(|expires| expires <= now) {
        return Err(PricingError::PromoRejected("has expired"));
    }
    if promo.max_uses.is_some_and(|max| promo.uses >= max) {
        return Err(PricingError::PromoRejected("has reached its usage limit"));
    }
    Ok(())
}

fn check_tier_window(tier: &TicketTier, now: DateTime<Utc>) -> Result<(), PricingError> {
    if tier.sales_start.is_some_and(|start| now < start) {
        return Err(PricingError::SalesNotStarted(tier.name.clone()));
    }
    if tier.sales_end.is_some_and(|end| now > end) {
        return Err(PricingError::SalesEnded(tier.name.clone()));
    }
    Ok(())
}

fn check_remaining(name: &str, remaining: i32, quantity: u32) -> Result<(), PricingError> {
    if remaining <= 0 {
        return Err(PricingError::SoldOut(name.to_string()));
    }
    if i64::from(remaining) < i64::from(quantity) {
        return Err(PricingError::InsufficientInventory {
            name: name.to_string(),
            remaining,
        });
    }
    Ok(())
}

pub fn price_cart(
    event: &Event,
    tiers: &[TicketTier],
    lines: &[CartLine],
    promo: Option<&PromoCode>,
    now: DateTime<Utc>,
) -> Result<PricedCart, PricingError> {
    if !event.published {
        return Err(PricingError::EventNotPublished);
    }
    if let Some(promo) = promo {
        check_promo(promo, event.id, now)?;
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = 0i64;
    for line in lines {
        let base_price = match line.tier_id {
            Some(tier_id) => {
                let tier = tiers
                    .iter()
                    .find(|tier| tier.id == tier_id && tier.event_id == event.id)
                    .ok_or(PricingError::UnknownTier(tier_id))?;
                check_tier_window(tier, now)?;
                check_remaining(&tier.name, tier.remaining(), line.quantity)?;
                tier.price
            }
            None => {
                check_remaining("general admission", event.remaining_tickets(), line.quantity)?;
                event.ticket_price
            }
        };
        let unit_price = match promo {
            Some(promo) => apply_discount(base_price, &promo.discount),
            None => base_price,
        };
        subtotal = base_price
            .checked_mul(i64::from(line.quantity))
            .and_then(|line_total| subtotal.checked_add(line_total))
            .ok_or(PricingError::AmountOutOfRange)?;
        priced.push(PurchaseLine {
            tier_id: line.tier_id,
            quantity: line.quantity,
            unit_price,
        });
    }

    let total = priced
        .iter()
        .try_fold(0i64, |sum, line| line.subtotal().and_then(|value| sum.checked_add(value)))
        .ok_or(PricingError::AmountOutOfRange)?;
    Ok(PricedCart {
        event_id: event.id,
        currency: event.currency,
        lines: priced,
        promo_code_id: promo.map(|promo| promo.id),
        subtotal,
        discount: subtotal - total,
        total,
    })
}

pub fn charge_in_htg(total: i64, currency: Currency, usd_htg_rate: Decimal) -> (i64, Option<Decimal>) {
    match currency {
        Currency::Htg => (total, None),
        Currency::Usd => (round_to_minor(Decimal::from(total) * usd_htg_rate), Some(usd_htg_rate)),
    }
}
