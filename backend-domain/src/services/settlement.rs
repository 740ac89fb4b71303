// Settlement and fee allocation
//
// Tickets are grouped by payment id, fees are computed per group and then
// allocated back to tickets so per-ticket figures always sum to group totals.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{FeeSchedule, Ticket};
use crate::utils::{basis_points_of, round_to_minor};
use crate::value_objects::PaymentMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketAllocation {
    pub ticket_id: Uuid,
    pub payment_id: String,
    pub gross: i64,
    pub platform_fee: i64,
    pub processing_fee: i64,
    pub organizer_net: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentGroupSettlement {
    pub payment_id: String,
    pub payment_method: PaymentMethod,
    pub gross: i64,
    pub platform_fee: i64,
    pub processing_fee: i64,
    pub organizer_net: i64,
    pub allocations: Vec<TicketAllocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettlementTotals {
    pub tickets: u64,
    pub payment_groups: u64,
    pub gross: i64,
    pub platform_fee: i64,
    pub processing_fee: i64,
    pub organizer_net: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub groups: Vec<PaymentGroupSettlement>,
    pub totals: SettlementTotals,
}

impl Settlement {
    pub fn allocation_for(&self, ticket_id: Uuid) -> Option<&TicketAllocation> {
        self.groups
            .iter()
            .flat_map(|group| group.allocations.iter())
            .find(|allocation| allocation.ticket_id == ticket_id)
    }
}

pub fn settle(tickets: &[Ticket], fees: &FeeSchedule) -> Settlement {
    let mut grouped: BTreeMap<String, Vec<&Ticket>> = BTreeMap::new();
    for ticket in tickets.iter().filter(|ticket| ticket.status.is_active()) {
        let key = ticket
            .payment_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| ticket.id.to_string());
        grouped.entry(key).or_default().push(ticket);
    }

    let mut settlement = Settlement::default();
    for (payment_id, mut members) in grouped {
        members.sort_by_key(|ticket| ticket.id.to_string());
        let Some(group) = settle_group(&payment_id, &members, fees) else {
            continue;
        };
        let totals = &mut settlement.totals;
        totals.tickets += group.allocations.len() as u64;
        totals.payment_groups += 1;
        totals.gross += group.gross;
        totals.platform_fee += group.platform_fee;
        totals.processing_fee += group.processing_fee;
        totals.organizer_net += group.organizer_net;
        settlement.groups.push(group);
    }
    settlement
}

fn settle_group(
    payment_id: &str,
    members: &[&Ticket],
    fees: &FeeSchedule,
) -> Option<PaymentGroupSettlement> {
    let weights: Vec<i64> = members.iter().map(|ticket| ticket.price_paid).collect();
    let gross: i64 = weights.iter().sum();
    if gross == 0 {
        return None;
    }

    let payment_method = members[0].payment_method;
    let platform_fee = basis_points_of(gross, fees.platform_fee_bps);
    let processing_fee = if payment_method == PaymentMethod::Card {
        card_processing_fee(members, gross, fees)
    } else {
        0
    };
    let organizer_net = gross - platform_fee - processing_fee;

    let platform_split = allocate_proportionally(platform_fee, &weights);
    let processing_split = allocate_proportionally(processing_fee, &weights);
    let allocations = members
        .iter()
        .enumerate()
        .map(|(idx, ticket)| TicketAllocation {
            ticket_id: ticket.id,
            payment_id: payment_id.to_string(),
            gross: ticket.price_paid,
            platform_fee: platform_split[idx],
            processing_fee: processing_split[idx],
            organizer_net: ticket.price_paid - platform_split[idx] - processing_split[idx],
        })
        .collect();

    Some(PaymentGroupSettlement {
        payment_id: payment_id.to_string(),
        payment_method,
        gross,
        platform_fee,
        processing_fee,
        organizer_net,
        allocations,
    })
}

// Card fee is charged on the amount the processor collected. When an FX rate was
// recorded, the fee is converted back into the event currency.
fn card_processing_fee(members: &[&Ticket], gross: i64, fees: &FeeSchedule) -> i64 {
    let fx_rate = members
        .iter()
        .find_map(|ticket| ticket.fx_rate)
        .filter(|rate| *rate > Decimal::ZERO);

    let recorded: Option<i64> = members
        .iter()
        .map(|ticket| ticket.charged_amount)
        .sum::<Option<i64>>();
    let charged = match (recorded, fx_rate) {
        (Some(total), _) => total,
        (None, Some(rate)) => round_to_minor(Decimal::from(gross) * rate),
        (None, None) => gross,
    };

    let fee_in_charged = basis_points_of(charged, fees.card_fee_bps) + fees.card_fee_fixed_minor;
    match fx_rate {
        Some(rate) => round_to_minor(Decimal::from(fee_in_charged) / rate),
        None => fee_in_charged,
    }
}

// Splits `total` by `weights`. Every entry but the last is rounded down and the
// last absorbs the remainder, so the parts always sum to `total`.
pub fn allocate_proportionally(total: i64, weights: &[i64]) -> Vec<i64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let weight_sum: i128 = weights.iter().map(|w| i128::from(*w)).sum();
    let mut parts = Vec::with_capacity(weights.len());
    let mut assigned = 0i64;
    for (idx, weight) in weights.iter().enumerate() {
        if idx == weights.len() - 1 {
            parts.push(total - assigned);
            break;
        }
        let part = if weight_sum == 0 {
            0
        } else {
            (i128::from(total) * i128::from(*weight)).div_euclid(weight_sum) as i64
        };
        assigned += part;
        parts.push(part);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{Currency, TicketStatus};
    use chrono::Utc;

    fn ticket(id: u128, payment_id: Option<&str>, price: i64, method: PaymentMethod) -> Ticket {
        Ticket {
            id: Uuid::from_u128(id),
            event_id: Uuid::from_u128(999),
            tier_id: None,
            attendee_id: Uuid::from_u128(1000),
            price_paid: price,
            currency: Currency::Usd,
            payment_method: method,
            payment_id: payment_id.map(ToString::to_string),
            status: TicketStatus::Valid,
            qr_payload: String::new(),
            checked_in_at: None,
            charged_amount: None,
            charged_currency: None,
            fx_rate: None,
            promo_code_id: None,
            purchased_at: Utc::now(),
        }
    }

    #[test]
    fn single_card_ticket_matches_reference_example() {
        let tickets = vec![ticket(1, Some("pi_1"), 10_000, PaymentMethod::Card)];
        let settlement = settle(&tickets, &FeeSchedule::default());

        assert_eq!(settlement.groups.len(), 1);
        let group = &settlement.groups[0];
        assert_eq!(group.platform_fee, 1000);
        assert_eq!(group.processing_fee, 320);
        assert_eq!(group.organizer_net, 8680);
        assert_eq!(group.allocations[0].organizer_net, 8680);
    }

    #[test]
    fn mobile_money_groups_have_no_processing_fee() {
        let tickets = vec![ticket(1, Some("moncash_1"), 50_000, PaymentMethod::MobileMoney)];
        let settlement = settle(&tickets, &FeeSchedule::default());
        assert_eq!(settlement.totals.processing_fee, 0);
        assert_eq!(settlement.totals.platform_fee, 5000);
        assert_eq!(settlement.totals.organizer_net, 45_000);
    }

    #[test]
    fn allocations_reconcile_exactly_with_group_totals() {
        let tickets = vec![
            ticket(3, Some("pi_a"), 3333, PaymentMethod::Card),
            ticket(1, Some("pi_a"), 3333, PaymentMethod::Card),
            ticket(2, Some("pi_a"), 3334, PaymentMethod::Card),
            ticket(4, Some("pi_b"), 999, PaymentMethod::Card),
            ticket(5, Some("pi_b"), 1, PaymentMethod::Card),
        ];
        let settlement = settle(&tickets, &FeeSchedule::default());

        for group in &settlement.groups {
            let platform: i64 = group.allocations.iter().map(|a| a.platform_fee).sum();
            let processing: i64 = group.allocations.iter().map(|a| a.processing_fee).sum();
            let net: i64 = group.allocations.iter().map(|a| a.organizer_net).sum();
            assert_eq!(platform, group.platform_fee);
            assert_eq!(processing, group.processing_fee);
            assert_eq!(net, group.organizer_net);
            assert_eq!(platform + processing + net, group.gross);
        }
        assert_eq!(
            settlement.totals.platform_fee
                + settlement.totals.processing_fee
                + settlement.totals.organizer_net,
            settlement.totals.gross
        );
    }

    #[test]
    fn allocation_order_is_lexicographic_by_ticket_id() {
        let tickets = vec![
            ticket(2, Some("pi_a"), 500, PaymentMethod::Card),
            ticket(1, Some("pi_a"), 500, PaymentMethod::Card),
        ];
        let settlement = settle(&tickets, &FeeSchedule::default());
        let ids: Vec<Uuid> = settlement.groups[0]
            .allocations
            .iter()
            .map(|a| a.ticket_id)
            .collect();
        assert_eq!(ids, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
        // 2.9% of 1000 + 30 = 59; the last ticket takes the odd cent.
        assert_eq!(settlement.groups[0].allocations[0].processing_fee, 29);
        assert_eq!(settlement.groups[0].allocations[1].processing_fee, 30);
    }

    #[test]
    fn zero_gross_groups_are_skipped() {
        let tickets = vec![
            ticket(1, Some("free_1"), 0, PaymentMethod::Free),
            ticket(2, Some("pi_1"), 1000, PaymentMethod::Card),
        ];
        let settlement = settle(&tickets, &FeeSchedule::default());
        assert_eq!(settlement.groups.len(), 1);
        assert_eq!(settlement.groups[0].payment_id, "pi_1");
    }

    #[test]
    fn refunded_tickets_are_not_settled() {
        let mut refunded = ticket(1, Some("pi_1"), 1000, PaymentMethod::Card);
        refunded.status = TicketStatus::Refunded;
        let settlement = settle(&[refunded], &FeeSchedule::default());
        assert!(settlement.groups.is_empty());
        assert_eq!(settlement.totals, SettlementTotals::default());
    }

    #[test]
    fn tickets_without_payment_id_form_their_own_group() {
        let tickets = vec![
            ticket(1, None, 1000, PaymentMethod::MobileMoney),
            ticket(2, Some(" "), 1000, PaymentMethod::MobileMoney),
        ];
        let settlement = settle(&tickets, &FeeSchedule::default());
        assert_eq!(settlement.totals.payment_groups, 2);
    }

    #[test]
    fn card_fee_is_converted_back_with_recorded_fx_rate() {
        let mut converted = ticket(1, Some("pi_fx"), 1000, PaymentMethod::Card);
        converted.fx_rate = Some(Decimal::from(130));
        let settlement = settle(&[converted], &FeeSchedule::default());
        // charged 130000 HTG cents, fee 3770 + 30 = 3800, back to USD = 29.23 -> 29
        assert_eq!(settlement.groups[0].processing_fee, 29);
        assert_eq!(settlement.groups[0].organizer_net, 1000 - 100 - 29);
    }

    #[test]
    fn invalid_fx_rate_falls_back_to_gross() {
        let mut ticket = ticket(1, Some("pi_bad"), 10_000, PaymentMethod::Card);
        ticket.fx_rate = Some(Decimal::ZERO);
        let settlement = settle(&[ticket], &FeeSchedule::default());
        assert_eq!(settlement.groups[0].processing_fee, 320);
    }

    #[test]
    fn recorded_charged_amounts_take_precedence() {
        let mut a = ticket(1, Some("pi_c"), 1000, PaymentMethod::Card);
        let mut b = ticket(2, Some("pi_c"), 1000, PaymentMethod::Card);
        a.charged_amount = Some(1500);
        b.charged_amount = Some(1500);
        let settlement = settle(&[a, b], &FeeSchedule::default());
        // 2.9% of 3000 = 87, plus 30, no rate so no conversion
        assert_eq!(settlement.groups[0].processing_fee, 117);
    }

    #[test]
    fn proportional_allocation_absorbs_remainder_in_last_part() {
        assert_eq!(allocate_proportionally(100, &[1, 1, 1]), vec![33, 33, 34]);
        assert_eq!(allocate_proportionally(7, &[10]), vec![7]);
        assert_eq!(allocate_proportionally(5, &[0, 0]), vec![0, 5]);
        assert!(allocate_proportionally(5, &[]).is_empty());
    }
}
