use super::money::MoneyAmount;

/// One tier of the refund policy table: bookings at least
/// `days_before_departure` days out qualify for `refund_percentage`.
#[derive(Debug, Clone, Copy)]
pub struct RefundPolicy {
    pub days_before_departure: i64,
    pub refund_percentage: u32,
}

/// Ordered most-generous first. The matching tier is the largest
/// threshold at or below the days remaining.
pub const REFUND_POLICIES: &[RefundPolicy] = &[
    RefundPolicy {
        days_before_departure: 30,
        refund_percentage: 100,
    },
    RefundPolicy {
        days_before_departure: 14,
        refund_percentage: 75,
    },
    RefundPolicy {
        days_before_departure: 7,
        refund_percentage: 50,
    },
    RefundPolicy {
        days_before_departure: 3,
        refund_percentage: 25,
    },
    RefundPolicy {
        days_before_departure: 0,
        refund_percentage: 0,
    },
];

/// Advisory free-refund percentage for a booking this many days from
/// departure. Past departure (negative days) nothing qualifies.
pub fn advisory_percentage(days_until_departure: i64) -> u32 {
    REFUND_POLICIES
        .iter()
        .find(|p| p.days_before_departure <= days_until_departure)
        .map(|p| p.refund_percentage)
        .unwrap_or(0)
}

/// Whether a requested amount exceeds the advisory ceiling. Advisory only:
/// the request is still accepted, just marked for manual review.
pub fn exceeds_advisory(payment_amount: MoneyAmount, requested: MoneyAmount, percentage: u32) -> bool {
    percentage > 0 && requested > payment_amount.percentage(percentage)
}
