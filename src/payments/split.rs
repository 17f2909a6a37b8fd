use rust_decimal::Decimal;

use super::dto::round_money;

/// Platform commission on split payments, in percent.
pub const PLATFORM_SHARE_PERCENT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitShares {
    pub platform: Decimal,
    pub instructor: Decimal,
}

fn instructor_rate() -> Decimal {
    Decimal::new(100 - PLATFORM_SHARE_PERCENT, 2)
}

/// Instructor share is rounded; the platform takes the remainder, so the shares
/// always add up to the charged amount.
pub fn split_shares(total: Decimal) -> SplitShares {
    let total = round_money(total);
    let instructor = round_money(total * instructor_rate());
    SplitShares {
        platform: total - instructor,
        instructor,
    }
}
