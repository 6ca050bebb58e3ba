//! The annualization formula.

use rust_decimal::Decimal;

/// Days per year; leap years are deliberately ignored.
const DAYS_PER_YEAR: u32 = 365;

/// `365 * total_rewards / effective_balance`, exact decimal arithmetic.
///
/// A zero denominator means the eligible set was empty; the rate is zero by
/// definition, not an error.
pub fn annualized_rate(total_rewards_wei: Decimal, effective_balance_wei: Decimal) -> Decimal {
    if effective_balance_wei.is_zero() {
        return Decimal::ZERO;
    }
    Decimal::from(DAYS_PER_YEAR) * total_rewards_wei / effective_balance_wei
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_effective_balance_yields_zero_rate() {
        assert_eq!(
            annualized_rate(Decimal::from(1_000_000u64), Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_closed_form_day_rate() {
        // 29 validators earning 92_800_000 Gwei consensus rewards plus
        // 65_250_000 Gwei in fees over 32 ETH effective balance each.
        let total_rewards_wei = Decimal::from(158_050_000_000_000_000u64);
        let effective_wei: Decimal = "928000000000000000000".parse().unwrap();
        let rate = annualized_rate(total_rewards_wei, effective_wei);
        assert_eq!(rate, "0.0621640625".parse().unwrap());
    }

    #[test]
    fn test_negative_rewards_yield_negative_rate() {
        let rate = annualized_rate(
            Decimal::from(-320_000_000_000i64),
            "32000000000000000000".parse().unwrap(),
        );
        assert!(rate.is_sign_negative());
    }
}
