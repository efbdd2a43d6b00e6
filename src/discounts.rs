//! Discounts
//!
//! Coupons attached to subscriptions or customers. Only discounts that outlive the valuation
//! horizon reduce recurring revenue; short-lived promotions do not reflect steady state.

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;

use crate::valuation::Valuation;

/// The reduction a discount grants.
///
/// When both fields are set, a non-zero `amount_off` wins over `percent_off`.
#[derive(Debug, Clone, Default)]
pub struct Coupon {
    /// Fixed amount subtracted, in minor currency units.
    pub amount_off: Option<i64>,

    /// Fraction of the amount subtracted (25% is `0.25`).
    pub percent_off: Option<Percentage>,
}

impl Coupon {
    /// A coupon subtracting a fixed amount in minor units.
    pub fn amount_off(minor: i64) -> Self {
        Self {
            amount_off: Some(minor),
            percent_off: None,
        }
    }

    /// A coupon subtracting a percentage.
    pub fn percent_off(percent: Percentage) -> Self {
        Self {
            amount_off: None,
            percent_off: Some(percent),
        }
    }

    /// Apply the coupon to `amount` (minor units).
    ///
    /// The result is not floored; a large amount-off can make it negative.
    pub fn apply(&self, amount: Decimal) -> Decimal {
        if let Some(minor) = self.amount_off.filter(|minor| *minor > 0) {
            return amount - Decimal::from(minor);
        }

        match self.percent_off.map(fraction) {
            Some(percent) if percent > Decimal::ZERO => amount - amount * percent,
            _ => amount,
        }
    }
}

/// A coupon applied to a subscription or customer.
#[derive(Debug, Clone, Default)]
pub struct Discount {
    /// The coupon, if the provider still has it.
    pub coupon: Option<Coupon>,

    /// When the discount stops applying; `None` means it never does.
    pub end: Option<Timestamp>,
}

impl Discount {
    /// Create a discount for `coupon` ending at `end`.
    pub fn new(coupon: Coupon, end: Option<Timestamp>) -> Self {
        Self {
            coupon: Some(coupon),
            end,
        }
    }

    /// Returns `true` if the discount ends before the valuation horizon.
    pub fn expires_before_horizon(&self, valuation: &Valuation) -> bool {
        self.end.is_some_and(|end| valuation.before_horizon(end))
    }
}

/// Apply `discount` to `amount` (minor units).
///
/// The amount passes through unchanged when there is no discount, no coupon, or the discount
/// ends before the valuation horizon.
pub fn apply_discount(
    amount: Decimal,
    discount: Option<&Discount>,
    valuation: &Valuation,
) -> Decimal {
    let Some(discount) = discount else {
        return amount;
    };

    if discount.expires_before_horizon(valuation) {
        return amount;
    }

    discount
        .coupon
        .as_ref()
        .map_or(amount, |coupon| coupon.apply(amount))
}

/// Apply each discount in turn, each to the output of the previous one.
pub fn apply_discounts<'a>(
    amount: Decimal,
    discounts: impl IntoIterator<Item = Option<&'a Discount>>,
    valuation: &Valuation,
) -> Decimal {
    discounts
        .into_iter()
        .fold(amount, |amount, discount| apply_discount(amount, discount, valuation))
}

/// The fraction a percentage represents.
fn fraction(percent: Percentage) -> Decimal {
    // decimal_percentage doesn't expose the underlying Decimal
    percent * Decimal::ONE
}

#[cfg(test)]
mod tests {
    use jiff::{ToSpan, tz::TimeZone};
    use testresult::TestResult;

    use super::*;

    fn valuation() -> TestResult<Valuation> {
        Ok(Valuation::at("2024-06-15T00:00:00Z".parse()?, TimeZone::UTC)?)
    }

    fn ends_in(valuation: &Valuation, coupon: Coupon, months: i64) -> TestResult<Discount> {
        let end = valuation.now().to_zoned(TimeZone::UTC).checked_add(months.months())?;

        Ok(Discount::new(coupon, Some(end.timestamp())))
    }

    #[test]
    fn amount_off_subtracts_minor_units() -> TestResult {
        let valuation = valuation()?;
        let discount = ends_in(&valuation, Coupon::amount_off(20), 24)?;

        assert_eq!(
            apply_discount(Decimal::from(100), Some(&discount), &valuation),
            Decimal::from(80)
        );

        Ok(())
    }

    #[test]
    fn percent_off_subtracts_fraction() -> TestResult {
        let valuation = valuation()?;
        let discount = ends_in(&valuation, Coupon::percent_off(Percentage::from(0.25)), 24)?;

        assert_eq!(
            apply_discount(Decimal::from(100), Some(&discount), &valuation),
            Decimal::from(75)
        );

        Ok(())
    }

    #[test]
    fn short_lived_discount_is_ignored() -> TestResult {
        let valuation = valuation()?;

        for coupon in [
            Coupon::amount_off(20),
            Coupon::percent_off(Percentage::from(0.5)),
        ] {
            let discount = ends_in(&valuation, coupon, 11)?;

            for amount in [Decimal::ZERO, Decimal::from(100), Decimal::new(12345, 2)] {
                assert_eq!(apply_discount(amount, Some(&discount), &valuation), amount);
            }
        }

        Ok(())
    }

    #[test]
    fn discount_without_end_applies() -> TestResult {
        let valuation = valuation()?;
        let discount = Discount::new(Coupon::amount_off(30), None);

        assert_eq!(
            apply_discount(Decimal::from(100), Some(&discount), &valuation),
            Decimal::from(70)
        );

        Ok(())
    }

    #[test]
    fn missing_discount_or_coupon_passes_through() -> TestResult {
        let valuation = valuation()?;
        let no_coupon = Discount {
            coupon: None,
            end: None,
        };

        assert_eq!(apply_discount(Decimal::TEN, None, &valuation), Decimal::TEN);
        assert_eq!(
            apply_discount(Decimal::TEN, Some(&no_coupon), &valuation),
            Decimal::TEN
        );

        Ok(())
    }

    #[test]
    fn empty_coupon_passes_through() {
        assert_eq!(Coupon::default().apply(Decimal::TEN), Decimal::TEN);
    }

    #[test]
    fn amount_off_takes_precedence_over_percent_off() {
        let coupon = Coupon {
            amount_off: Some(10),
            percent_off: Some(Percentage::from(0.5)),
        };

        assert_eq!(coupon.apply(Decimal::from(100)), Decimal::from(90));
    }

    #[test]
    fn zero_amount_off_falls_back_to_percent_off() {
        let coupon = Coupon {
            amount_off: Some(0),
            percent_off: Some(Percentage::from(0.5)),
        };

        assert_eq!(coupon.apply(Decimal::from(100)), Decimal::from(50));
    }

    #[test]
    fn amount_off_can_go_negative() {
        assert_eq!(
            Coupon::amount_off(150).apply(Decimal::from(100)),
            Decimal::from(-50)
        );
    }

    #[test]
    fn discounts_compound_in_order() -> TestResult {
        let valuation = valuation()?;
        let subscription = ends_in(&valuation, Coupon::amount_off(20), 24)?;
        let customer = ends_in(&valuation, Coupon::percent_off(Percentage::from(0.5)), 24)?;

        // (100 - 20) * 0.5, not 100 - 20 - 50.
        assert_eq!(
            apply_discounts(
                Decimal::from(100),
                [Some(&subscription), Some(&customer)],
                &valuation
            ),
            Decimal::from(40)
        );

        Ok(())
    }

    #[test]
    fn each_stacked_discount_checks_its_own_expiry() -> TestResult {
        let valuation = valuation()?;
        let expiring = ends_in(&valuation, Coupon::amount_off(20), 3)?;
        let lasting = ends_in(&valuation, Coupon::percent_off(Percentage::from(0.25)), 36)?;

        assert_eq!(
            apply_discounts(Decimal::from(100), [Some(&expiring), Some(&lasting)], &valuation),
            Decimal::from(75)
        );

        Ok(())
    }
}
