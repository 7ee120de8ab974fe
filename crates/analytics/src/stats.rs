//! Small descriptive statistics over `Decimal` samples.

use rust_decimal::Decimal;

/// `numerator / denominator`, or `None` when the denominator is zero.
pub fn ratio(numerator: usize, denominator: usize) -> Option<Decimal> {
    if denominator == 0 {
        return None;
    }
    Some(Decimal::from(numerator) / Decimal::from(denominator))
}

/// `numerator / denominator` for decimals, or `None` when the denominator is zero.
pub fn checked_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator)
}

pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len()))
}

pub fn median(values: &[Decimal]) -> Option<Decimal> {
    let sorted = sorted(values);
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / Decimal::TWO),
    }
}

/// First, second and third quartile using the exclusive method
/// (the `(n + 1)` interpolation rule).
///
/// A single sample is returned as all three quartiles.
pub fn quartiles(values: &[Decimal]) -> Option<[Decimal; 3]> {
    let data = sorted(values);
    let len = data.len();
    match len {
        0 => None,
        1 => Some([data[0]; 3]),
        _ => {
            let m = len as i64 + 1;
            let mut result = [Decimal::ZERO; 3];
            for (slot, i) in result.iter_mut().zip(1..=3_i64) {
                let j = (i * m / 4).clamp(1, len as i64 - 1);
                let delta = i * m - j * 4;
                let lower = data[(j - 1) as usize];
                let upper = data[j as usize];
                *slot = (lower * Decimal::from(4 - delta) + upper * Decimal::from(delta))
                    / Decimal::from(4);
            }
            Some(result)
        }
    }
}

fn sorted(values: &[Decimal]) -> Vec<Decimal> {
    let mut data = values.to_vec();
    data.sort();
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ratio_distinguishes_zero_from_undefined() {
        assert_eq!(ratio(0, 4), Some(Decimal::ZERO));
        assert_eq!(ratio(3, 0), None);
        assert_eq!(ratio(3, 4), Some(dec!(0.75)));
        assert_eq!(checked_ratio(dec!(10), Decimal::ZERO), None);
    }

    #[test]
    fn mean_and_median() {
        let values = [dec!(30), dec!(10), dec!(20), dec!(60)];
        assert_eq!(mean(&values), Some(dec!(30)));
        assert_eq!(median(&values), Some(dec!(25)));
        assert_eq!(median(&values[..3]), Some(dec!(20)));
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn quartiles_follow_the_exclusive_method() {
        // Same answer as Python's statistics.quantiles(data, n=4).
        let values: Vec<Decimal> = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
            .into_iter()
            .map(Decimal::from)
            .collect();
        assert_eq!(quartiles(&values), Some([dec!(2.75), dec!(5.5), dec!(8.25)]));

        assert_eq!(quartiles(&[dec!(42)]), Some([dec!(42); 3]));
        assert_eq!(quartiles(&[]), None);
    }
}
