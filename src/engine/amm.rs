// Constant-product pricing for binary markets
//
// Formula: yes_shares * no_shares = k
//
// Buying YES adds the wagered amount to the NO pool and takes shares from the
// YES pool (and symmetrically for NO), so k is preserved by construction.
//
// Probability convention: prob(YES) = no_shares / (yes_shares + no_shares).
// The NO-pool share of total liquidity is the displayed YES probability;
// buying YES grows the NO pool and moves the probability up.

use crate::models::Outcome;

/// Relative tolerance for the pool product invariant. The update path is
/// algebraically exact, so observed drift is pure floating-point noise.
pub const PRODUCT_TOLERANCE: f64 = 1e-9;

/// Quote the share payout for a wager against the current pools.
///
/// Callers validate inputs first: pools strictly positive, amount finite and
/// positive. The function is pure and performs no I/O.
pub fn quote(yes_shares: f64, no_shares: f64, outcome: Outcome, amount: f64) -> f64 {
    let k = yes_shares * no_shares;
    match outcome {
        Outcome::Yes => {
            let new_no = no_shares + amount;
            let new_yes = k / new_no;
            yes_shares - new_yes
        }
        Outcome::No => {
            let new_yes = yes_shares + amount;
            let new_no = k / new_yes;
            no_shares - new_no
        }
    }
}

/// Implied probability of the YES outcome for a pool state.
pub fn probability(yes_shares: f64, no_shares: f64) -> f64 {
    no_shares / (yes_shares + no_shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative_diff(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn test_equal_pools_quote() {
        // 100/100 pools, 50 on YES: shares = 100 - 10000/150
        let shares = quote(100.0, 100.0, Outcome::Yes, 50.0);
        assert!((shares - 33.333333333333336).abs() < 1e-9);
    }

    #[test]
    fn test_no_side_is_symmetric() {
        let yes_shares = quote(100.0, 100.0, Outcome::Yes, 50.0);
        let no_shares = quote(100.0, 100.0, Outcome::No, 50.0);
        assert!((yes_shares - no_shares).abs() < 1e-12);
    }

    #[test]
    fn test_product_preserved_by_update() {
        let (mut yes, mut no) = (100.0_f64, 100.0_f64);
        let k = yes * no;

        let shares = quote(yes, no, Outcome::Yes, 50.0);
        yes -= shares;
        no += 50.0;

        assert!(relative_diff(yes * no, k) < PRODUCT_TOLERANCE);
        assert!((yes - 66.66666666666667).abs() < 1e-9);
        assert!((no - 150.0).abs() < 1e-12);
    }

    #[test]
    fn test_product_preserved_over_long_sequence() {
        let (mut yes, mut no) = (250.0_f64, 250.0_f64);
        let k = yes * no;

        for i in 0..500 {
            let amount = 1.0 + (i % 7) as f64;
            if i % 2 == 0 {
                let shares = quote(yes, no, Outcome::Yes, amount);
                yes -= shares;
                no += amount;
            } else {
                let shares = quote(yes, no, Outcome::No, amount);
                yes += amount;
                no -= shares;
            }
            assert!(relative_diff(yes * no, k) < PRODUCT_TOLERANCE);
        }
    }

    #[test]
    fn test_probability_convention() {
        assert!((probability(100.0, 100.0) - 0.5).abs() < 1e-12);

        // Post-trade pools from the 50-on-YES quote above
        let prob = probability(66.66666666666667, 150.0);
        assert!((prob - 0.6923076923076923).abs() < 1e-9);
    }

    #[test]
    fn test_buying_yes_moves_probability_up() {
        let (mut yes, mut no) = (100.0_f64, 100.0_f64);
        let before = probability(yes, no);

        let shares = quote(yes, no, Outcome::Yes, 25.0);
        yes -= shares;
        no += 25.0;

        assert!(probability(yes, no) > before);
    }

    #[test]
    fn test_probability_stays_inside_open_interval() {
        let (mut yes, mut no) = (100.0_f64, 100.0_f64);

        // Hammer one side; pools shrink but never reach zero
        for _ in 0..1000 {
            let shares = quote(yes, no, Outcome::Yes, 100.0);
            yes -= shares;
            no += 100.0;
        }

        let prob = probability(yes, no);
        assert!(yes > 0.0);
        assert!(prob > 0.0 && prob < 1.0);
    }

    #[test]
    fn test_shares_exceed_amount_on_longshot() {
        // Buying the unlikely side pays more than 1 share per unit
        let shares = quote(400.0, 25.0, Outcome::Yes, 50.0);
        assert!(shares > 50.0);
    }

    #[test]
    fn test_price_impact_increases_with_size() {
        let small = quote(100.0, 100.0, Outcome::Yes, 10.0) / 10.0;
        let large = quote(100.0, 100.0, Outcome::Yes, 100.0) / 100.0;
        // Larger trades get fewer shares per unit wagered
        assert!(large < small);
    }
}
