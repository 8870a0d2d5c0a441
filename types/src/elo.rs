use serde::{Deserialize, Serialize};

// K-factor determines how much ratings change after each match
const K: f64 = 32.0;

// Rating difference at which the favorite is expected to score 10:1
const SCALE: f64 = 400.0;

/// Rating deltas for the three possible outcomes of a game.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EloChange {
    pub win: i64,
    pub loss: i64,
    pub draw: i64,
}

impl EloChange {
    /// Computes the deltas player A would receive against player B.
    ///
    /// # Arguments
    /// * `rating_a` - Rating of the player the deltas are computed for.
    /// * `rating_b` - Rating of the opponent.
    ///
    /// # Returns
    /// An [`EloChange`] with `win = round(K * (1 - e))`, `loss = round(K * (0.5 - e))`
    /// and `draw = round(K * e)` where `e` is A's expected score.
    ///
    /// `loss` is not symmetric to `win`: a strong favorite gets a negative `loss`
    /// and an underdog a positive one. The lobby's own numbers follow this shape,
    /// so it is kept as-is.
    pub fn compute(rating_a: i64, rating_b: i64) -> Self {
        let expected = expected_score(rating_a, rating_b);
        Self {
            win: (K * (1.0 - expected)).round() as i64,
            loss: (K * (0.5 - expected)).round() as i64,
            draw: (K * expected).round() as i64,
        }
    }
}

/// Expected score of A against B under the logistic model.
fn expected_score(rating_a: i64, rating_b: i64) -> f64 {
    let diff = (rating_b - rating_a) as f64;
    1.0 / (1.0 + 10f64.powf(diff / SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_ratings() {
        let change = EloChange::compute(1500, 1500);
        assert_eq!(
            change,
            EloChange {
                win: 16,
                loss: 0,
                draw: 16
            }
        );
    }

    #[test]
    fn test_underdog() {
        let change = EloChange::compute(1400, 1600);
        assert_eq!(
            change,
            EloChange {
                win: 24,
                loss: 8,
                draw: 8
            }
        );
    }

    #[test]
    fn test_favorite_loss_is_negative() {
        let change = EloChange::compute(1600, 1400);
        assert_eq!(change.win, 8);
        assert_eq!(change.loss, -8);
        assert_eq!(change.draw, 24);
    }

    #[test]
    fn test_expected_scores() {
        assert!((expected_score(1200, 1200) - 0.5).abs() < 1e-12);
        assert!(expected_score(1600, 1200) > 0.9);
        assert!(expected_score(1200, 1600) < 0.1);
    }

    proptest! {
        #[test]
        fn deltas_stay_within_k(a in 0i64..4000, b in 0i64..4000) {
            let change = EloChange::compute(a, b);
            prop_assert!((0..=32).contains(&change.win));
            prop_assert!((0..=32).contains(&change.draw));
            prop_assert!((-16..=16).contains(&change.loss));
            prop_assert!(change.win >= change.loss);
        }
    }
}
