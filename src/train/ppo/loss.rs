//! Loss computation functions for PPO
//!
//! This module contains the core loss computation functions used
//! in PPO training including policy loss, value loss, and entropy loss.

use tch::{Kind, Tensor};

/// Normalization epsilon for advantages
pub const ADV_EPS: f64 = 1e-8;

/// Normalize advantages within one minibatch: `(a - mean) / (std + 1e-8)`
///
/// Uses the population standard deviation so a single-row minibatch
/// normalizes to zero instead of NaN. This intentionally differs from the
/// Bessel-corrected `std()` of reference PPO implementations.
pub fn normalize_advantages(advantages: &Tensor) -> Tensor {
    let mean = advantages.mean(Kind::Float);
    let std = advantages.std(false);
    (advantages - mean) / (std + ADV_EPS)
}

/// Compute PPO policy loss with clipping
///
/// Returns (policy_loss, clip_fraction, approx_kl). The last two are
/// diagnostics only.
///
/// # Arguments
/// * `log_probs` - Log probabilities of actions under current policy
/// * `old_log_probs` - Log probabilities of actions under old policy
/// * `advantages` - Normalized advantages
/// * `clip_range` - PPO clipping parameter (epsilon)
pub fn compute_policy_loss(
    log_probs: &Tensor,
    old_log_probs: &Tensor,
    advantages: &Tensor,
    clip_range: f64,
) -> (Tensor, f64, f64) {
    let ratio = (log_probs - old_log_probs).exp();

    let clipped_ratio = ratio.clamp(1.0 - clip_range, 1.0 + clip_range);
    let policy_loss_1 = advantages * &ratio;
    let policy_loss_2 = advantages * clipped_ratio;
    let policy_loss = -policy_loss_1.minimum(&policy_loss_2).mean(Kind::Float);

    let clip_fraction = (&ratio - 1.0).abs().gt(clip_range).to_kind(Kind::Float).mean(Kind::Float);
    let approx_kl = (old_log_probs - log_probs).mean(Kind::Float);

    (
        policy_loss,
        f64::try_from(&clip_fraction).unwrap_or(0.0),
        f64::try_from(&approx_kl).unwrap_or(0.0),
    )
}

/// Compute value function loss (mean squared error)
///
/// Returns (value_loss, explained_variance)
///
/// # Arguments
/// * `values` - Predicted values under current value function
/// * `returns` - Computed returns (targets)
pub fn compute_value_loss(values: &Tensor, returns: &Tensor) -> (Tensor, f64) {
    let value_loss = (values - returns).square().mean(Kind::Float);

    let var_returns = f64::try_from(returns.var(false)).unwrap_or(0.0);
    let explained_var = if var_returns == 0.0 {
        1.0
    } else {
        1.0 - f64::try_from((returns - values).var(false)).unwrap_or(0.0) / var_returns
    };

    (value_loss, explained_var)
}

/// Compute entropy loss (negative entropy for maximization)
///
/// # Arguments
/// * `entropy` - Per-sample entropy from the policy distribution
pub fn compute_entropy_loss(entropy: &Tensor) -> Tensor {
    -entropy.mean(Kind::Float)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(t: &Tensor) -> f64 {
        f64::try_from(t).unwrap()
    }

    #[test]
    fn test_normalize_advantages() {
        let adv = Tensor::from_slice(&[1.0_f32, 2.0, 3.0, 4.0]);
        let norm = normalize_advantages(&adv);

        assert!(scalar(&norm.mean(Kind::Float)).abs() < 1e-6);
        assert!((scalar(&norm.std(false)) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_normalize_uses_population_std() {
        // population std of [1, 3] is 1; the unbiased estimate would be sqrt(2)
        let norm = normalize_advantages(&Tensor::from_slice(&[1.0_f32, 3.0]));
        let values = Vec::<f32>::try_from(&norm).unwrap();
        assert!((values[0] + 1.0).abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_single_row() {
        let norm = normalize_advantages(&Tensor::from_slice(&[5.0_f32]));
        assert_eq!(scalar(&norm.sum(Kind::Float)), 0.0);
    }

    #[test]
    fn test_policy_loss_unclipped_at_ratio_one() {
        let lp = Tensor::from_slice(&[-1.0_f32, -2.0]);
        let adv = Tensor::from_slice(&[1.0_f32, -1.0]);

        let (loss, clip_fraction, approx_kl) = compute_policy_loss(&lp, &lp, &adv, 0.2);
        assert!(scalar(&loss).abs() < 1e-6);
        assert_eq!(clip_fraction, 0.0);
        assert_eq!(approx_kl, 0.0);
    }

    #[test]
    fn test_policy_loss_clips_large_ratio() {
        // ratio = e ~ 2.72 with positive advantage is capped at 1.2
        let old = Tensor::from_slice(&[0.0_f32]);
        let new = Tensor::from_slice(&[1.0_f32]);
        let adv = Tensor::from_slice(&[2.0_f32]);

        let (loss, clip_fraction, _) = compute_policy_loss(&new, &old, &adv, 0.2);
        assert!((scalar(&loss) + 2.4).abs() < 1e-5, "loss {}", scalar(&loss));
        assert_eq!(clip_fraction, 1.0);
    }

    #[test]
    fn test_value_loss_mse() {
        let values = Tensor::from_slice(&[1.0_f32, 2.0]);
        let returns = Tensor::from_slice(&[0.0_f32, 4.0]);

        let (loss, _) = compute_value_loss(&values, &returns);
        assert!((scalar(&loss) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_entropy_loss() {
        let entropy = Tensor::from_slice(&[1.0_f32, 3.0]);
        assert!((scalar(&compute_entropy_loss(&entropy)) + 2.0).abs() < 1e-6);
    }
}
