//! Loss diagnostics reported by each PPO update

use std::ops::AddAssign;

use serde::Serialize;

/// Loss diagnostics of one update
///
/// A minibatch step yields one sample with `gradient_steps == 1`. Samples
/// are summed with `+=` and [`TrainingStats::mean`] turns the sum into the
/// per-step mean reported for the update. `clip_fraction` and `approx_kl`
/// never gate training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrainingStats {
    /// Clipped surrogate loss
    pub policy_loss: f64,

    /// Value MSE
    pub value_loss: f64,

    /// Mean policy entropy
    pub entropy: f64,

    /// `policy + vf_coef * value - ent_coef * entropy`
    pub total_loss: f64,

    /// Share of samples whose ratio left the clip range
    pub clip_fraction: f64,

    /// Mean of `old_log_prob - log_prob`
    pub approx_kl: f64,

    /// How much of the return variance the value head explains
    pub explained_var: f64,

    /// Minibatch steps folded into these numbers
    pub gradient_steps: usize,
}

impl TrainingStats {
    /// Per-step mean of an accumulated sum
    pub fn mean(&self) -> Self {
        if self.gradient_steps == 0 {
            return Self::default();
        }
        let n = self.gradient_steps as f64;

        Self {
            policy_loss: self.policy_loss / n,
            value_loss: self.value_loss / n,
            entropy: self.entropy / n,
            total_loss: self.total_loss / n,
            clip_fraction: self.clip_fraction / n,
            approx_kl: self.approx_kl / n,
            explained_var: self.explained_var / n,
            gradient_steps: self.gradient_steps,
        }
    }
}

impl AddAssign for TrainingStats {
    fn add_assign(&mut self, step: TrainingStats) {
        self.policy_loss += step.policy_loss;
        self.value_loss += step.value_loss;
        self.entropy += step.entropy;
        self.total_loss += step.total_loss;
        self.clip_fraction += step.clip_fraction;
        self.approx_kl += step.approx_kl;
        self.explained_var += step.explained_var;
        self.gradient_steps += step.gradient_steps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(policy_loss: f64, clip_fraction: f64, approx_kl: f64) -> TrainingStats {
        TrainingStats { policy_loss, clip_fraction, approx_kl, gradient_steps: 1, ..Default::default() }
    }

    #[test]
    fn test_mean_over_steps() {
        let mut sum = TrainingStats::default();
        sum += step(1.0, 0.0, 0.1);
        sum += step(3.0, 1.0, 0.3);

        let mean = sum.mean();
        assert_eq!(mean.policy_loss, 2.0);
        assert_eq!(mean.clip_fraction, 0.5);
        assert!((mean.approx_kl - 0.2).abs() < 1e-12);
        assert_eq!(mean.gradient_steps, 2);
    }

    #[test]
    fn test_mean_without_steps() {
        assert_eq!(TrainingStats::default().mean(), TrainingStats::default());
    }
}
