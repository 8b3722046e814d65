//! Rollout buffer storage and data management
//!
//! Transitions from every agent are written into one flat sequence. With
//! `n` agents the rows of a tick are consecutive, so a rollout of `horizon`
//! ticks fills `horizon * n` rows.

use rand::Rng;

use super::{gae::compute_gae, sampling::MinibatchIter};

/// Fixed-capacity buffer of on-policy transitions
#[derive(Debug, Clone)]
pub struct RolloutBuffer {
    /// Maximum number of rows
    capacity: usize,

    /// Dimensionality of observations
    obs_dim: usize,

    /// Dimensionality of actions
    act_dim: usize,

    /// Write pointer; rows `[0, ptr)` are valid
    ptr: usize,

    /// Observations [capacity * obs_dim]
    observations: Vec<f32>,

    /// Actions taken [capacity * act_dim]
    actions: Vec<f32>,

    /// Rewards received [capacity]
    rewards: Vec<f32>,

    /// Value estimates [capacity]
    values: Vec<f32>,

    /// Log probabilities [capacity]
    log_probs: Vec<f32>,

    /// Episode boundary flags [capacity]
    dones: Vec<bool>,

    /// Computed advantages [capacity]
    advantages: Vec<f32>,

    /// Computed returns [capacity]
    returns: Vec<f32>,
}

impl RolloutBuffer {
    /// Create a new rollout buffer
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of rows (`horizon * agent_count`)
    /// * `obs_dim` - Dimensionality of observations
    /// * `act_dim` - Dimensionality of actions
    pub fn new(capacity: usize, obs_dim: usize, act_dim: usize) -> Self {
        Self {
            capacity,
            obs_dim,
            act_dim,
            ptr: 0,
            observations: vec![0.0; capacity * obs_dim],
            actions: vec![0.0; capacity * act_dim],
            rewards: vec![0.0; capacity],
            values: vec![0.0; capacity],
            log_probs: vec![0.0; capacity],
            dones: vec![false; capacity],
            advantages: vec![0.0; capacity],
            returns: vec![0.0; capacity],
        }
    }

    /// Append a transition
    ///
    /// Returns `false` without writing anything once the buffer is full.
    pub fn add(
        &mut self,
        observation: &[f32],
        action: &[f32],
        reward: f32,
        value: f32,
        log_prob: f32,
        done: bool,
    ) -> bool {
        if self.ptr >= self.capacity {
            return false;
        }
        debug_assert_eq!(observation.len(), self.obs_dim, "observation dimension mismatch");
        debug_assert_eq!(action.len(), self.act_dim, "action dimension mismatch");

        let i = self.ptr;
        self.observations[i * self.obs_dim..(i + 1) * self.obs_dim].copy_from_slice(observation);
        self.actions[i * self.act_dim..(i + 1) * self.act_dim].copy_from_slice(action);
        self.rewards[i] = reward;
        self.values[i] = value;
        self.log_probs[i] = log_prob;
        self.dones[i] = done;
        self.ptr += 1;
        true
    }

    /// Fill advantages and returns for rows `[0, ptr)` with GAE-lambda
    ///
    /// `last_value` bootstraps the final row. Only the stored rows are read,
    /// so repeated calls give identical results.
    pub fn compute_returns_advantages(&mut self, gamma: f32, gae_lambda: f32, last_value: f32) {
        let n = self.ptr;
        compute_gae(
            &self.rewards[..n],
            &self.values[..n],
            &self.dones[..n],
            last_value,
            gamma,
            gae_lambda,
            &mut self.advantages[..n],
            &mut self.returns[..n],
        );
    }

    /// Shuffled minibatches over the stored rows, using the thread RNG
    pub fn get(&self, minibatch_size: usize) -> MinibatchIter<'_> {
        self.get_with_rng(minibatch_size, &mut rand::thread_rng())
    }

    /// Shuffled minibatches over the stored rows
    ///
    /// The permutation is drawn once here; each call gives a new order.
    pub fn get_with_rng<R: Rng + ?Sized>(&self, minibatch_size: usize, rng: &mut R) -> MinibatchIter<'_> {
        MinibatchIter::new(self, minibatch_size, rng)
    }

    /// Reset the buffer for a new rollout
    pub fn reset(&mut self) {
        self.ptr = 0;
        self.advantages.fill(0.0);
        self.returns.fill(0.0);
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.ptr
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.ptr == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.ptr >= self.capacity
    }

    /// Maximum number of rows
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Observation dimensionality
    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// Action dimensionality
    pub fn act_dim(&self) -> usize {
        self.act_dim
    }

    /// Observation of row `i`
    pub fn observation(&self, i: usize) -> &[f32] {
        &self.observations[i * self.obs_dim..(i + 1) * self.obs_dim]
    }

    /// Action of row `i`
    pub fn action(&self, i: usize) -> &[f32] {
        &self.actions[i * self.act_dim..(i + 1) * self.act_dim]
    }

    /// Stored rewards
    pub fn rewards(&self) -> &[f32] {
        &self.rewards[..self.ptr]
    }

    /// Stored value estimates
    pub fn values(&self) -> &[f32] {
        &self.values[..self.ptr]
    }

    /// Stored log probabilities
    pub fn log_probs(&self) -> &[f32] {
        &self.log_probs[..self.ptr]
    }

    /// Stored done flags
    pub fn dones(&self) -> &[bool] {
        &self.dones[..self.ptr]
    }

    /// Advantages (valid after `compute_returns_advantages`)
    pub fn advantages(&self) -> &[f32] {
        &self.advantages[..self.ptr]
    }

    /// Returns (valid after `compute_returns_advantages`)
    pub fn returns(&self) -> &[f32] {
        &self.returns[..self.ptr]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollout_buffer_creation() {
        let buffer = RolloutBuffer::new(10, 17, 4);

        assert_eq!(buffer.capacity(), 10);
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_rollout_buffer_add_and_reset() {
        let mut buffer = RolloutBuffer::new(5, 2, 1);

        assert!(buffer.add(&[1.0, 2.0], &[0.5], 1.5, 0.8, -0.2, false));
        assert!(buffer.add(&[2.0, 3.0], &[-0.5], 2.0, 1.2, -0.1, true));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.observation(1), &[2.0, 3.0]);
        assert_eq!(buffer.action(0), &[0.5]);
        assert_eq!(buffer.rewards(), &[1.5, 2.0]);
        assert_eq!(buffer.dones(), &[false, true]);

        buffer.compute_returns_advantages(0.99, 0.95, 0.0);
        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.advantages().is_empty());
        assert!(buffer.add(&[0.0, 0.0], &[0.0], 0.0, 0.0, 0.0, false));
        assert_eq!(buffer.advantages(), &[0.0]);
    }

    #[test]
    fn test_add_beyond_capacity() {
        let capacity = 4;
        let mut buffer = RolloutBuffer::new(capacity, 1, 1);

        for i in 0..capacity {
            assert!(buffer.add(&[i as f32], &[0.0], 1.0, 0.0, 0.0, false));
        }
        assert!(!buffer.add(&[99.0], &[0.0], 1.0, 0.0, 0.0, false));

        assert_eq!(buffer.len(), capacity);
        assert!(buffer.is_full());
        assert_eq!(buffer.observation(capacity - 1), &[3.0]);
    }
}
