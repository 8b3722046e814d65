//! Generalized Advantage Estimation (GAE) computation
//!
//! The recursion runs over one flat sequence of rows. A `done` row cuts
//! both the bootstrap and the accumulated advantage, so nothing after an
//! episode boundary leaks into the rows before it.

/// Compute GAE advantages and returns over a flat sequence
///
/// # Arguments
/// * `rewards`, `values`, `dones` - Stored rows, all the same length
/// * `last_value` - Bootstrap value for the row after the last one
/// * `gamma` - Discount factor (0 < gamma <= 1)
/// * `gae_lambda` - GAE lambda parameter (0 <= lambda <= 1)
/// * `advantages`, `returns` - Output slices, fully overwritten
///
/// # Mathematical Formula
/// ```text
/// m_t = 1 - done_t
/// V'  = V_{t+1} if t+1 < n else last_value
/// δ_t = r_t + γ * m_t * V' - V_t
/// A_t = δ_t + γ * λ * m_t * A_{t+1}
/// R_t = A_t + V_t
/// ```
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    gae_lambda: f32,
    advantages: &mut [f32],
    returns: &mut [f32],
) {
    let n = rewards.len();
    debug_assert_eq!(values.len(), n);
    debug_assert_eq!(dones.len(), n);
    debug_assert_eq!(advantages.len(), n);
    debug_assert_eq!(returns.len(), n);

    let mut last_gae = 0.0;
    for t in (0..n).rev() {
        let next_nonterminal = if dones[t] { 0.0 } else { 1.0 };
        let next_value = if t + 1 < n { values[t + 1] } else { last_value };

        let delta = rewards[t] + gamma * next_nonterminal * next_value - values[t];
        last_gae = delta + gamma * gae_lambda * next_nonterminal * last_gae;

        advantages[t] = last_gae;
        returns[t] = last_gae + values[t];
    }

    debug_assert!(advantages.iter().all(|a| a.is_finite()), "non-finite advantage");
}
