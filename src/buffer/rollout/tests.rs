//! Scenario tests for the rollout buffer's advantage computation

#[cfg(test)]
mod gae_tests {
    use crate::buffer::rollout::RolloutBuffer;

    fn filled(rewards: &[f32], values: &[f32], dones: &[bool]) -> RolloutBuffer {
        let mut buffer = RolloutBuffer::new(rewards.len(), 1, 1);
        for i in 0..rewards.len() {
            assert!(buffer.add(&[0.0], &[0.0], rewards[i], values[i], 0.0, dones[i]));
        }
        buffer
    }

    #[test]
    fn test_two_step_undiscounted() {
        let mut buffer = filled(&[1.0, 1.0], &[0.0, 0.0], &[false, false]);
        buffer.compute_returns_advantages(1.0, 1.0, 0.0);

        assert_eq!(buffer.advantages(), &[2.0, 1.0]);
        assert_eq!(buffer.returns(), &[2.0, 1.0]);
    }

    #[test]
    fn test_done_isolates_next_value() {
        // Changing value[t+1] must not move advantage[t] when done[t] is set
        let dones = [false, true, false, false];
        let mut a = filled(&[1.0, 1.0, 1.0, 1.0], &[0.5, 0.5, 0.5, 0.5], &dones);
        let mut b = filled(&[1.0, 1.0, 1.0, 1.0], &[0.5, 0.5, 9.0, 0.5], &dones);
        a.compute_returns_advantages(0.99, 0.95, 0.0);
        b.compute_returns_advantages(0.99, 0.95, 0.0);

        assert_eq!(a.advantages()[1], b.advantages()[1]);
        assert_eq!(a.advantages()[0], b.advantages()[0]);
        assert!((a.advantages()[1] - 0.5).abs() < 1e-6, "terminal advantage {}", a.advantages()[1]);
        assert_ne!(a.advantages()[2], b.advantages()[2]);
    }

    #[test]
    fn test_episode_boundaries() {
        // Episode 1: rows 0-2, episode 2: rows 3-4
        let mut buffer = filled(
            &[1.0, 1.0, 1.0, 2.0, 2.0],
            &[0.5, 0.5, 0.5, 1.0, 1.0],
            &[false, false, true, false, false],
        );
        buffer.compute_returns_advantages(0.99, 0.95, 0.0);
        let adv = buffer.advantages();

        // Terminal row: delta = 1.0 - 0.5, nothing accumulated
        assert!((adv[2] - 0.5).abs() < 1e-6, "Terminal step advantage incorrect: {}", adv[2]);
        // Row 1: delta = 1 + 0.99 * 0.5 - 0.5, plus discounted adv[2]
        let expected = (1.0 + 0.99 * 0.5 - 0.5) + 0.99 * 0.95 * 0.5;
        assert!((adv[1] - expected).abs() < 1e-5, "Row 1: expected {}, got {}", expected, adv[1]);
        assert!((adv[3] - adv[0]).abs() > 0.1, "Episode 2 advantages should differ from episode 1");
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut buffer = filled(
            &[0.3, -1.0, 2.0, 0.0, 5.0],
            &[0.1, 0.2, -0.3, 0.4, 1.0],
            &[false, false, true, false, false],
        );

        buffer.compute_returns_advantages(0.99, 0.95, 0.7);
        let first = (buffer.advantages().to_vec(), buffer.returns().to_vec());
        buffer.compute_returns_advantages(0.99, 0.95, 0.7);

        assert_eq!(first.0, buffer.advantages());
        assert_eq!(first.1, buffer.returns());
    }

    #[test]
    fn test_partial_buffer_bootstraps_at_ptr() {
        // Rows beyond the write pointer are never read
        let mut buffer = RolloutBuffer::new(8, 1, 1);
        buffer.add(&[0.0], &[0.0], 0.0, 0.0, 0.0, false);
        buffer.add(&[0.0], &[0.0], 1.0, 0.0, 0.0, false);
        buffer.compute_returns_advantages(1.0, 1.0, 10.0);

        assert_eq!(buffer.advantages(), &[11.0, 11.0]);
        assert_eq!(buffer.returns().len(), 2);
    }

    #[test]
    fn test_interleaved_agents() {
        // Two agents per tick share one flat sequence
        let mut buffer = RolloutBuffer::new(4, 1, 1);
        for (reward, done) in [(1.0, false), (0.0, true), (1.0, false), (0.0, false)] {
            buffer.add(&[0.0], &[0.0], reward, 0.0, 0.0, done);
        }
        buffer.compute_returns_advantages(1.0, 1.0, 0.0);

        assert_eq!(buffer.advantages(), &[1.0, 0.0, 1.0, 0.0]);
    }
}
