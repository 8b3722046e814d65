//! Minibatch sampling from rollout buffers

use rand::{Rng, seq::SliceRandom};

use super::storage::RolloutBuffer;

/// Generate minibatch index chunks for one pass over `buffer_size` rows
///
/// The rows are shuffled once and split into contiguous chunks of
/// `batch_size`; the final chunk may be smaller.
pub fn generate_minibatch_indices<R: Rng + ?Sized>(
    buffer_size: usize,
    batch_size: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..buffer_size).collect();
    indices.shuffle(rng);

    indices.chunks(batch_size.max(1)).map(|chunk| chunk.to_vec()).collect()
}

/// Gather the rows at `indices` into a minibatch
pub fn sample_minibatch(buffer: &RolloutBuffer, indices: &[usize]) -> Minibatch {
    let (obs_dim, act_dim) = (buffer.obs_dim(), buffer.act_dim());
    let mut batch = Minibatch {
        observations: Vec::with_capacity(indices.len() * obs_dim),
        actions: Vec::with_capacity(indices.len() * act_dim),
        returns: Vec::with_capacity(indices.len()),
        advantages: Vec::with_capacity(indices.len()),
        old_log_probs: Vec::with_capacity(indices.len()),
        obs_dim,
        act_dim,
    };

    for &idx in indices {
        batch.observations.extend_from_slice(buffer.observation(idx));
        batch.actions.extend_from_slice(buffer.action(idx));
        batch.returns.push(buffer.returns()[idx]);
        batch.advantages.push(buffer.advantages()[idx]);
        batch.old_log_probs.push(buffer.log_probs()[idx]);
    }
    batch
}

/// Minibatch data for training
///
/// Row-major and flattened, ready to be viewed as `[size, dim]` tensors.
#[derive(Debug, Clone)]
pub struct Minibatch {
    /// Observations [batch_size * obs_dim]
    pub observations: Vec<f32>,

    /// Actions [batch_size * act_dim]
    pub actions: Vec<f32>,

    /// Returns [batch_size]
    pub returns: Vec<f32>,

    /// Advantages [batch_size]
    pub advantages: Vec<f32>,

    /// Log probabilities at collection time [batch_size]
    pub old_log_probs: Vec<f32>,

    obs_dim: usize,
    act_dim: usize,
}

impl Minibatch {
    /// Get batch size
    pub fn size(&self) -> usize {
        self.returns.len()
    }

    /// Get observation shape for neural network input
    pub fn obs_shape(&self) -> (usize, usize) {
        (self.size(), self.obs_dim)
    }

    /// Get action shape
    pub fn action_shape(&self) -> (usize, usize) {
        (self.size(), self.act_dim)
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// Single pass of shuffled minibatches over a rollout buffer
///
/// Minibatches are gathered lazily; a new pass needs a new iterator.
pub struct MinibatchIter<'a> {
    buffer: &'a RolloutBuffer,
    indices: Vec<Vec<usize>>,
    current_batch: usize,
}

impl<'a> MinibatchIter<'a> {
    /// Draw a permutation of the stored rows and split it into chunks
    pub fn new<R: Rng + ?Sized>(buffer: &'a RolloutBuffer, batch_size: usize, rng: &mut R) -> Self {
        let indices = generate_minibatch_indices(buffer.len(), batch_size, rng);
        Self { buffer, indices, current_batch: 0 }
    }

    /// Number of minibatches in this pass
    pub fn num_batches(&self) -> usize {
        self.indices.len()
    }
}

impl Iterator for MinibatchIter<'_> {
    type Item = Minibatch;

    fn next(&mut self) -> Option<Self::Item> {
        let batch_indices = self.indices.get(self.current_batch)?;
        self.current_batch += 1;
        Some(sample_minibatch(self.buffer, batch_indices))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.indices.len() - self.current_batch;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MinibatchIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_minibatch_indices_cover_all_rows() {
        let mut rng = StdRng::seed_from_u64(3);
        let chunks = generate_minibatch_indices(10, 4, &mut rng);

        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![4, 4, 2]);
        let mut all: Vec<usize> = chunks.into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_minibatch_rows_match_buffer() {
        let mut buffer = RolloutBuffer::new(6, 2, 1);
        for i in 0..5 {
            let x = i as f32;
            buffer.add(&[x, -x], &[x * 10.0], x, 0.0, -x, false);
        }
        buffer.compute_returns_advantages(1.0, 1.0, 0.0);

        let mut rng = StdRng::seed_from_u64(0);
        let mut seen = 0;
        for batch in buffer.get_with_rng(2, &mut rng) {
            for row in 0..batch.size() {
                let x = batch.observations[row * 2];
                assert_eq!(batch.observations[row * 2 + 1], -x);
                assert_eq!(batch.actions[row], x * 10.0);
                assert_eq!(batch.old_log_probs[row], -x);
                assert_eq!(batch.returns[row], batch.advantages[row]);
            }
            seen += batch.size();
        }
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_iterator_is_single_pass() {
        let mut buffer = RolloutBuffer::new(4, 1, 1);
        for _ in 0..4 {
            buffer.add(&[0.0], &[0.0], 0.0, 0.0, 0.0, false);
        }

        let mut iter = buffer.get(3);
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.next().map(|b| b.size()), Some(3));
        assert_eq!(iter.next().map(|b| b.size()), Some(1));
        assert!(iter.next().is_none());
    }
}
