//! Diagonal Gaussian actor-critic for continuous actions
//!
//! # Architecture
//!
//! ```text
//!        Input (observations)
//!          /            \
//!   [Dense(h)] Tanh   [Dense(h)] Tanh
//!   [Dense(h)] Tanh   [Dense(h)] Tanh
//!   [Dense(act)]      [Dense(1)]
//!        |                 |
//!      mean              value
//!
//!   std = exp(log_std), log_std learned and state-independent
//! ```
//!
//! The policy and value networks share no layers.

use std::f64::consts::PI;

use anyhow::Result;
use tch::{
    Device, Kind, Tensor,
    nn::{self, Init, Module},
};

use super::PolicyValueModel;

const LOG_STD_MIN: f64 = -20.0;
const LOG_STD_MAX: f64 = 2.0;

/// Gaussian policy with separate mean and value networks
pub struct GaussianPolicy {
    vs: nn::VarStore,
    pi: nn::Sequential,
    v: nn::Sequential,
    log_std: Tensor,
    device: Device,
    obs_dim: i64,
    act_dim: i64,
}

fn mlp(path: nn::Path, in_dim: i64, hidden_dim: i64, out_dim: i64, out_gain: f64) -> nn::Sequential {
    let hidden = nn::LinearConfig {
        ws_init: Init::Orthogonal { gain: 2.0_f64.sqrt() },
        ..Default::default()
    };
    let output = nn::LinearConfig { ws_init: Init::Orthogonal { gain: out_gain }, ..Default::default() };

    nn::seq()
        .add(nn::linear(&path / "fc1", in_dim, hidden_dim, hidden))
        .add_fn(|x| x.tanh())
        .add(nn::linear(&path / "fc2", hidden_dim, hidden_dim, hidden))
        .add_fn(|x| x.tanh())
        .add(nn::linear(&path / "out", hidden_dim, out_dim, output))
}

impl GaussianPolicy {
    /// Create a policy on CUDA when available, CPU otherwise
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Observation space dimensionality
    /// * `act_dim` - Action space dimensionality
    /// * `hidden_dim` - Size of hidden layers
    pub fn new(obs_dim: i64, act_dim: i64, hidden_dim: i64) -> Self {
        let device = Device::cuda_if_available();
        tracing::info!("GaussianPolicy using device: {:?}", device);
        Self::with_device(obs_dim, act_dim, hidden_dim, device)
    }

    /// Create a policy on a specific device
    pub fn with_device(obs_dim: i64, act_dim: i64, hidden_dim: i64, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let pi = mlp(&root / "pi", obs_dim, hidden_dim, act_dim, 0.01);
        let v = mlp(&root / "v", obs_dim, hidden_dim, 1, 1.0);
        let log_std = root.var("log_std", &[act_dim], Init::Const(0.0));

        Self { vs, pi, v, log_std, device, obs_dim, act_dim }
    }

    /// Forward pass: action means [B, act] and values [B]
    pub fn forward(&self, obs: &Tensor) -> (Tensor, Tensor) {
        (self.pi.forward(obs), self.v.forward(obs).squeeze_dim(-1))
    }

    fn log_std(&self) -> Tensor {
        self.log_std.clamp(LOG_STD_MIN, LOG_STD_MAX)
    }

    /// Log density of `actions` under `N(mean, exp(log_std))`, summed over action dims
    fn log_prob(&self, mean: &Tensor, actions: &Tensor) -> Tensor {
        let log_std = self.log_std();
        let z = (actions - mean) / log_std.exp();
        (z.square() * -0.5 - &log_std - 0.5 * (2.0 * PI).ln()).sum_dim_intlist(-1, false, Kind::Float)
    }

    /// Deterministic action: the distribution mean
    pub fn act_deterministic(&self, obs: &Tensor) -> Tensor {
        self.pi.forward(obs)
    }

    fn std(&self) -> Tensor {
        self.log_std().exp()
    }

    /// Observation dimensionality
    pub fn obs_dim(&self) -> i64 {
        self.obs_dim
    }

    /// Action dimensionality
    pub fn act_dim(&self) -> i64 {
        self.act_dim
    }

    /// Save model parameters to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        self.vs.save(path)?;
        Ok(())
    }

    /// Load model parameters from a file
    pub fn load<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<()> {
        self.vs.load(path)?;
        Ok(())
    }
}

impl PolicyValueModel for GaussianPolicy {
    fn act(&self, obs: &Tensor) -> (Tensor, Tensor, Tensor) {
        let (mean, values) = self.forward(obs);
        let noise = Tensor::randn_like(&mean);
        let actions = &mean + noise * self.std();
        let log_probs = self.log_prob(&mean, &actions);
        (actions, log_probs, values)
    }

    fn evaluate_actions(&self, obs: &Tensor, actions: &Tensor) -> (Tensor, Tensor, Tensor) {
        let (mean, values) = self.forward(obs);
        let log_probs = self.log_prob(&mean, actions);

        // H = sum(0.5 + 0.5 ln 2π + log_std), identical for every row
        let per_row = (self.log_std() + 0.5 + 0.5 * (2.0 * PI).ln()).sum(Kind::Float);
        let entropy = Tensor::ones([mean.size()[0]], (Kind::Float, self.device)) * per_row;
        (log_probs, entropy, values)
    }

    fn value(&self, obs: &Tensor) -> Tensor {
        self.v.forward(obs).squeeze_dim(-1)
    }

    fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    fn device(&self) -> Device {
        self.device
    }
}
