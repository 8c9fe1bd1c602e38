//! Capability- and load-aware worker selection.
//!
//! Selection is a pure function over a registry snapshot: hard requirements
//! filter the candidate set, the survivors are scored, and the best score
//! wins. Load and resource pressure dominate the score so idle nodes are
//! preferred; the GPU headroom bonus only discriminates among GPU-capable
//! nodes, keeping GPU work off already saturated devices.

use aegis_proto::TaskRequirements;

use crate::config::SelectionWeights;
use crate::registry::{WorkerId, WorkerNode};

/// Score every candidate starts from before penalties apply.
const BASE_SCORE: f64 = 100.0;

/// Deterministic best-fit worker selector.
#[derive(Debug, Clone)]
pub struct Selector {
    weights: SelectionWeights,
}

impl Selector {
    /// Creates a selector with the given scoring weights.
    #[must_use]
    pub const fn new(weights: SelectionWeights) -> Self {
        Self { weights }
    }

    /// Picks the best-fit worker for the requirements, if any is eligible.
    ///
    /// Ties on score fall to the lowest worker id in byte order, so the
    /// outcome does not depend on snapshot ordering.
    #[must_use]
    pub fn select(&self, requirements: &TaskRequirements, workers: &[WorkerNode]) -> Option<WorkerId> {
        let mut best: Option<(f64, &WorkerNode)> = None;

        for node in workers.iter().filter(|n| Self::is_suitable(requirements, n)) {
            let score = self.score(node);
            let better = match best {
                None => true,
                Some((best_score, best_node)) => {
                    score > best_score || (score == best_score && node.id < best_node.id)
                }
            };
            if better {
                best = Some((score, node));
            }
        }

        best.map(|(_, node)| node.id.clone())
    }

    /// Checks the hard requirements a candidate must satisfy.
    #[allow(clippy::as_conversions, clippy::cast_precision_loss)]
    fn is_suitable(requirements: &TaskRequirements, node: &WorkerNode) -> bool {
        if !node.status.is_available() {
            return false;
        }

        if requirements.needs_gpu() && !node.capabilities.has_gpu {
            return false;
        }

        if let Some(min_memory) = requirements.min_memory_bytes {
            if node.available_memory() < min_memory as f64 {
                return false;
            }
        }

        true
    }

    /// Scores a candidate; higher is better, clamped to be non-negative.
    ///
    /// GPU-capable nodes only earn the headroom bonus once a heartbeat has
    /// delivered a GPU memory snapshot.
    #[must_use]
    pub fn score(&self, node: &WorkerNode) -> f64 {
        let mut score = BASE_SCORE;

        score -= f64::from(node.current_load) * self.weights.load;
        score -= node.cpu_usage * self.weights.cpu;
        score -= node.memory_usage * self.weights.memory;

        if node.capabilities.has_gpu {
            if let Some(gpu) = &node.gpu_memory {
                score += (1.0 - gpu.utilisation()) * self.weights.gpu_headroom;
            }
        }

        score.max(0.0)
    }
}
