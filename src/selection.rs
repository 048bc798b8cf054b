//! Origin/destination selection for route sampling.

use crate::error::{CentralityError, Result};
use crate::graph::NodeKey;
use crate::population::NodePopulation;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

/// One origin/destination draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampledPair {
    pub origin: NodeKey,
    pub destination: NodeKey,
}

impl SampledPair {
    pub fn new(origin: NodeKey, destination: NodeKey) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

/// Independently drawn origins and destinations; index `i` of each forms pair `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledPairs {
    pub origins: Vec<NodeKey>,
    pub destinations: Vec<NodeKey>,
    /// Population weights summed to zero and selection fell back to uniform.
    pub degraded_to_uniform: bool,
}

impl SampledPairs {
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn pairs(&self) -> Vec<SampledPair> {
        self.origins
            .iter()
            .zip(&self.destinations)
            .map(|(&origin, &destination)| SampledPair::new(origin, destination))
            .collect()
    }
}

/// Draws `count` origins and `count` destinations with replacement, with probability
/// proportional to population. Falls back to uniform selection when all weights are zero.
pub fn select_weighted_pairs<R: Rng>(
    population: &NodePopulation,
    count: usize,
    rng: &mut R,
) -> Result<SampledPairs> {
    let nodes = population.keys();
    if count > 0 && nodes.is_empty() {
        return Err(CentralityError::InvalidInput(
            "Cannot select nodes from an empty network.".to_string(),
        ));
    }
    let weights = population.values();
    if let Some((node, weight)) = population.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
        return Err(CentralityError::InvalidInput(format!(
            "Population weight {} of node {} must be finite and non-negative.",
            weight, node
        )));
    }

    if weights.iter().sum::<f64>() == 0.0 {
        log::warn!("The sum of population weights is 0. Cannot select nodes. Using random selection.");
        let mut pairs = select_uniform_pairs(&nodes, count, rng)?;
        pairs.degraded_to_uniform = true;
        return Ok(pairs);
    }

    let dist = WeightedIndex::new(&weights)
        .map_err(|e| CentralityError::InvalidInput(format!("Invalid population weights: {}", e)))?;
    let origins = (0..count).map(|_| nodes[dist.sample(&mut *rng)]).collect();
    let destinations = (0..count).map(|_| nodes[dist.sample(&mut *rng)]).collect();
    Ok(SampledPairs {
        origins,
        destinations,
        degraded_to_uniform: false,
    })
}

/// Draws `count` origins and `count` destinations uniformly with replacement.
pub fn select_uniform_pairs<R: Rng>(
    nodes: &[NodeKey],
    count: usize,
    rng: &mut R,
) -> Result<SampledPairs> {
    if count > 0 && nodes.is_empty() {
        return Err(CentralityError::InvalidInput(
            "Cannot select nodes from an empty network.".to_string(),
        ));
    }
    let origins = (0..count)
        .map(|_| nodes[rng.random_range(0..nodes.len())])
        .collect();
    let destinations = (0..count)
        .map(|_| nodes[rng.random_range(0..nodes.len())])
        .collect();
    Ok(SampledPairs {
        origins,
        destinations,
        degraded_to_uniform: false,
    })
}
