//! Market graph builder.
//!
//! One graph per scan cycle. Nodes are teams, stored as dense indices;
//! edges live in a flat `Vec` so the Laplacian solve can sweep them
//! without chasing pointers.
//!
//! An edge `tail → head` with flow `Y` says "head is expected to beat
//! tail by `Y` points", i.e. `s_head − s_tail ≈ Y`. Edges are stored
//! once per unordered pair in canonical orientation (`tail < head`);
//! observing the reverse direction stores `−Y`.

use std::collections::HashMap;

use super::error::{PricingError, PricingResult};
use super::gaussian::FairValueEstimate;

/// A directed, weighted edge between two node indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub tail: usize,
    pub head: usize,
    /// Signed expected margin of `head` over `tail`.
    pub flow: f64,
    /// Confidence weight (≥ 0).
    pub weight: f64,
}

/// Running sums for pooling repeated observations of one pair.
#[derive(Debug, Clone, Copy, Default)]
struct Pool {
    weight_sum: f64,
    weighted_flow_sum: f64,
    flow_sum: f64,
    count: u32,
}

impl Pool {
    fn add(&mut self, flow: f64, weight: f64) {
        self.weight_sum += weight;
        self.weighted_flow_sum += weight * flow;
        self.flow_sum += flow;
        self.count += 1;
    }

    /// Inverse-variance pooled flow; plain mean when every weight is zero.
    fn flow(&self) -> f64 {
        if self.weight_sum > 0.0 {
            self.weighted_flow_sum / self.weight_sum
        } else {
            self.flow_sum / f64::from(self.count)
        }
    }
}

/// Arena-backed graph of paired spread observations.
#[derive(Debug, Clone, Default)]
pub struct MarketGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    pools: Vec<Pool>,
    pair_index: HashMap<(usize, usize), usize>,
}

impl MarketGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from this cycle's fair values.
    ///
    /// Each estimate contributes `underdog → favorite` with flow μ and
    /// weight 1/σ². Estimates that cannot form an edge are returned
    /// alongside the graph rather than aborting the build.
    pub fn from_fair_values(estimates: &[FairValueEstimate]) -> (Self, Vec<PricingError>) {
        let mut graph = Self::new();
        let mut rejected = Vec::new();

        for fv in estimates {
            if let Err(e) = graph.add_observation(&fv.underdog, &fv.favorite, fv.mu, fv.confidence) {
                rejected.push(e);
            }
        }

        (graph, rejected)
    }

    /// Insert (or pool into) the edge `from → to`.
    ///
    /// # Errors
    /// `Data` for self-loops, non-finite flow, or a negative / non-finite weight.
    pub fn add_observation(
        &mut self,
        from: &str,
        to: &str,
        flow: f64,
        weight: f64,
    ) -> PricingResult<()> {
        let label = format!("{from}->{to}");
        if from == to {
            return Err(PricingError::data(label, "self-loop edge"));
        }
        if !flow.is_finite() {
            return Err(PricingError::data(label, format!("non-finite flow {flow}")));
        }
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(PricingError::data(label, format!("invalid weight {weight}")));
        }

        let i = self.intern(from);
        let j = self.intern(to);
        let (tail, head, oriented) = if i < j { (i, j, flow) } else { (j, i, -flow) };

        let slot = match self.pair_index.get(&(tail, head)) {
            Some(&slot) => slot,
            None => {
                let slot = self.edges.len();
                self.edges.push(Edge {
                    tail,
                    head,
                    flow: 0.0,
                    weight: 0.0,
                });
                self.pools.push(Pool::default());
                self.pair_index.insert((tail, head), slot);
                slot
            }
        };

        let pool = &mut self.pools[slot];
        pool.add(oriented, weight);
        self.edges[slot].flow = pool.flow();
        self.edges[slot].weight = pool.weight_sum;
        Ok(())
    }

    fn intern(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        i
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn node_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of observations pooled into each edge.
    pub fn observation_count(&self, edge: usize) -> u32 {
        self.pools.get(edge).map_or(0, |p| p.count)
    }
}
