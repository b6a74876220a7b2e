//! Discrete Hodge decomposition of the market graph.
//!
//! Splits edge flow `Y` into a gradient part (explained by one rating
//! per team) and a curl residual (cyclic inconsistency):
//!
//!   s* = argmin Σ w_ij (Y_ij − (s_j − s_i))²      ⇔   L·s = b
//!   curl_ij = Y_ij − (s_j − s_i)
//!
//! L is the weighted graph Laplacian, singular along constant shifts of
//! each connected component, so one node per component is pinned to 0
//! before solving. At the optimum the residual is w-orthogonal to every
//! gradient, hence ‖Y‖²_w = ‖grad‖²_w + ‖curl‖²_w.
//!
//! Small systems use a dense Cholesky factorization; larger ones use
//! Jacobi-preconditioned conjugate gradient directly over the edge list.

use super::error::{PricingError, PricingResult};
use super::graph::MarketGraph;

/// Relative pivot floor for the Cholesky factorization.
const PIVOT_EPS: f64 = 1e-13;

/// Solver tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Largest reduced system solved directly.
    pub direct_max_nodes: usize,
    /// CG iteration cap.
    pub max_iterations: usize,
    /// CG relative residual tolerance.
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            direct_max_nodes: 64,
            max_iterations: 1_000,
            tolerance: 1e-10,
        }
    }
}

/// Which path produced the potentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    Cholesky,
    ConjugateGradient,
}

/// Output of one decomposition.
#[derive(Debug, Clone)]
pub struct HodgeResult {
    /// One potential (rating) per node; pinned nodes are 0.
    pub potentials: Vec<f64>,
    /// Per-edge `s_head − s_tail`, aligned with `MarketGraph::edges`.
    pub gradient: Vec<f64>,
    /// Per-edge residual `flow − gradient`.
    pub curl: Vec<f64>,
    /// ‖Y‖²_w
    pub flow_norm_sq: f64,
    /// ‖grad‖²_w
    pub gradient_norm_sq: f64,
    /// ‖curl‖²_w
    pub curl_norm_sq: f64,
    /// Reference nodes, one per connected component.
    pub pinned: Vec<usize>,
    pub method: SolveMethod,
    /// CG iterations (0 for Cholesky).
    pub iterations: usize,
}

impl HodgeResult {
    /// Weighted L2 norm of the curl residual; the volatility signal.
    pub fn curl_norm(&self) -> f64 {
        self.curl_norm_sq.sqrt()
    }

    /// |‖Y‖² − ‖grad‖² − ‖curl‖²|, zero up to rounding at the optimum.
    pub fn pythagorean_gap(&self) -> f64 {
        (self.flow_norm_sq - self.gradient_norm_sq - self.curl_norm_sq).abs()
    }

    /// Share of flow energy that is cyclic, in [0, 1].
    pub fn curl_ratio(&self) -> f64 {
        if self.flow_norm_sq > 0.0 {
            (self.curl_norm_sq / self.flow_norm_sq).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Weighted least-squares Hodge solver.
#[derive(Debug, Clone, Default)]
pub struct HodgeSolver {
    config: SolverConfig,
}

impl HodgeSolver {
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Decompose the graph's flow.
    ///
    /// # Errors
    /// `LinearSystem` for an empty graph, fewer than two nodes joined by
    /// a positive-weight edge, a non-positive pivot, or CG failing to
    /// converge within `max_iterations`.
    pub fn decompose(&self, graph: &MarketGraph) -> PricingResult<HodgeResult> {
        let n = graph.node_count();
        if graph.is_empty() {
            return Err(PricingError::LinearSystem("empty graph".into()));
        }

        // Components over positive-weight edges.
        let mut components = UnionFind::new(n);
        let mut connected = vec![false; n];
        for e in graph.edges().iter().filter(|e| e.weight > 0.0) {
            components.union(e.tail, e.head);
            connected[e.tail] = true;
            connected[e.head] = true;
        }
        if connected.iter().filter(|&&c| c).count() < 2 {
            return Err(PricingError::LinearSystem(
                "fewer than two connected nodes".into(),
            ));
        }

        // Pin the lowest index of each component; isolated nodes are
        // their own component and so are pinned too.
        let mut pinned_root = vec![usize::MAX; n];
        let mut is_pinned = vec![false; n];
        let mut pinned = Vec::new();
        for v in 0..n {
            let root = components.find(v);
            if pinned_root[root] == usize::MAX {
                pinned_root[root] = v;
                is_pinned[v] = true;
                pinned.push(v);
            }
        }

        // Dense index for the unpinned unknowns.
        let mut reduced = vec![usize::MAX; n];
        let mut m = 0;
        for v in 0..n {
            if !is_pinned[v] {
                reduced[v] = m;
                m += 1;
            }
        }

        let mut rhs = vec![0.0; m];
        for e in graph.edges() {
            let wy = e.weight * e.flow;
            if reduced[e.head] != usize::MAX {
                rhs[reduced[e.head]] += wy;
            }
            if reduced[e.tail] != usize::MAX {
                rhs[reduced[e.tail]] -= wy;
            }
        }

        let (solution, method, iterations) = if m <= self.config.direct_max_nodes {
            (cholesky_solve(graph, &reduced, m, &rhs)?, SolveMethod::Cholesky, 0)
        } else {
            let (x, iters) = self.conjugate_gradient(graph, &reduced, m, &rhs)?;
            (x, SolveMethod::ConjugateGradient, iters)
        };

        let mut potentials = vec![0.0; n];
        for v in 0..n {
            if reduced[v] != usize::MAX {
                potentials[v] = solution[reduced[v]];
            }
        }

        let edge_count = graph.edge_count();
        let mut gradient = Vec::with_capacity(edge_count);
        let mut curl = Vec::with_capacity(edge_count);
        let (mut flow_sq, mut grad_sq, mut curl_sq) = (0.0, 0.0, 0.0);
        for e in graph.edges() {
            let g = potentials[e.head] - potentials[e.tail];
            let c = e.flow - g;
            flow_sq += e.weight * e.flow * e.flow;
            grad_sq += e.weight * g * g;
            curl_sq += e.weight * c * c;
            gradient.push(g);
            curl.push(c);
        }

        Ok(HodgeResult {
            potentials,
            gradient,
            curl,
            flow_norm_sq: flow_sq,
            gradient_norm_sq: grad_sq,
            curl_norm_sq: curl_sq,
            pinned,
            method,
            iterations,
        })
    }

    /// Jacobi-preconditioned CG on the reduced Laplacian.
    fn conjugate_gradient(
        &self,
        graph: &MarketGraph,
        reduced: &[usize],
        m: usize,
        rhs: &[f64],
    ) -> PricingResult<(Vec<f64>, usize)> {
        let mut diag = vec![0.0; m];
        for e in graph.edges() {
            if reduced[e.tail] != usize::MAX {
                diag[reduced[e.tail]] += e.weight;
            }
            if reduced[e.head] != usize::MAX {
                diag[reduced[e.head]] += e.weight;
            }
        }
        if diag.iter().any(|&d| d <= 0.0) {
            return Err(PricingError::LinearSystem(
                "unpinned node without positive-weight edges".into(),
            ));
        }

        let b_norm = norm(rhs);
        let mut x = vec![0.0; m];
        if b_norm == 0.0 {
            return Ok((x, 0));
        }

        let mut r = rhs.to_vec();
        let mut z: Vec<f64> = r.iter().zip(&diag).map(|(ri, di)| ri / di).collect();
        let mut p = z.clone();
        let mut rz = dot(&r, &z);
        let mut ap = vec![0.0; m];

        for iter in 1..=self.config.max_iterations {
            laplacian_apply(graph, reduced, &p, &mut ap);
            let pap = dot(&p, &ap);
            if !(pap.is_finite() && pap > 0.0) {
                return Err(PricingError::LinearSystem(format!(
                    "conjugate gradient breakdown at iteration {iter}"
                )));
            }
            let alpha = rz / pap;
            for k in 0..m {
                x[k] += alpha * p[k];
                r[k] -= alpha * ap[k];
            }

            if norm(&r) <= self.config.tolerance * b_norm {
                return Ok((x, iter));
            }

            for k in 0..m {
                z[k] = r[k] / diag[k];
            }
            let rz_next = dot(&r, &z);
            let beta = rz_next / rz;
            rz = rz_next;
            for k in 0..m {
                p[k] = z[k] + beta * p[k];
            }
        }

        Err(PricingError::LinearSystem(format!(
            "conjugate gradient did not converge in {} iterations",
            self.config.max_iterations
        )))
    }
}

/// `out = L_reduced · v`, sweeping the edge list once.
fn laplacian_apply(graph: &MarketGraph, reduced: &[usize], v: &[f64], out: &mut [f64]) {
    out.iter_mut().for_each(|o| *o = 0.0);
    for e in graph.edges() {
        let (ti, hi) = (reduced[e.tail], reduced[e.head]);
        let vt = if ti == usize::MAX { 0.0 } else { v[ti] };
        let vh = if hi == usize::MAX { 0.0 } else { v[hi] };
        let d = e.weight * (vh - vt);
        if hi != usize::MAX {
            out[hi] += d;
        }
        if ti != usize::MAX {
            out[ti] -= d;
        }
    }
}

/// Assemble the reduced Laplacian densely and solve by Cholesky.
fn cholesky_solve(
    graph: &MarketGraph,
    reduced: &[usize],
    m: usize,
    rhs: &[f64],
) -> PricingResult<Vec<f64>> {
    let mut a = vec![0.0; m * m];
    for e in graph.edges() {
        let (ti, hi) = (reduced[e.tail], reduced[e.head]);
        if ti != usize::MAX {
            a[ti * m + ti] += e.weight;
        }
        if hi != usize::MAX {
            a[hi * m + hi] += e.weight;
        }
        if ti != usize::MAX && hi != usize::MAX {
            a[ti * m + hi] -= e.weight;
            a[hi * m + ti] -= e.weight;
        }
    }

    let scale = (0..m).map(|i| a[i * m + i]).fold(0.0_f64, f64::max);

    // In-place lower-triangular factor.
    for j in 0..m {
        let mut d = a[j * m + j];
        for k in 0..j {
            d -= a[j * m + k] * a[j * m + k];
        }
        if !(d.is_finite() && d > PIVOT_EPS * scale) {
            return Err(PricingError::LinearSystem(format!(
                "Laplacian not positive definite at pivot {j}"
            )));
        }
        let d = d.sqrt();
        a[j * m + j] = d;
        for i in (j + 1)..m {
            let mut s = a[i * m + j];
            for k in 0..j {
                s -= a[i * m + k] * a[j * m + k];
            }
            a[i * m + j] = s / d;
        }
    }

    // Forward then back substitution.
    let mut y = rhs.to_vec();
    for i in 0..m {
        for k in 0..i {
            y[i] -= a[i * m + k] * y[k];
        }
        y[i] /= a[i * m + i];
    }
    for i in (0..m).rev() {
        for k in (i + 1)..m {
            y[i] -= a[k * m + i] * y[k];
        }
        y[i] /= a[i * m + i];
    }
    Ok(y)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Path-compressed union-find for component detection.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, v: usize) -> usize {
        let mut root = v;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = v;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index wins so roots are stable across runs.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn consistent_graph() -> MarketGraph {
        // Ratings A=0, B=3, C=7, D=4.
        let ratings = [("A", 0.0), ("B", 3.0), ("C", 7.0), ("D", 4.0)];
        let mut g = MarketGraph::new();
        for (i, (a, sa)) in ratings.iter().enumerate() {
            for (b, sb) in ratings.iter().skip(i + 1) {
                g.add_observation(a, b, sb - sa, 1.0 + (sa + sb) / 10.0).unwrap();
            }
        }
        g
    }

    #[test]
    fn test_consistent_ratings_have_zero_curl() {
        let result = HodgeSolver::default().decompose(&consistent_graph()).unwrap();
        assert!(result.curl_norm() < TOL, "curl {}", result.curl_norm());
        assert_eq!(result.method, SolveMethod::Cholesky);
        // A is pinned, so potentials equal the synthetic ratings.
        assert_eq!(result.pinned, vec![0]);
        assert!((result.potentials[2] - 7.0).abs() < TOL);
    }

    #[test]
    fn test_three_cycle_has_positive_curl() {
        let mut g = MarketGraph::new();
        g.add_observation("A", "B", -3.0, 1.0).unwrap(); // A beats B
        g.add_observation("B", "C", -3.0, 1.0).unwrap(); // B beats C
        g.add_observation("C", "A", -3.0, 1.0).unwrap(); // C beats A
        let result = HodgeSolver::default().decompose(&g).unwrap();
        assert!(result.curl_norm() > 1.0);
        // A pure cycle has no gradient component at all.
        assert!(result.gradient_norm_sq < TOL);
        assert!(result.pythagorean_gap() < TOL);
        assert!((result.curl_ratio() - 1.0).abs() < TOL);
    }

    #[test]
    fn test_pythagorean_identity_weighted() {
        let mut g = consistent_graph();
        g.add_observation("B", "D", 5.0, 0.7).unwrap();
        g.add_observation("C", "A", 2.0, 2.5).unwrap();
        let r = HodgeSolver::default().decompose(&g).unwrap();
        assert!(r.curl_norm_sq > 0.0);
        assert!(r.pythagorean_gap() < 1e-9 * r.flow_norm_sq.max(1.0));
    }

    #[test]
    fn test_disconnected_components_each_pinned() {
        let mut g = MarketGraph::new();
        g.add_observation("A", "B", 2.0, 1.0).unwrap();
        g.add_observation("B", "C", 1.0, 1.0).unwrap();
        g.add_observation("C", "A", 1.0, 1.0).unwrap();
        g.add_observation("X", "Y", 6.0, 2.0).unwrap();
        let r = HodgeSolver::default().decompose(&g).unwrap();
        assert_eq!(r.pinned.len(), 2);
        let x = g.node_index("X").unwrap();
        let y = g.node_index("Y").unwrap();
        assert!((r.potentials[y] - r.potentials[x] - 6.0).abs() < TOL);
        assert!(r.pythagorean_gap() < TOL);
    }

    #[test]
    fn test_conjugate_gradient_matches_cholesky() {
        let mut g = MarketGraph::new();
        // Ring of 40 teams with chords and a little noise.
        for i in 0..40_u32 {
            let a = format!("T{i}");
            let b = format!("T{}", (i + 1) % 40);
            let c = format!("T{}", (i + 7) % 40);
            g.add_observation(&a, &b, 1.0 + f64::from(i % 3), 1.0 + f64::from(i % 5)).unwrap();
            g.add_observation(&a, &c, 2.0 - f64::from(i % 4), 0.5).unwrap();
        }
        let direct = HodgeSolver::default().decompose(&g).unwrap();
        let iterative = HodgeSolver::new(SolverConfig {
            direct_max_nodes: 0,
            ..SolverConfig::default()
        })
        .decompose(&g)
        .unwrap();

        assert_eq!(iterative.method, SolveMethod::ConjugateGradient);
        assert!(iterative.iterations > 0);
        for (d, i) in direct.potentials.iter().zip(&iterative.potentials) {
            assert!((d - i).abs() < 1e-6, "direct {d} vs cg {i}");
        }
        assert!((direct.curl_norm() - iterative.curl_norm()).abs() < 1e-6);
    }

    #[test]
    fn test_cg_iteration_cap_is_linear_system_error() {
        let mut g = MarketGraph::new();
        for i in 0..20_u32 {
            g.add_observation(&format!("N{i}"), &format!("N{}", i + 1), 1.0 + f64::from(i), 1.0)
                .unwrap();
        }
        let solver = HodgeSolver::new(SolverConfig {
            direct_max_nodes: 0,
            max_iterations: 1,
            tolerance: 1e-14,
        });
        assert_eq!(solver.decompose(&g).unwrap_err().kind(), "linear_system");
    }

    #[test]
    fn test_empty_and_degenerate_graphs_fail() {
        let solver = HodgeSolver::default();
        assert!(solver.decompose(&MarketGraph::new()).is_err());

        let mut zero_weight = MarketGraph::new();
        zero_weight.add_observation("A", "B", 1.0, 0.0).unwrap();
        let err = solver.decompose(&zero_weight).unwrap_err();
        assert_eq!(err.kind(), "linear_system");
    }

    #[test]
    fn test_zero_weight_edge_does_not_break_solve() {
        let mut g = MarketGraph::new();
        g.add_observation("A", "B", 3.0, 1.0).unwrap();
        g.add_observation("B", "C", 9.0, 0.0).unwrap();
        let r = HodgeSolver::default().decompose(&g).unwrap();
        // C is isolated by weight, pinned at 0; its residual carries no weight.
        assert_eq!(r.pinned.len(), 2);
        assert!(r.curl_norm() < TOL);
    }
}
