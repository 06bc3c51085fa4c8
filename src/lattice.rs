// lattice.rs - 2D XY model engine and the revalidated view over its angle buffer

use num_complex::Complex64;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};

const TAU: f64 = 2.0 * PI;

/// Width of the Gaussian proposal window used by the Glauber update.
const GLAUBER_SIGMA: f64 = 0.5;

/// Rejection-sampling attempt cap for the heat-bath conditional draw.
/// κ = |local field| / T stays below ~100 for the supported parameter
/// ranges, so the cap is never reached in practice.
const HEAT_BATH_MAX_TRIES: usize = 1000;

// Each lattice allocation gets a fresh identity so a view built against a
// replaced handle is detected even when the length matches.
static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Square-lattice XY model with periodic boundaries.
///
/// Angles are radians in [0, 2π), stored row-major with length n².
/// Energy and magnetization are cached per-site quantities, maintained
/// incrementally by the local updates and recomputed wholesale by the
/// cluster updates.
#[derive(Debug, Clone)]
pub struct XyModel {
    n: usize,
    spins: Vec<f64>,
    temp: f64,
    coupling: f64,
    field: f64,
    accepted: u64,
    attempted: u64,
    energy: f64,
    m_vec: Complex64,
    rng: SmallRng,
    buffer_id: u64,
}

/// Per-site energy of a configuration: E = (−J Σ_<ij> cos(θ_i−θ_j) − h Σ_i cos θ_i) / n².
/// Each bond is counted once via the right and down neighbors.
fn site_energy(spins: &[f64], n: usize, coupling: f64, field: f64) -> f64 {
    let mut bond_sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            let s = spins[i * n + j];
            let right = spins[i * n + (j + 1) % n];
            let down = spins[((i + 1) % n) * n + j];
            bond_sum += (s - right).cos() + (s - down).cos();
        }
    }
    let field_sum: f64 = spins.iter().map(|&theta| theta.cos()).sum();
    (-coupling * bond_sum - field * field_sum) / (n * n) as f64
}

/// Per-site magnetization vector: Σ e^{iθ} / n².
fn site_magnetization(spins: &[f64], n: usize) -> Complex64 {
    let sum: Complex64 = spins
        .iter()
        .map(|&theta| Complex64::from_polar(1.0, theta))
        .sum();
    sum / (n * n) as f64
}

/// The four neighbor angles of site (i, j): up, down, left, right.
fn neighbor_angles(spins: &[f64], i: usize, j: usize, n: usize) -> [f64; 4] {
    [
        spins[((i + n - 1) % n) * n + j],
        spins[((i + 1) % n) * n + j],
        spins[i * n + (j + n - 1) % n],
        spins[i * n + (j + 1) % n],
    ]
}

impl XyModel {
    /// Build a lattice with uniformly random angles, using a caller-supplied
    /// RNG stream for the initial configuration and all subsequent updates.
    pub fn with_rng(mut rng: SmallRng, n: usize, temp: f64, coupling: f64, field: f64) -> Self {
        assert!(n >= 2, "lattice side must be at least 2");
        let spins: Vec<f64> = (0..n * n).map(|_| rng.gen_range(0.0..TAU)).collect();
        let energy = site_energy(&spins, n, coupling, field);
        let m_vec = site_magnetization(&spins, n);
        Self {
            n,
            spins,
            temp,
            coupling,
            field,
            accepted: 0,
            attempted: 0,
            energy,
            m_vec,
            rng,
            buffer_id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Convenience constructor seeded from OS entropy.
    pub fn new(n: usize, temp: f64, coupling: f64, field: f64) -> Self {
        Self::with_rng(SmallRng::from_entropy(), n, temp, coupling, field)
    }

    /// Lattice side length.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.n
    }

    /// Number of sites (n²), the length of the angle buffer.
    #[inline(always)]
    pub fn site_count(&self) -> usize {
        self.n * self.n
    }

    /// Storage identity of the angle buffer. Changes whenever the lattice
    /// is rebuilt, never during updates.
    #[inline(always)]
    pub fn buffer_id(&self) -> u64 {
        self.buffer_id
    }

    pub fn temp(&self) -> f64 {
        self.temp
    }

    pub fn coupling(&self) -> f64 {
        self.coupling
    }

    pub fn field(&self) -> f64 {
        self.field
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn attempted(&self) -> u64 {
        self.attempted
    }

    /// accepted / attempted, or 0 before anything was attempted.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempted as f64
        }
    }

    /// Cached per-site energy.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Cached per-site magnetization magnitude |Σ e^{iθ}| / n².
    pub fn magnetization(&self) -> f64 {
        self.m_vec.norm()
    }

    /// Per-site magnetization vector (x + iy components).
    pub fn magnetization_vector(&self) -> Complex64 {
        self.m_vec
    }

    pub fn set_temp(&mut self, temp: f64) {
        self.temp = temp;
    }

    /// Update J and refresh the cached energy, which depends on it.
    pub fn set_coupling(&mut self, coupling: f64) {
        self.coupling = coupling;
        self.energy = site_energy(&self.spins, self.n, self.coupling, self.field);
    }

    /// Update h and refresh the cached energy, which depends on it.
    pub fn set_field(&mut self, field: f64) {
        self.field = field;
        self.energy = site_energy(&self.spins, self.n, self.coupling, self.field);
    }

    /// Clear counters and recompute the scalar caches; configuration and
    /// spins are kept.
    pub fn reset_data(&mut self) {
        self.accepted = 0;
        self.attempted = 0;
        self.energy = site_energy(&self.spins, self.n, self.coupling, self.field);
        self.m_vec = site_magnetization(&self.spins, self.n);
    }

    fn recompute_scalars(&mut self) {
        self.energy = site_energy(&self.spins, self.n, self.coupling, self.field);
        self.m_vec = site_magnetization(&self.spins, self.n);
    }

    /// Energy change of replacing site (i, j)'s angle with `new_theta`.
    fn local_delta_e(&self, i: usize, j: usize, new_theta: f64) -> f64 {
        let old_theta = self.spins[i * self.n + j];
        let mut d_e = 0.0;
        for &theta_nb in &neighbor_angles(&self.spins, i, j, self.n) {
            d_e -= self.coupling * ((new_theta - theta_nb).cos() - (old_theta - theta_nb).cos());
        }
        d_e -= self.field * (new_theta.cos() - old_theta.cos());
        d_e
    }

    /// Apply an accepted single-site move, keeping the caches in sync.
    fn commit_site(&mut self, idx: usize, new_theta: f64, d_e: f64) {
        let old_theta = self.spins[idx];
        let sites = (self.n * self.n) as f64;
        self.spins[idx] = new_theta;
        self.energy += d_e / sites;
        self.m_vec += (Complex64::from_polar(1.0, new_theta)
            - Complex64::from_polar(1.0, old_theta))
            / sites;
    }

    /// One Metropolis sweep: n² random single-site proposals with a uniform
    /// new angle.
    pub fn metropolis_sweep(&mut self) {
        let n = self.n;
        self.attempted += (n * n) as u64;
        for _ in 0..n * n {
            let i = self.rng.gen_range(0..n);
            let j = self.rng.gen_range(0..n);
            let phi = self.rng.gen_range(0.0..TAU);
            let d_e = self.local_delta_e(i, j, phi);
            if d_e <= 0.0 || self.rng.gen_range(0.0..1.0) < (-d_e / self.temp).exp() {
                self.commit_site(i * n + j, phi, d_e);
                self.accepted += 1;
            }
        }
    }

    /// One reflection sweep: a single random axis per sweep, every site
    /// offered its mirror image across that axis under Metropolis
    /// acceptance. Magnetization is recomputed after the ordered pass.
    pub fn metropolis_reflection_sweep(&mut self) {
        let n = self.n;
        let axis = self.rng.gen_range(0.0..TAU);
        let (ux, uy) = (axis.cos(), axis.sin());
        self.attempted += (n * n) as u64;

        for i in 0..n {
            for j in 0..n {
                let idx = i * n + j;
                let theta = self.spins[idx];
                let (sx, sy) = (theta.cos(), theta.sin());
                let dot = sx * ux + sy * uy;
                let (rx, ry) = (sx - 2.0 * dot * ux, sy - 2.0 * dot * uy);
                let theta_ref = ry.atan2(rx).rem_euclid(TAU);

                let d_e = self.local_delta_e(i, j, theta_ref);
                if d_e <= 0.0 || self.rng.gen_range(0.0..1.0) < (-d_e / self.temp).exp() {
                    let sites = (n * n) as f64;
                    self.spins[idx] = theta_ref;
                    self.energy += d_e / sites;
                    self.accepted += 1;
                }
            }
        }
        self.m_vec = site_magnetization(&self.spins, n);
    }

    /// One over-relaxation sweep: reflect every spin about its local field.
    /// The move conserves energy exactly, so only the magnetization cache
    /// needs refreshing.
    pub fn overrelaxation_sweep(&mut self) {
        let n = self.n;
        for i in 0..n {
            for j in 0..n {
                let idx = i * n + j;
                let mut hx = self.field;
                let mut hy = 0.0;
                for &theta_nb in &neighbor_angles(&self.spins, i, j, n) {
                    hx += self.coupling * theta_nb.cos();
                    hy += self.coupling * theta_nb.sin();
                }
                let theta_local = hy.atan2(hx);
                self.spins[idx] = (2.0 * theta_local - self.spins[idx]).rem_euclid(TAU);
            }
        }
        self.attempted += (n * n) as u64;
        self.accepted += (n * n) as u64;
        self.m_vec = site_magnetization(&self.spins, n);
    }

    /// One Wolff update: grow a single reflection cluster from a random
    /// seed and flip it. Valid for h = 0 and J ≥ 0 (the caller enforces
    /// the constraint).
    pub fn wolff_step(&mut self) {
        let n = self.n;
        let axis = self.rng.gen_range(0.0..TAU);
        let prob_factor = -2.0 * self.coupling / self.temp;

        let seed = (self.rng.gen_range(0..n), self.rng.gen_range(0..n));
        // Pre-flip angles for sites already in the cluster; NaN marks
        // unvisited sites.
        let mut pre_flip = vec![f64::NAN; n * n];
        let mut frontier = vec![seed];

        let seed_idx = seed.0 * n + seed.1;
        pre_flip[seed_idx] = self.spins[seed_idx];
        self.spins[seed_idx] = reflect_angle(self.spins[seed_idx], axis);

        let mut cursor = 0;
        while cursor < frontier.len() {
            let (i, j) = frontier[cursor];
            cursor += 1;
            let theta_i = pre_flip[i * n + j];
            let cos_i = (axis - theta_i).cos();

            for (ni, nj) in [
                (i, (j + 1) % n),
                (i, (j + n - 1) % n),
                ((i + 1) % n, j),
                ((i + n - 1) % n, j),
            ] {
                let nb_idx = ni * n + nj;
                if !pre_flip[nb_idx].is_nan() {
                    continue;
                }
                let theta_j = self.spins[nb_idx];
                let cos_j = (axis - theta_j).cos();
                // Bond probability 1 − exp(min(0, −2J/T cos_i cos_j)).
                let bond = 1.0 - (prob_factor * cos_i * cos_j).min(0.0).exp();
                if self.rng.gen_range(0.0..1.0) < bond {
                    pre_flip[nb_idx] = theta_j;
                    self.spins[nb_idx] = reflect_angle(theta_j, axis);
                    frontier.push((ni, nj));
                }
            }
        }

        self.attempted += 1;
        self.accepted += 1;
        self.recompute_scalars();
    }

    /// One Swendsen-Wang update: percolate reflection bonds over the whole
    /// lattice, then flip each cluster with probability ½. Same constraint
    /// as Wolff.
    pub fn swendsen_wang_step(&mut self) {
        let n = self.n;
        let axis = self.rng.gen_range(0.0..TAU);
        let prob_factor = -2.0 * self.coupling / self.temp;

        let mut cluster_of = vec![0usize; n * n];
        let mut n_clusters = 0usize;
        let original = self.spins.clone();

        for i in 0..n {
            for j in 0..n {
                if cluster_of[i * n + j] != 0 {
                    continue;
                }
                n_clusters += 1;
                cluster_of[i * n + j] = n_clusters;
                let mut stack = vec![(i, j)];
                while let Some((ci, cj)) = stack.pop() {
                    let cos_i = (axis - original[ci * n + cj]).cos();
                    for (ni, nj) in [
                        (ci, (cj + 1) % n),
                        (ci, (cj + n - 1) % n),
                        ((ci + 1) % n, cj),
                        ((ci + n - 1) % n, cj),
                    ] {
                        let nb_idx = ni * n + nj;
                        if cluster_of[nb_idx] != 0 {
                            continue;
                        }
                        let cos_j = (axis - original[nb_idx]).cos();
                        let bond = 1.0 - (prob_factor * cos_i * cos_j).min(0.0).exp();
                        if self.rng.gen_range(0.0..1.0) < bond {
                            cluster_of[nb_idx] = n_clusters;
                            stack.push((ni, nj));
                        }
                    }
                }
            }
        }

        let flip: Vec<bool> = (0..=n_clusters).map(|_| self.rng.gen_bool(0.5)).collect();
        for idx in 0..n * n {
            if flip[cluster_of[idx]] {
                self.spins[idx] = reflect_angle(original[idx], axis);
            }
        }

        self.attempted += 1;
        self.accepted += 1;
        self.recompute_scalars();
    }

    /// One heat-bath sweep: every site redrawn from its local conditional
    /// Boltzmann distribution p(θ) ∝ exp(κ cos(θ − μ)) with μ the local
    /// field direction and κ = |local field| / T, via bounded rejection
    /// sampling.
    pub fn heat_bath_sweep(&mut self) {
        let n = self.n;
        self.attempted += (n * n) as u64;
        for i in 0..n {
            for j in 0..n {
                let mut hx = self.field;
                let mut hy = 0.0;
                for &theta_nb in &neighbor_angles(&self.spins, i, j, n) {
                    hx += self.coupling * theta_nb.cos();
                    hy += self.coupling * theta_nb.sin();
                }
                let kappa = (hx * hx + hy * hy).sqrt() / self.temp;
                let mu = hy.atan2(hx);

                let mut drawn = None;
                for _ in 0..HEAT_BATH_MAX_TRIES {
                    let candidate = self.rng.gen_range(0.0..TAU);
                    // Envelope exp(κ(cos(θ−μ) − 1)) ≤ 1.
                    if self.rng.gen_range(0.0..1.0) < (kappa * ((candidate - mu).cos() - 1.0)).exp()
                    {
                        drawn = Some(candidate);
                        break;
                    }
                }
                if let Some(new_theta) = drawn {
                    let d_e = self.local_delta_e(i, j, new_theta);
                    self.commit_site(i * n + j, new_theta, d_e);
                    self.accepted += 1;
                }
            }
        }
    }

    /// One Glauber sweep: n² random-site proposals from a Gaussian window
    /// around the current angle, accepted with rate 1 / (1 + e^{ΔE/T}).
    pub fn glauber_sweep(&mut self) {
        let n = self.n;
        let window = Normal::new(0.0, GLAUBER_SIGMA).expect("finite sigma");
        self.attempted += (n * n) as u64;
        for _ in 0..n * n {
            let i = self.rng.gen_range(0..n);
            let j = self.rng.gen_range(0..n);
            let idx = i * n + j;
            let phi = (self.spins[idx] + window.sample(&mut self.rng)).rem_euclid(TAU);
            let d_e = self.local_delta_e(i, j, phi);
            let rate = 1.0 / (1.0 + (d_e / self.temp).exp());
            if self.rng.gen_range(0.0..1.0) < rate {
                self.commit_site(idx, phi, d_e);
                self.accepted += 1;
            }
        }
    }

    /// One Kawasaki sweep: n² random neighboring-pair angle exchanges with
    /// Metropolis acceptance. Conserves the total magnetization vector
    /// exactly, so only the energy cache moves.
    pub fn kawasaki_sweep(&mut self) {
        let n = self.n;
        let sites = (n * n) as f64;
        self.attempted += (n * n) as u64;
        for _ in 0..n * n {
            let i = self.rng.gen_range(0..n);
            let j = self.rng.gen_range(0..n);
            let (pi, pj) = match self.rng.gen_range(0..4) {
                0 => ((i + n - 1) % n, j),
                1 => ((i + 1) % n, j),
                2 => (i, (j + n - 1) % n),
                _ => (i, (j + 1) % n),
            };
            let a = i * n + j;
            let b = pi * n + pj;
            let (theta_a, theta_b) = (self.spins[a], self.spins[b]);
            if theta_a == theta_b {
                continue;
            }

            // ΔE of the exchange, evaluated by trial replacement so the
            // shared bond cancels correctly.
            let d_e = {
                let d1 = self.local_delta_e(i, j, theta_b);
                self.spins[a] = theta_b;
                let d2 = self.local_delta_e(pi, pj, theta_a);
                self.spins[a] = theta_a;
                d1 + d2
            };

            if d_e <= 0.0 || self.rng.gen_range(0.0..1.0) < (-d_e / self.temp).exp() {
                self.spins.swap(a, b);
                self.energy += d_e / sites;
                self.accepted += 1;
            }
        }
    }

    /// Recompute the per-site energy from scratch (test support; the cached
    /// value tracks this within float drift).
    pub fn recomputed_energy(&self) -> f64 {
        site_energy(&self.spins, self.n, self.coupling, self.field)
    }

    /// Recompute the per-site magnetization magnitude from scratch.
    pub fn recomputed_magnetization(&self) -> f64 {
        site_magnetization(&self.spins, self.n).norm()
    }

    // Angle-buffer access is private: readers go through `SpinView::refresh`
    // so every read revalidates the lease first.
    fn angles(&self) -> &[f64] {
        &self.spins
    }
}

/// Reflect `theta` across the axis direction `axis`.
#[inline]
fn reflect_angle(theta: f64, axis: f64) -> f64 {
    (PI - theta + 2.0 * axis).rem_euclid(TAU)
}

/// Revalidated accessor over a lattice's angle buffer.
///
/// The view caches the (buffer identity, length) pair it was last built
/// against. `refresh` compares against the model at hand, rebuilds the
/// descriptor when either differs, and hands back the freshly borrowed
/// slice. Because the slice borrows the model at the call site, holding it
/// across a lattice replacement is rejected at compile time; the identity
/// check exists so consumers can observe (and tests can assert) when the
/// underlying storage was swapped out.
#[derive(Debug, Clone, Default)]
pub struct SpinView {
    buffer_id: u64,
    len: usize,
    rebuilds: u64,
}

impl SpinView {
    /// A view not yet bound to any lattice; the first `refresh` rebuilds it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Revalidate against `model` and return its angle buffer. This is the
    /// single read path for per-site angles.
    pub fn refresh<'a>(&mut self, model: &'a XyModel) -> &'a [f64] {
        if self.buffer_id != model.buffer_id() || self.len != model.site_count() {
            self.buffer_id = model.buffer_id();
            self.len = model.site_count();
            self.rebuilds += 1;
        }
        model.angles()
    }

    /// Whether the view currently matches `model`'s buffer identity.
    pub fn is_current(&self, model: &XyModel) -> bool {
        self.buffer_id == model.buffer_id() && self.len == model.site_count()
    }

    /// Length the view was last validated against.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// How many times the descriptor had to be rebuilt.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}
