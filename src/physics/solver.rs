//! Sequential impulse timestep driver.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::hash::Hash;

use tracing::{debug, warn};

use glam::Vec3;

use super::contact::ContactDescriptor;
use crate::error::SolverError;

use super::contact_set::ContactSet;
use super::rigid_body::BodyArena;
use super::tangent::DEFAULT_TANGENT_EPSILON;
use super::Result;

/// Baumgarte stabilization parameter.
pub const BAUMGARTE_BETA: f32 = 0.2;
/// Penetration slop (allowed penetration before position correction).
pub const PENETRATION_SLOP: f32 = 0.005;

/// How the friction coefficients of two bodies combine into one per contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrictionCombine {
    /// The slipperier material wins.
    #[default]
    Min,
    Max,
    Average,
    Multiply,
    GeometricMean,
}

impl FrictionCombine {
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            FrictionCombine::Min => a.min(b),
            FrictionCombine::Max => a.max(b),
            FrictionCombine::Average => (a + b) * 0.5,
            FrictionCombine::Multiply => a * b,
            FrictionCombine::GeometricMean => (a * b).max(0.0).sqrt(),
        }
    }
}

/// Configuration for the contact solver.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Number of relaxation sweeps per timestep. Default: 8.
    pub iterations: u32,
    /// Friction combination rule. Default: `Min`.
    pub friction_combine: FrictionCombine,
    /// Squared sliding speed below which tangent frames fall back to an arbitrary basis.
    pub tangent_epsilon: f32,
    /// Position correction factor for penetrating contacts. Zero disables it. Default: 0.2.
    pub baumgarte: f32,
    /// Penetration depth tolerated without correction. Default: 0.005.
    pub penetration_slop: f32,
    /// Stop sweeping a set once no multiplier moves by more than this. Default: off.
    pub convergence_tolerance: Option<f32>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 8,
            friction_combine: FrictionCombine::Min,
            tangent_epsilon: DEFAULT_TANGENT_EPSILON,
            baumgarte: BAUMGARTE_BETA,
            penetration_slop: PENETRATION_SLOP,
            convergence_tolerance: None,
        }
    }
}

/// Outcome of one set within a timestep.
#[derive(Debug, Clone)]
pub struct SetReport {
    /// Sweeps actually run.
    pub sweeps: u32,
    /// Largest multiplier change during the last sweep.
    pub last_delta: f32,
    /// Final multipliers, in contact order. Feed to `ContactSet::warm_start` next frame.
    pub lambdas: Vec<Vec3>,
}

/// Holds independent contact sets and drives them through a timestep.
///
/// Sets must not share bodies. Each is relaxed on its own and then applied
/// in insertion order.
#[derive(Debug, Clone)]
pub struct ContactSolver<H> {
    config: SolverConfig,
    sets: Vec<ContactSet<H>>,
}

impl<H> ContactSolver<H>
where
    H: Copy + Eq + Hash + std::fmt::Debug + Send + Sync,
{
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            sets: Vec::new(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn push(&mut self, set: ContactSet<H>) {
        self.sets.push(set);
    }

    /// Build a set with this solver's configuration and queue it.
    pub fn add_set<A>(
        &mut self,
        arena: &A,
        handles: Vec<H>,
        contacts: &[ContactDescriptor],
    ) -> Result<usize>
    where
        A: BodyArena<Handle = H>,
    {
        let set = ContactSet::new(arena, handles, contacts, &self.config)?;
        self.sets.push(set);
        Ok(self.sets.len() - 1)
    }

    pub fn sets(&self) -> &[ContactSet<H>] {
        &self.sets
    }

    pub fn sets_mut(&mut self) -> &mut [ContactSet<H>] {
        &mut self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }

    /// Solve with the configured iteration count.
    pub fn step<A>(&mut self, arena: &mut A, dt: f32) -> Result<Vec<SetReport>>
    where
        A: BodyArena<Handle = H>,
    {
        let iterations = self.config.iterations;
        self.timestep(arena, dt, iterations)
    }

    /// Relax every queued set `iteration_count` times, then apply its impulses.
    ///
    /// Every handle of every set is checked before the first impulse is
    /// written. On a stale handle no body changes and the queue is left as is.
    /// Otherwise the queue is emptied and reports come back in set order.
    pub fn timestep<A>(
        &mut self,
        arena: &mut A,
        dt: f32,
        iteration_count: u32,
    ) -> Result<Vec<SetReport>>
    where
        A: BodyArena<Handle = H>,
    {
        for (index, set) in self.sets.iter().enumerate() {
            if let Some(h) = set.missing_handle(&*arena) {
                warn!(set = index, handle = ?h, "contact set references a removed body");
                return Err(SolverError::MissingBody(format!("{h:?}")));
            }
        }

        let tolerance = self.config.convergence_tolerance;

        #[cfg(feature = "parallel")]
        let relaxed: Vec<(u32, f32)> = self
            .sets
            .par_iter_mut()
            .map(|set| relax(set, dt, iteration_count, tolerance))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let relaxed: Vec<(u32, f32)> = self
            .sets
            .iter_mut()
            .map(|set| relax(set, dt, iteration_count, tolerance))
            .collect();

        let mut reports = Vec::with_capacity(self.sets.len());
        for (set, (sweeps, last_delta)) in self.sets.drain(..).zip(relaxed) {
            let lambdas = set.apply_impulses(arena)?;
            reports.push(SetReport {
                sweeps,
                last_delta,
                lambdas,
            });
        }

        debug!(
            sets = reports.len(),
            contacts = reports.iter().map(|r| r.lambdas.len()).sum::<usize>(),
            sweeps = reports.iter().map(|r| r.sweeps).sum::<u32>(),
            "contact timestep"
        );
        Ok(reports)
    }
}

/// Run up to `iterations` sweeps, stopping early only when a tolerance is set and met.
pub(crate) fn relax<H: Copy + Eq + Hash + std::fmt::Debug>(
    set: &mut ContactSet<H>,
    dt: f32,
    iterations: u32,
    tolerance: Option<f32>,
) -> (u32, f32) {
    let mut last_delta = 0.0;
    for sweep in 0..iterations {
        last_delta = set.solve_iteration(dt);
        if tolerance.is_some_and(|tol| last_delta <= tol) {
            return (sweep + 1, last_delta);
        }
    }
    (iterations, last_delta)
}

/// Solve a single group of contacts in one call.
pub fn solve_contacts<A>(
    arena: &mut A,
    handles: Vec<A::Handle>,
    contacts: &[ContactDescriptor],
    config: &SolverConfig,
    dt: f32,
) -> Result<SetReport>
where
    A: BodyArena,
{
    let mut set = ContactSet::new(&*arena, handles, contacts, config)?;
    let (sweeps, last_delta) = relax(
        &mut set,
        dt,
        config.iterations,
        config.convergence_tolerance,
    );
    let lambdas = set.apply_impulses(arena)?;
    Ok(SetReport {
        sweeps,
        last_delta,
        lambdas,
    })
}
