//! Explicit per-epoch configuration.
//!
//! Everything the original pipeline kept in process-wide globals (fraction
//! thresholds, refinement, correction toggles) lives here and is passed into
//! every stage.

use serde::{Deserialize, Serialize};

/// Time-integration scheme for particle advection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationScheme {
    /// Forward-Euler predictor with fixed-point midpoint correction.
    IterativeHeun,
    /// Classic RK4 over `substeps` equal sub-intervals, with the stage
    /// velocities blended in time between the two snapshots.
    RungeKutta4,
}

/// Configuration shared by all stages of an interface-tracking epoch.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct TopoConfig {
    /// Cells with fraction at or below this are treated as empty.
    pub emf0: f32,
    /// Cells with fraction at or above this are treated as full.
    pub emf1: f32,
    /// Seeds (and mesher sub-grids) are subdivided `2^refinement` per axis.
    pub refinement: u32,
    /// Ghost-layer depth of the domain decomposition, in cells.
    pub ghost_levels: i32,
    pub scheme: IntegrationScheme,
    /// Sub-step count for the RK4 scheme.
    pub substeps: u32,
    /// Snap particles that drifted out of the fluid back into it.
    pub vof_correction: bool,
    /// Clamp particles that crossed the local PLIC plane back onto it.
    pub plic_correction: bool,
    /// Half-width (in cells, per axis) of the VOF-correction search stencil.
    pub stencil_range: i32,
    /// Overrides the snapshot time delta when non-zero; for data sets with
    /// missing or wrong time stamps.
    pub time_step_delta: f64,
}

impl Default for TopoConfig {
    fn default() -> Self {
        Self {
            emf0: 0.000_001,
            emf1: 0.999_999,
            refinement: 0,
            ghost_levels: 4,
            scheme: IntegrationScheme::IterativeHeun,
            substeps: 1,
            vof_correction: true,
            plic_correction: true,
            stencil_range: 4,
            time_step_delta: 0.0,
        }
    }
}

impl TopoConfig {
    /// True for fractions in the open interval between the two thresholds.
    #[inline]
    pub fn is_mixed(&self, f: f32) -> bool {
        f > self.emf0 && f < self.emf1
    }

    /// True for fractions at or above the full threshold.
    #[inline]
    pub fn is_full(&self, f: f32) -> bool {
        f >= self.emf1
    }

    /// True for any cell carrying fluid (mixed or full).
    #[inline]
    pub fn is_fluid(&self, f: f32) -> bool {
        f > self.emf0
    }
}
