//! Volume fidelity of the PLIC offset solver.

use proptest::prelude::*;
use vof_topo::plic::{compute_lstar, truncated_fraction};
use vof_topo::TopoConfig;

fn normalize(n: [f32; 3]) -> [f32; 3] {
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    [n[0] / len, n[1] / len, n[2] / len]
}

proptest! {
    /// The plane offset solved for a fraction must truncate that fraction
    /// back out, within the solver tolerance.
    #[test]
    fn lstar_reproduces_the_fraction(
        nx in -1.0f32..1.0,
        ny in -1.0f32..1.0,
        nz in -1.0f32..1.0,
        f in 0.01f32..0.99,
        dx in 0.1f32..4.0,
        dy in 0.1f32..4.0,
        dz in 0.1f32..4.0,
    ) {
        prop_assume!(nx.abs() + ny.abs() + nz.abs() > 0.05);
        let n = normalize([nx, ny, nz]);
        let d = [dx, dy, dz];
        let cfg = TopoConfig::default();
        let lstar = compute_lstar(f, n, d, &cfg);
        let back = truncated_fraction(lstar, n, d);
        // solver convergence tolerance is 1e-3 on the fraction
        prop_assert!((back - f).abs() < 2e-3, "f={f}, back={back}, lstar={lstar}");
    }

    /// The offset is monotone in the fraction for a fixed plane.
    #[test]
    fn lstar_is_monotone_in_the_fraction(
        nx in 0.05f32..1.0,
        ny in 0.05f32..1.0,
        nz in 0.05f32..1.0,
        f in 0.05f32..0.9,
    ) {
        let n = normalize([nx, ny, nz]);
        let cfg = TopoConfig::default();
        let lo = compute_lstar(f, n, [1.0; 3], &cfg);
        let hi = compute_lstar(f + 0.05, n, [1.0; 3], &cfg);
        prop_assert!(hi >= lo - 1e-4, "f={f}: {lo} -> {hi}");
    }
}

#[test]
fn degenerate_fractions_snap_to_the_corners() {
    let cfg = TopoConfig::default();
    let n = normalize([0.3, 0.8, 0.52]);
    assert_eq!(compute_lstar(0.0, n, [1.0; 3], &cfg), 0.0);
    let full = compute_lstar(1.0, n, [1.0; 3], &cfg);
    let ndsum = n[0].abs() + n[1].abs() + n[2].abs();
    assert!((full - ndsum).abs() < 1e-6);
}
