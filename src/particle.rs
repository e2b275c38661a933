//! Tracked interface particles.

use bytemuck::{Pod, Zeroable};

/// One advected seed.
///
/// `repr(C)` and `Pod` so particle batches can travel between ranks as raw
/// byte slices. The integer channels share the record with the float ones;
/// the wire layer asserts the two widths agree.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Physical position.
    pub pos: [f32; 3],
    /// Fraction of the t1 field interpolated at `pos` after the last
    /// advection step. Seeds start at 1.0; a value at or below the empty
    /// threshold freezes the particle.
    pub fluid: f32,
    /// Stable per-rank seed ordinal, assigned once at seeding.
    pub id: i32,
    /// Rank that seeded the particle.
    pub proc: i32,
    /// Accumulated correction distance.
    pub uncertainty: f32,
}

impl Particle {
    pub fn new(pos: [f32; 3], id: i32, proc: i32) -> Self {
        Self {
            pos,
            fluid: 1.0,
            id,
            proc,
            uncertainty: 0.0,
        }
    }

    /// True while the particle still tracks fluid and keeps advecting.
    #[inline]
    pub fn is_active(&self, emf0: f32) -> bool {
        self.fluid > emf0
    }
}
