//! Fixed-layout records exchanged between ranks.
//!
//! Everything on the wire is `Pod`, cast to and from byte slices in place.
//! Particle batches travel as the in-memory [`Particle`] record itself;
//! the integer channels riding in it rely on `i32` and `f32` sharing a
//! width, which is asserted below.
//!
//! [`Particle`]: crate::particle::Particle

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

const_assert_eq!(
    std::mem::size_of::<f32>(),
    std::mem::size_of::<i32>()
);

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn cast_slice_mut<T: Pod>(v: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(v)
}

pub fn cast_slice_from<T: Pod>(v: &[u8]) -> &[T] {
    bytemuck::cast_slice(v)
}

/// Item count preceding a payload. Little-endian on the wire.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u32,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u32).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u32::from_le(self.n_le) as usize
    }
}

/// One labeled boundary cell: global node-index triple plus the rank-offset
/// component label.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct WireLabeledCell {
    pub i: i32,
    pub j: i32,
    pub k: i32,
    pub label: i32,
}

impl WireLabeledCell {
    pub fn new(ijk: [i32; 3], label: i32) -> Self {
        Self {
            i: ijk[0],
            j: ijk[1],
            k: ijk[2],
            label,
        }
    }

    #[inline]
    pub fn ijk(&self) -> [i32; 3] {
        [self.i, self.j, self.k]
    }
}

/// A labeled particle returning to its seeding rank at the end of an epoch.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WireParticleLabel {
    pub particle: crate::particle::Particle,
    pub label: f32,
}

impl WireParticleLabel {
    pub fn new(particle: crate::particle::Particle, label: f32) -> Self {
        Self { particle, label }
    }
}

const _: () = {
    assert!(std::mem::size_of::<WireCount>() == 4);
    assert!(std::mem::size_of::<WireLabeledCell>() == 16);
    assert!(std::mem::size_of::<crate::particle::Particle>() == 28);
    assert!(std::mem::size_of::<WireParticleLabel>() == 32);
};
