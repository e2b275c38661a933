//! Tagged numeric storage for cell-centered data.
//!
//! Host pipelines hand us cell arrays in either single or double precision.
//! Instead of downcasting by runtime type tag at every access, the storage
//! variant is resolved once at ingestion and every consumer reads `f32`
//! (positions, fractions and labels are single precision throughout the
//! tracking pipeline).

use num_traits::ToPrimitive;

/// One scalar per cell, `i + j*resX + k*resX*resY` order.
#[derive(Clone, Debug)]
pub enum CellScalars {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl CellScalars {
    /// Ingests a component slice of any numeric type into `f32` storage.
    ///
    /// Non-finite or unrepresentable components become `0.0`.
    pub fn ingest<T: ToPrimitive>(components: &[T]) -> Self {
        CellScalars::F32(
            components
                .iter()
                .map(|v| v.to_f32().unwrap_or(0.0))
                .collect(),
        )
    }

    /// All-zero field of `len` cells; stand-in for a missing input array.
    pub fn zeros(len: usize) -> Self {
        CellScalars::F32(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        match self {
            CellScalars::F32(v) => v.len(),
            CellScalars::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn value(&self, idx: usize) -> f32 {
        match self {
            CellScalars::F32(v) => v[idx],
            CellScalars::F64(v) => v[idx] as f32,
        }
    }
}

/// Three components per cell, same linear cell order as [`CellScalars`].
#[derive(Clone, Debug)]
pub enum CellVectors {
    F32(Vec<[f32; 3]>),
    F64(Vec<[f64; 3]>),
}

impl CellVectors {
    /// Ingests an interleaved `xyzxyz...` component slice.
    pub fn ingest<T: ToPrimitive>(components: &[T]) -> Self {
        CellVectors::F32(
            components
                .chunks_exact(3)
                .map(|c| {
                    [
                        c[0].to_f32().unwrap_or(0.0),
                        c[1].to_f32().unwrap_or(0.0),
                        c[2].to_f32().unwrap_or(0.0),
                    ]
                })
                .collect(),
        )
    }

    pub fn zeros(len: usize) -> Self {
        CellVectors::F32(vec![[0.0; 3]; len])
    }

    pub fn len(&self) -> usize {
        match self {
            CellVectors::F32(v) => v.len(),
            CellVectors::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn vector(&self, idx: usize) -> [f32; 3] {
        match self {
            CellVectors::F32(v) => v[idx],
            CellVectors::F64(v) => {
                let w = v[idx];
                [w[0] as f32, w[1] as f32, w[2] as f32]
            }
        }
    }
}
