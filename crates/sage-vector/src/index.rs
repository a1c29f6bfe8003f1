//! Exact nearest-neighbor index over fixed-dimension vectors.
//!
//! Vectors are stored contiguously in insertion order and searched by a full
//! scan with squared Euclidean distance. The corpus is small (tens to a few
//! thousand entries), so the O(n) scan keeps results exact.

use sage_core::error::SageError;

/// A search hit: the insertion position of a stored vector and its distance
/// to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Zero-based position in insertion order.
    pub position: usize,
    /// Squared Euclidean distance to the query (always >= 0).
    pub distance: f32,
}

/// Append-only flat vector index.
///
/// Not synchronized on its own; [`crate::corpus::KnowledgeCorpus`] owns it
/// behind a lock together with the entries it describes.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Append a vector. Its position is the previous `len()`.
    pub fn insert(&mut self, vector: &[f32]) -> Result<usize, SageError> {
        self.check_dimensions(vector)?;
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Return the `k` nearest stored vectors, nearest first.
    ///
    /// Equal distances keep insertion order. The result holds
    /// `min(k, len())` neighbors.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, SageError> {
        self.check_dimensions(query)?;
        if k == 0 || self.data.is_empty() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, stored)| Neighbor {
                position,
                distance: squared_l2(query, stored),
            })
            .collect();

        // sort_by is stable, so ties stay in insertion order.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Remove every stored vector.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), SageError> {
        if vector.len() != self.dimensions || self.dimensions == 0 {
            return Err(SageError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Squared Euclidean distance between two equal-length vectors.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
