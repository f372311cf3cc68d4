use anyhow::{ensure, Result};
use async_trait::async_trait;

use kbase_core::traits::VectorIndex;
use kbase_core::types::{Handle, Neighbor};

/// Exact in-memory index: every search scans all vectors and ranks them by
/// squared L2 distance. Ties are broken by handle so results are stable.
#[derive(Debug, Clone)]
pub struct FlatIndex {
	dim: usize,
	handles: Vec<Handle>,
	data: Vec<f32>,
}

impl FlatIndex {
	pub fn with_capacity(dim: usize, rows: usize) -> Self {
		Self { dim, handles: Vec::with_capacity(rows), data: Vec::with_capacity(rows * dim) }
	}

	/// Build from vectors whose handles are their positions in `vectors`.
	pub fn from_vectors(dim: usize, vectors: &[Vec<f32>]) -> Result<Self> {
		let mut index = Self::with_capacity(dim, vectors.len());
		for (pos, v) in vectors.iter().enumerate() {
			index.push(Handle::try_from(pos)?, v)?;
		}
		Ok(index)
	}

	pub fn push(&mut self, handle: Handle, vector: &[f32]) -> Result<()> {
		ensure!(vector.len() == self.dim, "vector for handle {} has {} dims, expected {}", handle, vector.len(), self.dim);
		self.handles.push(handle);
		self.data.extend_from_slice(vector);
		Ok(())
	}
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait]
impl VectorIndex for FlatIndex {
	fn len(&self) -> usize { self.handles.len() }
	fn dim(&self) -> usize { self.dim }

	async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
		ensure!(query.len() == self.dim, "query has {} dims, index expects {}", query.len(), self.dim);
		if self.dim == 0 || k == 0 { return Ok(Vec::new()); }
		let mut scored: Vec<Neighbor> = self
			.handles
			.iter()
			.zip(self.data.chunks_exact(self.dim))
			.map(|(&handle, row)| Neighbor { handle, distance: squared_l2(query, row) })
			.collect();
		scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.handle.cmp(&b.handle)));
		scored.truncate(k);
		Ok(scored)
	}
}
