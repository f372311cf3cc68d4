use anyhow::{anyhow, ensure, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int32Type, Int64Type};
use arrow_array::{Array, ArrayRef, RecordBatch};
use arrow_schema::DataType;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{DistanceType, Table};
use std::path::Path;

use kbase_core::traits::VectorIndex;
use kbase_core::types::{Handle, Neighbor};

use crate::flat::FlatIndex;
use crate::schema::{vector_dim, DISTANCE_COLUMN, POSITION_COLUMN, VECTOR_COLUMN};
use crate::table::open_existing_table;

/// Persisted LanceDB vector index searched by exact squared-L2 distance.
///
/// The table is opened once and only read afterwards; `Table` handles are
/// safe to share across concurrent searches.
pub struct LanceIndex {
	table: Table,
	len: usize,
	dim: usize,
}

impl LanceIndex {
	pub async fn open(uri: &Path, table_name: &str) -> Result<Self> {
		let table = open_existing_table(uri, table_name).await?;
		let schema = table.schema().await?;
		let dim = vector_dim(&schema)?;
		let len = table.count_rows(None).await?;
		Ok(Self { table, len, dim })
	}

	/// Copy every stored vector into an in-memory [`FlatIndex`].
	pub async fn to_flat(&self) -> Result<FlatIndex> {
		let mut flat = FlatIndex::with_capacity(self.dim, self.len);
		let mut stream = self.table.query().select(Select::columns(&[POSITION_COLUMN, VECTOR_COLUMN])).execute().await?;
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
			let positions = positions(&batch)?;
			let vectors = batch
				.column_by_name(VECTOR_COLUMN)
				.and_then(|c| c.as_fixed_size_list_opt())
				.ok_or_else(|| anyhow!("'{}' column missing or not a fixed-size list", VECTOR_COLUMN))?;
			for (i, position) in positions.into_iter().enumerate() {
				if vectors.is_null(i) {
					tracing::warn!(position, "skipping index row without a vector");
					continue;
				}
				let list = vectors.value(i);
				let values = list.as_primitive_opt::<Float32Type>().ok_or_else(|| anyhow!("vector items must be Float32"))?;
				flat.push(position, values.values())?;
			}
		}
		Ok(flat)
	}
}

#[async_trait]
impl VectorIndex for LanceIndex {
	fn len(&self) -> usize { self.len }
	fn dim(&self) -> usize { self.dim }

	async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
		ensure!(query.len() == self.dim, "query has {} dims, index expects {}", query.len(), self.dim);
		if k == 0 { return Ok(Vec::new()); }
		let mut stream = self
			.table
			.vector_search(query.to_vec())?
			.column(VECTOR_COLUMN)
			.distance_type(DistanceType::L2)
			.limit(k)
			.execute()
			.await?;
		let mut hits = Vec::with_capacity(k);
		while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
			let handles = positions(&batch)?;
			let distances = batch
				.column_by_name(DISTANCE_COLUMN)
				.and_then(|c| c.as_primitive_opt::<Float32Type>())
				.ok_or_else(|| anyhow!("search result has no '{}' column", DISTANCE_COLUMN))?;
			for (i, handle) in handles.into_iter().enumerate() {
				hits.push(Neighbor { handle, distance: distances.value(i) });
			}
		}
		Ok(hits)
	}
}

fn positions(batch: &RecordBatch) -> Result<Vec<Handle>> {
	let col: &ArrayRef = batch
		.column_by_name(POSITION_COLUMN)
		.ok_or_else(|| anyhow!("'{}' column missing", POSITION_COLUMN))?;
	let handles = match col.data_type() {
		DataType::Int64 => col.as_primitive::<Int64Type>().iter().map(|v| v.unwrap_or(kbase_core::types::NO_MATCH)).collect(),
		DataType::Int32 => col.as_primitive::<Int32Type>().iter().map(|v| v.map_or(kbase_core::types::NO_MATCH, i64::from)).collect(),
		other => return Err(anyhow!("'{}' column has unsupported type {:?}", POSITION_COLUMN, other)),
	};
	Ok(handles)
}
