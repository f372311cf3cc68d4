//! Writes vector index datasets in the layout [`crate::LanceIndex`] reads:
//! one row per vector, `position` = row number = handle. Used by offline
//! tooling and test fixtures; the query service never writes.

use anyhow::{ensure, Result};
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator};
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;

use crate::schema::build_index_schema;
use crate::table::open_db;

pub async fn write_index(conn: &Connection, table_name: &str, dim: usize, vectors: &[Vec<f32>]) -> Result<()> {
	ensure!(!conn.table_names().execute().await?.iter().any(|n| n == table_name), "table '{}' already exists", table_name);
	for (pos, v) in vectors.iter().enumerate() {
		ensure!(v.len() == dim, "vector {} has {} dims, expected {}", pos, v.len(), dim);
	}
	let schema = build_index_schema(i32::try_from(dim)?);
	let positions: Vec<i64> = (0..vectors.len()).map(i64::try_from).collect::<Result<_, _>>()?;
	let rows: Vec<Option<Vec<Option<f32>>>> = vectors.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
	let record_batch = RecordBatch::try_new(schema.clone(), vec![
		Arc::new(Int64Array::from(positions)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(rows.into_iter(), i32::try_from(dim)?)),
	])?;
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
	conn.create_table(table_name, reader).execute().await?;
	tracing::info!(table = table_name, vectors = vectors.len(), dim, "wrote vector index");
	Ok(())
}

/// Convenience wrapper that opens (or creates) the database directory first.
pub async fn create_index_at(uri: &Path, table_name: &str, dim: usize, vectors: &[Vec<f32>]) -> Result<()> {
	let conn = open_db(uri.to_string_lossy().as_ref()).await?;
	write_index(&conn, table_name, dim, vectors).await
}
