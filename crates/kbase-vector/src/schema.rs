use anyhow::{bail, Result};
use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const POSITION_COLUMN: &str = "position";
pub const VECTOR_COLUMN: &str = "vector";
/// Column LanceDB appends to vector search results.
pub const DISTANCE_COLUMN: &str = "_distance";

pub fn build_index_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(POSITION_COLUMN, DataType::Int64, false),
		Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

/// Dimensionality of the `vector` column, validating the rest of the layout.
pub fn vector_dim(schema: &Schema) -> Result<usize> {
	match schema.field_with_name(POSITION_COLUMN)?.data_type() {
		DataType::Int64 | DataType::Int32 => {}
		other => bail!("column '{}' must be an integer, found {:?}", POSITION_COLUMN, other),
	}
	match schema.field_with_name(VECTOR_COLUMN)?.data_type() {
		DataType::FixedSizeList(item, n) if item.data_type() == &DataType::Float32 => Ok(usize::try_from(*n)?),
		other => bail!("column '{}' must be FixedSizeList<Float32>, found {:?}", VECTOR_COLUMN, other),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn vector_dim_reads_fixed_size_list() {
		assert_eq!(vector_dim(&build_index_schema(384)).unwrap(), 384);
	}

	#[test]
	fn vector_dim_rejects_other_layouts() {
		let schema = Schema::new(vec![
			Field::new(POSITION_COLUMN, DataType::Utf8, false),
			Field::new(VECTOR_COLUMN, DataType::Float32, false),
		]);
		assert!(vector_dim(&schema).is_err());
		let schema = Schema::new(vec![Field::new(VECTOR_COLUMN, DataType::Float32, false)]);
		assert!(vector_dim(&schema).is_err());
	}
}
