//! LanceDB connection helpers. The serving path only ever opens existing
//! datasets; nothing here creates or mutates tables.

use anyhow::Result;
use lancedb::{connect, Connection, Table};
use std::path::Path;

use kbase_core::Error;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

/// Open `name` under the dataset directory `uri`, failing with `NotFound`
/// rather than silently creating an empty database.
pub async fn open_existing_table(uri: &Path, name: &str) -> Result<Table> {
    if !uri.is_dir() {
        return Err(Error::NotFound(format!("vector index directory {}", uri.display())).into());
    }
    let conn = open_db(uri.to_string_lossy().as_ref()).await?;
    let names = conn.table_names().execute().await?;
    if !names.iter().any(|n| n == name) {
        return Err(Error::NotFound(format!("table '{}' in {}", name, uri.display())).into());
    }
    Ok(conn.open_table(name).execute().await?)
}
