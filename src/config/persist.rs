//! Configuration persistence using toml_edit to preserve formatting and comments.

use anyhow::{Context, Result};
use std::path::Path;
use toml_edit::{value, DocumentMut, Item, Table};

/// Store a refreshed bearer token under `[<section>].token`.
///
/// Only that key is rewritten; comments and the rest of the document are
/// left as the user wrote them.
pub fn update_source_token(path: &Path, section: &str, token: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    let table = doc
        .entry(section)
        .or_insert(Item::Table(Table::new()))
        .as_table_like_mut()
        .with_context(|| format!("`{section}` in {:?} is not a table", path))?;
    table.insert("token", value(token));

    std::fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}
