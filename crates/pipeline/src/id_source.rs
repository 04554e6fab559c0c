//! Loading explicit dashboard ids from a CSV file.

use std::path::Path;

use dashmig_core::error::ConfigError;

/// Header names recognized as the id column, in priority order.
pub const ID_COLUMNS: &[&str] = &["legacy_id", "id", "dashboard_id", "dashboardId"];

/// Read every non-empty id from the first recognized id column of `path`.
pub fn load_id_csv(path: &Path) -> Result<Vec<String>, ConfigError> {
    let source_err = |message: String| ConfigError::IdSource {
        path: path.display().to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| source_err(e.to_string()))?;
    let headers = reader.headers().map_err(|e| source_err(e.to_string()))?.clone();

    let column = ID_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
        .ok_or_else(|| {
            source_err(format!(
                "no recognized id column, expected one of: {}",
                ID_COLUMNS.join(", ")
            ))
        })?;

    let mut ids = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| source_err(e.to_string()))?;
        if let Some(id) = row.get(column).map(str::trim).filter(|id| !id.is_empty()) {
            ids.push(id.to_string());
        }
    }

    tracing::info!(path = %path.display(), count = ids.len(), "Loaded dashboard ids from CSV");
    Ok(ids)
}
