use tracing::{debug, warn};

use crate::{errors::RowFsError, store::RowStore};

/// Maps a file write onto a row's content and persists it.
///
/// Only two shapes are distinguished: a write at offset 0 (or below) replaces the whole
/// content, and a write at any positive offset appends to the content currently stored
/// for the row. The offset is never used as a splice position, so random-access writes
/// are not supported. Returns the content as persisted.
pub fn write_content<S>(store: &S, id: i64, data: &[u8], offset: i64) -> Result<Vec<u8>, RowFsError>
where
    S: RowStore + ?Sized,
{
    let content = if offset > 0 {
        let mut current = store
            .fetch_content(id)
            .map_err(|e| write_failure(id, e))?
            .unwrap_or_default();
        current.extend_from_slice(data);
        current
    } else {
        data.to_vec()
    };

    store
        .update_content(id, &content)
        .map_err(|e| write_failure(id, e))?;
    debug!(id, offset, written = data.len(), total = content.len(), "persisted write");
    Ok(content)
}

fn write_failure(id: i64, err: RowFsError) -> RowFsError {
    warn!(id, error = %err, "write failed");
    match err {
        RowFsError::WriteError(_) => err,
        other => RowFsError::write(format!("row {id}: {other}")),
    }
}
