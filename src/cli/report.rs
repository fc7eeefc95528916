//! Plain-text rendering shared by the CLI commands

use crate::errors::{ProvisionError, Result};
use crate::models::types::format_size;
use crate::provision::get_available_disk_space;
use std::path::Path;

/// Lines describing a failed command. An aggregate gets a header and one
/// bullet per model, with each model named exactly once.
pub fn failure_lines(err: &ProvisionError) -> Vec<String> {
    match err {
        ProvisionError::Aggregate(failures) => {
            let mut lines = vec![format!(
                "{} required model(s) could not be provisioned:",
                failures.len()
            )];
            lines.extend(failures.iter().map(|failure| format!("  • {}", failure)));
            lines
        }
        other => vec![other.to_string()],
    }
}

/// `<path>: <size> free` for the volume holding `path`
pub fn disk_summary(path: &Path) -> Result<String> {
    let bytes = get_available_disk_space(path)?;
    Ok(format!("{}: {} free", path.display(), format_size(bytes)))
}
