//! Guards against a report clobbering the cookie or settings files.
//!
//! Reports are written into a user-chosen directory, which may well be the
//! data directory itself.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that a report path is safe to overwrite.
///
/// Checks:
/// - the file must be markdown (`.md`)
/// - the file name must contain `required_pattern` (e.g. `_vip_songs_`)
/// - the path must not be one of the `protected` files
pub fn validate_report_path(output: &Path, required_pattern: &str, protected: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if output.extension().and_then(|e| e.to_str()) != Some("md") {
        bail!(
            "Safety check failed: report '{}' must have a .md extension",
            output.display()
        );
    }

    if !output_name.contains(required_pattern) {
        bail!(
            "Safety check failed: report '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        );
    }

    for file in protected {
        if output == *file {
            bail!(
                "Safety check failed: report '{}' would overwrite '{}'",
                output.display(),
                file.display()
            );
        }
    }

    Ok(())
}
