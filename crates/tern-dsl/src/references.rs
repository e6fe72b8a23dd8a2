//! Property, assumption and lemma references.
//!
//! A reference is either a path to a file holding one formula per non-blank
//! line, or an inline comma-separated list of formulas.

use std::fs;
use std::path::{Path, PathBuf};

use crate::registry::ModelError;

/// Expand a reference into its formula strings.
///
/// Relative paths are looked up under `base`. Commas nested inside
/// parentheses (as in `ite(c, a, b)`) do not split the inline form.
pub fn resolve_reference(reference: &str, base: &Path) -> Result<Vec<String>, ModelError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(path) = existing_file(reference, base) {
        let contents = fs::read_to_string(&path).map_err(|source| ModelError::Io {
            path: path.clone(),
            source,
        })?;
        return Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect());
    }
    Ok(split_top_level(reference))
}

fn existing_file(reference: &str, base: &Path) -> Option<PathBuf> {
    let candidate = Path::new(reference);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    };
    path.is_file().then_some(path)
}

fn split_top_level(list: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    out.push(current);
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
