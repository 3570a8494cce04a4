//! OPC part name rules

use crate::error::{Error, Result};

/// Reason a part name breaks the OPC naming rules, if it does
fn part_name_problem(part_name: &str) -> Option<&'static str> {
    if part_name.chars().any(char::is_control) {
        return Some("contains a control character");
    }
    if part_name.contains(['#', '?']) {
        return Some("carries a fragment or query");
    }

    let relative = part_name.strip_prefix('/').unwrap_or(part_name);
    relative.split('/').find_map(|segment| match segment {
        "" => Some("has an empty segment"),
        "." | ".." => Some("has a relative segment"),
        s if s.ends_with('.') => Some("has a segment ending in '.'"),
        _ => None,
    })
}

/// Check a part name against the OPC naming rules
///
/// Non-ASCII characters are accepted as-is; many real-world packages store them
/// unencoded in relationship targets.
pub fn validate_part_name(part_name: &str) -> Result<()> {
    match part_name_problem(part_name) {
        Some(problem) => Err(Error::InvalidFormat(format!(
            "Part name {} {}",
            part_name.escape_debug(),
            problem
        ))),
        None => Ok(()),
    }
}

/// Absolute form of a part name (`3D/a.model` → `/3D/a.model`)
pub fn normalize_part_name(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// ZIP entry name of a part (`/3D/a.model` → `3D/a.model`)
pub(crate) fn zip_entry_name(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}
