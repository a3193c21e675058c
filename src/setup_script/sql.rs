use super::SetupScriptError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};

static LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*--.*$").expect("valid line comment pattern"));
static DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"DELIMITER\s+(\$\$|;)").expect("valid delimiter pattern"));

/// Split a migration the same way the setup script does on the server:
/// line comments and DELIMITER directives removed, `$$` treated as `;`,
/// split on every `;`, trimmed, empty pieces dropped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let sql = LINE_COMMENT.replace_all(sql, "");
    let sql = DELIMITER.replace_all(&sql, "");
    let sql = sql.replace("$$", ";");

    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normal_components(path: &Path) -> Result<Vec<String>, SetupScriptError> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::Normal(part) => Ok(part.to_string_lossy().into_owned()),
            _ => Err(SetupScriptError::InvalidPath(path.display().to_string())),
        })
        .collect()
}

/// Path of `migration` as seen from the directory containing `script`.
/// Both are relative to the same project root.
pub fn relative_migration_path(
    script: &Path,
    migration: &Path,
) -> Result<String, SetupScriptError> {
    let mut script_dir = normal_components(script)?;
    if script_dir.pop().is_none() {
        return Err(SetupScriptError::InvalidPath(script.display().to_string()));
    }
    let target = normal_components(migration)?;
    if target.is_empty() {
        return Err(SetupScriptError::InvalidPath(migration.display().to_string()));
    }

    let common = script_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; script_dir.len() - common];
    parts.extend(target[common..].iter().map(String::as_str));
    Ok(parts.join("/"))
}
