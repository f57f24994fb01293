//! Verification command discovery from project manifests.

use serde_json::Value;
use std::path::Path;

/// package.json scripts in priority order.
const SCRIPT_PRIORITY: &[&str] = &["test", "build", "lint"];

/// Lock file to package runner, first match wins.
const LOCKFILE_RUNNERS: &[(&str, &str)] = &[
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("bun.lockb", "bun"),
    ("bun.lock", "bun"),
    ("package-lock.json", "npm"),
];

/// Pick the command that verifies the project at `root`.
///
/// An operator override always wins. Without one, a `package.json` script
/// (`test` > `build` > `lint`) is preferred, then `Cargo.toml` and `go.mod`.
/// Returns `None` rather than guessing.
pub fn resolve_verify_command(root: &Path, override_command: Option<&str>) -> Option<String> {
    if let Some(command) = override_command.map(str::trim).filter(|c| !c.is_empty()) {
        return Some(command.to_string());
    }

    if let Some(command) = from_package_json(root) {
        return Some(command);
    }
    if root.join("Cargo.toml").is_file() {
        return Some("cargo test".to_string());
    }
    if root.join("go.mod").is_file() {
        return Some("go test ./...".to_string());
    }
    None
}

fn from_package_json(root: &Path) -> Option<String> {
    let path = root.join("package.json");
    let raw = std::fs::read_to_string(&path).ok()?;
    let manifest: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!("Ignoring unparseable {}: {}", path.display(), err);
            return None;
        }
    };
    let scripts = manifest.get("scripts")?.as_object()?;

    let script = SCRIPT_PRIORITY.iter().find(|name| {
        scripts
            .get(**name)
            .and_then(Value::as_str)
            .is_some_and(|body| !body.trim().is_empty() && !is_placeholder_test(body))
    })?;

    let runner = LOCKFILE_RUNNERS
        .iter()
        .find(|(lockfile, _)| root.join(lockfile).is_file())
        .map(|(_, runner)| *runner)
        .unwrap_or("npm");
    Some(format!("{} run {}", runner, script))
}

/// The script `npm init` writes, which always fails.
fn is_placeholder_test(body: &str) -> bool {
    body.contains("no test specified")
}
