//! `localagent review`: Review inline code or a source file.

use std::path::Path;
use tracing::info;

/// Extensions read from disk when `--code` names an existing file.
const SOURCE_EXTENSIONS: &[&str] = &["py", "rs", "txt"];

pub async fn run(code: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let code = resolve_code(code)?;
    let service = super::load_service()?;
    info!(model = service.model(), code_len = code.len(), "Reviewing code");

    let response = service.review(&code).await?;
    super::report("review", &response, json)
}

/// `--code` is a path when it names an existing source file, inline code otherwise.
fn resolve_code(arg: &str) -> Result<String, Box<dyn std::error::Error>> {
    let path = Path::new(arg);
    let is_source = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e));

    if is_source && path.is_file() {
        info!(path = %path.display(), "Reading code from file");
        return std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()).into());
    }
    Ok(arg.to_string())
}
