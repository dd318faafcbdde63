//! `localagent generate`: Generate code for a task.

use tracing::info;

pub async fn run(task: &str, context: Option<&str>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let service = super::load_service()?;
    info!(model = service.model(), "Generating code");

    let response = service.generate(task, context).await?;
    super::report("code", &response, json)
}
