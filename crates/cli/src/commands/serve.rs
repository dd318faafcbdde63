//! `localagent serve`: Start the HTTP API server.

pub async fn run(port: Option<u16>, host: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(host) = host {
        config.gateway.host = host;
    }

    println!("LocalAgent Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} @ {}", config.model.id, config.model.host);
    println!("   Memory:    {}", config.memory.backend);

    localagent_gateway::start(config).await?;

    Ok(())
}
