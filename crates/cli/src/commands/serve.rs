//! `connector serve`: Start the HTTP gateway.

use std::path::Path;

pub async fn run(explicit: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(explicit)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Connector gateway");
    println!("  Listening: http://{}:{}/v1/connector", config.gateway.host, config.gateway.port);
    println!("  Api key required: {}", config.gateway.api_key.is_some());
    println!(
        "  Training: {}",
        if config.training.enabled {
            format!("every {}s, batch {}", config.training.every_secs, config.training.batch_size)
        } else {
            "disabled".to_string()
        }
    );

    connector_gateway::start(config).await?;

    Ok(())
}
