//! `connector routes`: Show configured routes.

use connector_gateway::Services;
use connector_store::RouteAdmin;
use std::path::Path;

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let services = Services::build(&config).await?;
    let routes = services.store.list_routes().await?;

    if routes.is_empty() {
        println!("No routes configured. Add [[routes]] entries to the config file.");
        return Ok(());
    }

    println!(
        "  {:<24} {:<14} {:<14} {:>8} {:<10} {:<24} {}",
        "ROUTE", "DATA TYPE", "CHARACTERISTIC", "PRIORITY", "PROVIDER", "MODEL", "ENABLED"
    );
    for rule in routes {
        println!(
            "  {:<24} {:<14} {:<14} {:>8} {:<10} {:<24} {}",
            rule.route.route_key,
            rule.data_type,
            rule.characteristic,
            rule.priority,
            rule.route.provider,
            rule.route.model.as_deref().unwrap_or("(default)"),
            if rule.enabled { "yes" } else { "no" },
        );
    }

    Ok(())
}
