//! `connector train`: Process one training batch now.

use connector_gateway::Services;
use std::path::Path;

pub async fn run(explicit: Option<&Path>, batch_size: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let services = Services::build(&config).await?;

    let batch_size = batch_size.unwrap_or(config.training.batch_size).max(1);
    let report = services.training.run_batch(batch_size).await?;

    println!("Training batch");
    println!("  Fetched: {}", report.fetched);
    println!("  Done:    {}", report.done);
    println!("  Failed:  {}", report.failed);

    Ok(())
}
