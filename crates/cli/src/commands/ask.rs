//! `connector ask`: One prompt through the routed provider.

use connector_core::inference::{InferenceRequest, RoutingKeys};
use connector_gateway::Services;
use futures::StreamExt;
use std::io::Write;
use std::path::Path;

pub struct AskArgs {
    pub data_type: String,
    pub characteristic: String,
    pub module: Option<String>,
    pub profile: Option<String>,
    pub stream: bool,
    pub prompt: String,
}

impl AskArgs {
    fn routing_keys(&self) -> RoutingKeys {
        let mut keys = RoutingKeys::new(self.data_type.as_str(), self.characteristic.as_str());
        if let Some(module) = &self.module {
            keys = keys.module(module.as_str());
        }
        if let Some(profile) = &self.profile {
            keys = keys.profile(profile.as_str());
        }
        keys
    }
}

pub async fn run(explicit: Option<&Path>, args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let services = Services::build(&config).await?;

    let keys = args.routing_keys();
    let request = InferenceRequest::new(args.prompt.as_str()).with_metadata("source", "cli");

    if args.stream {
        let mut chunks = services.orchestrator.ask_stream(&request, &keys).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next().await {
            writeln!(stdout, "{}", chunk?)?;
            stdout.flush()?;
        }
        return Ok(());
    }

    let response = services.orchestrator.ask(&request, &keys).await?;
    println!("{}", response.output);
    eprintln!();
    eprintln!("  route: {}  provider: {}  model: {}", response.route_key, response.provider, response.model);

    Ok(())
}
