//! snmp-mib-agent: serve configured values and proxied subtrees over SNMP.

use std::process::ExitCode;

use clap::Parser;
use snmp_mib_agent::cli::args::AgentArgs;
use snmp_mib_agent::cli::config::{AgentConfig, ConfigError};

#[tokio::main]
async fn main() -> ExitCode {
    let args = AgentArgs::parse();
    args.log.init_tracing();

    let file = match &args.config {
        Some(path) => match AgentConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => AgentConfig::default(),
    };
    let config = args.merge_into(file);

    match serve(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: &AgentConfig) -> Result<(), ConfigError> {
    let mut agent = config.builder().build().await?;
    config.register(&mut agent).await?;

    let token = agent.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(target: "snmp_mib_agent::cli", "interrupted");
            token.cancel();
        }
    });

    agent.run().await?;
    Ok(())
}
