use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use cloud_reconciler::prelude::*;

/// Drive resources in the cloud control plane to a settled state
#[derive(Parser, Debug)]
#[command(name = "cloud-reconciler", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Read a resource and print its current state
    Get(Target),

    /// Wait for a resource to settle without changing it
    ///
    /// Only clusters converge remotely; deployments are ready as soon as the
    /// API answers.
    Wait {
        #[command(subcommand)]
        target: WaitTarget,
    },

    /// Delete a resource and wait until it is gone
    Delete(Target),
}

#[derive(Args, Debug, PartialEq, Eq)]
struct Target {
    /// Kind of resource
    #[arg(value_enum)]
    kind: Kind,

    /// Remote identifier
    id: String,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum WaitTarget {
    /// Wait on a cluster
    Cluster {
        /// Cluster identifier
        id: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Cluster,
    Deployment,
}

async fn run(command: Commands) -> anyhow::Result<serde_json::Value> {
    let config = ApiConfig::from_env().context("loading API configuration")?;
    let timing = PollTiming::from_env().context("loading poll timing")?;
    let client = Arc::new(ApiClient::new(config)?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let clusters = ClusterResource::new(Arc::clone(&client), timing).with_cancellation(cancel);
    let deployments = DeploymentResource::new(client);

    match command {
        Commands::Get(Target {
            kind: Kind::Cluster,
            id,
        }) => {
            let mut state = ClusterState::with_id(&id);
            clusters.read(&mut state).await?;
            Ok(serde_json::to_value(&state)?)
        }
        Commands::Get(Target {
            kind: Kind::Deployment,
            id,
        }) => {
            let mut state = DeploymentState::with_id(&id);
            deployments.read(&mut state).await?;
            Ok(serde_json::to_value(&state)?)
        }
        Commands::Wait {
            target: WaitTarget::Cluster { id },
        } => {
            let mut state = ClusterState::with_id(&id);
            clusters
                .wait(&mut state)
                .await
                .with_context(|| format!("waiting on cluster {}", id))?;
            Ok(serde_json::to_value(&state)?)
        }
        Commands::Delete(Target {
            kind: Kind::Cluster,
            id,
        }) => {
            let mut state = ClusterState::with_id(&id);
            clusters
                .delete(&mut state)
                .await
                .with_context(|| format!("deleting cluster {}", id))?;
            Ok(serde_json::to_value(&state)?)
        }
        Commands::Delete(Target {
            kind: Kind::Deployment,
            id,
        }) => {
            let mut state = DeploymentState::with_id(&id);
            deployments
                .delete(&mut state)
                .await
                .with_context(|| format!("deleting deployment {}", id))?;
            Ok(serde_json::to_value(&state)?)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(output) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string())
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", format_anyhow_chain(&e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Commands, clap::Error> {
        Cli::try_parse_from(std::iter::once("cloud-reconciler").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse(&["wait", "cluster", "cl-1"]).expect("parses"),
            Commands::Wait {
                target: WaitTarget::Cluster {
                    id: "cl-1".to_string()
                }
            }
        );
        assert_eq!(
            parse(&["delete", "deployment", "dep-1"]).expect("parses"),
            Commands::Delete(Target {
                kind: Kind::Deployment,
                id: "dep-1".to_string(),
            })
        );
        assert_eq!(
            parse(&["get", "cluster", "cl-2"]).expect("parses"),
            Commands::Get(Target {
                kind: Kind::Cluster,
                id: "cl-2".to_string(),
            })
        );
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse(&["get", "cluster"]).is_err());
        assert!(parse(&["restart", "cluster", "cl-1"]).is_err());
        assert!(parse(&["get", "workspace", "ws-1"]).is_err());
        assert!(parse(&["wait", "deployment", "dep-1"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
