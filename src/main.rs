use anyhow::Result;
use clap::{Parser, Subcommand};
use fire_path::api::{Cli, GoalArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "fire-path",
    about = "Years to financial independence, with and without extra spendings"
)]
struct App {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the projection next to its no-extras baseline.
    Project(Cli),
    /// Find the savings or expenses that reach FI by a target year.
    Solve {
        #[command(flatten)]
        cli: Cli,
        #[command(flatten)]
        goal: GoalArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match App::parse().command {
        Command::Serve { port } => fire_path::api::run_http_server(port).await?,
        Command::Project(cli) => {
            let json = fire_path::api::project_json(cli).map_err(anyhow::Error::msg)?;
            println!("{json}");
        }
        Command::Solve { cli, goal } => {
            let json = fire_path::api::solve_json(cli, goal).map_err(anyhow::Error::msg)?;
            println!("{json}");
        }
    }
    Ok(())
}
