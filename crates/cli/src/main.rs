mod cmd;
mod prompt;

use std::path::PathBuf;

use anyhow::Result;
use argp::FromArgs;
use issue_bridge_core::config::Config;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(FromArgs, PartialEq, Debug)]
/// Open GitHub issues from Slack messages.
struct TopLevel {
    #[argp(option, short = 'c', default = "PathBuf::from(\"config.yml\")")]
    /// path to the config file
    config: PathBuf,
    #[argp(subcommand)]
    command: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Create(cmd::create::Args),
    Installation(cmd::installation::Args),
}

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_filter(env_filter))
        .init();

    let args: TopLevel = argp::parse_args_or_exit(argp::DEFAULT);
    if let Err(e) = run(args).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(args: TopLevel) -> Result<()> {
    let config = Config::load(&args.config)?;
    match args.command {
        SubCommand::Create(c_args) => cmd::create::run(c_args, &config).await,
        SubCommand::Installation(c_args) => cmd::installation::run(c_args, &config).await,
    }
}
