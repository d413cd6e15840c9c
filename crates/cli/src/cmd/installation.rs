use std::sync::Arc;

use anyhow::{Result, anyhow};
use argp::FromArgs;
use issue_bridge_core::{
    config::Config,
    models::{AppIdentity, RepoRef},
    secret::SystemSecrets,
};
use issue_bridge_github::GitHub;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Look up the app installation covering a repository.
#[argp(subcommand, name = "installation")]
pub struct Args {
    #[argp(option, short = 'u')]
    /// repository URL
    url: String,
}

pub async fn run(args: Args, config: &Config) -> Result<()> {
    let repo = RepoRef::parse(&args.url)
        .ok_or_else(|| anyhow!("'{}' is not a repository URL", args.url))?;
    let identity = Arc::new(AppIdentity::load(&config.github.app, &SystemSecrets)?);
    let github = GitHub::new(&config.github, &config.http, identity)?;
    let installation = github.find_installation(&repo).await?;
    if installation.id.is_installed() {
        println!("{} (account {})", installation.id, installation.owner_login);
    } else {
        println!("App {} is not installed for {}", github.app_id(), repo);
    }
    Ok(())
}
