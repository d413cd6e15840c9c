use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use argp::FromArgs;
use issue_bridge_core::{
    config::Config,
    models::{AppIdentity, IssueForm},
    secret::{SecretProvider, SystemSecrets},
};
use issue_bridge_enrich::EnrichmentClient;
use issue_bridge_github::GitHub;
use issue_bridge_slack::SlackClient;
use issue_bridge_workflow::{Completion, Ports, Trigger, Workflow, stages::confirmation_text};

use crate::prompt::TerminalInput;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Create an issue from a Slack message and confirm it in the message's thread.
#[argp(subcommand, name = "create")]
pub struct Args {
    #[argp(option, short = 'l')]
    /// message permalink (instead of --channel and --ts)
    link: Option<String>,
    #[argp(option)]
    /// channel ID of the message
    channel: Option<String>,
    #[argp(option)]
    /// timestamp of the message
    ts: Option<String>,
    #[argp(option, short = 'u')]
    /// repository URL (prompted if omitted)
    url: Option<String>,
    #[argp(option, short = 't')]
    /// issue title (prompted if omitted)
    title: Option<String>,
    #[argp(option, short = 'd')]
    /// issue description (prompted if omitted)
    description: Option<String>,
    #[argp(option, short = 'a')]
    /// comma-separated assignees
    assignees: Option<String>,
}

impl Args {
    fn trigger(&self) -> Result<Trigger> {
        match (&self.link, &self.channel, &self.ts) {
            (Some(link), None, None) => Trigger::from_permalink(link)
                .ok_or_else(|| anyhow!("'{link}' is not a Slack message link")),
            (None, Some(channel), Some(ts)) => {
                Ok(Trigger { channel: channel.clone(), message_ts: ts.clone() })
            }
            _ => bail!("Pass either --link or both --channel and --ts"),
        }
    }
}

pub async fn run(args: Args, config: &Config) -> Result<()> {
    let trigger = args.trigger()?;
    let secrets = SystemSecrets;
    let identity = Arc::new(AppIdentity::load(&config.github.app, &secrets)?);
    let github = GitHub::new(&config.github, &config.http, identity)?;
    let bot_token = secrets.resolve(&config.slack.bot_token)?;
    let slack = Arc::new(SlackClient::new(&config.slack, &config.http, bot_token)?);
    let enricher = EnrichmentClient::new(&config.enrichment, &config.http)?;
    let input = TerminalInput::new(IssueForm {
        url: args.url.unwrap_or_default(),
        title: args.title.unwrap_or_default(),
        description: args.description.unwrap_or_default(),
        assignees: args.assignees.unwrap_or_default(),
    });

    let workflow = Workflow::standard(Ports {
        thread: slack.clone(),
        enricher: Arc::new(enricher),
        tenant_ids: config.enrichment.tenant_ids.clone(),
        input: Arc::new(input),
        tracker: Arc::new(github),
        notifier: slack,
    });
    let outcome = workflow.run(trigger).await.map_err(|e| anyhow!(e.user_message()))?;
    for degradation in &outcome.degraded {
        tracing::warn!("Stage {} fell back: {}", degradation.stage, degradation.failure);
    }
    if outcome.completion == Completion::DegradedDone {
        tracing::info!("Completed without optional context");
    }
    println!("{}", confirmation_text(&outcome.issue));
    Ok(())
}
