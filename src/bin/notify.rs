use clap::Parser;
use standup_bot::handle::{notify_team, parse_emails};
use standup_bot::slack::SlackClient;
use standup_bot::{exit_with, init_tracing, Config, Error, Result};
use tracing::info;

/// Send standup reminders to team members via Slack
#[derive(Parser)]
#[command(name = "standup-notify", version)]
struct Args {
    /// Email addresses to remind; each argument may be a comma separated list
    #[arg(required = true)]
    emails: Vec<String>,
}

fn main() {
    let args = Args::parse();
    let config = Config::from_env();
    init_tracing();

    if let Err(e) = run(&args, &config) {
        exit_with(&e);
    }
}

fn run(args: &Args, config: &Config) -> Result<()> {
    let slack = SlackClient::new(&config.slack()?);
    let emails = parse_emails(&args.emails);
    if emails.is_empty() {
        return Err(Error::Usage("no valid email addresses provided".to_string()));
    }

    let failures = notify_team(&slack, &emails, config.agent_uuid());
    info!(
        "reminded {} of {} team members",
        emails.len() - failures.len(),
        emails.len()
    );

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::NotifyFailed(
            failures.into_iter().map(|(email, _)| email).collect(),
        ))
    }
}
