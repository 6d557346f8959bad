use chrono::Utc;
use clap::Parser;
use standup_bot::airtable::Table;
use standup_bot::classify::{ChatCompletion, Completion};
use standup_bot::handle::{Submitter, Upsert};
use standup_bot::models::StandupUpdate;
use standup_bot::slack::SlackClient;
use standup_bot::{exit_with, init_tracing, Config, Result};
use tracing::{info, warn};

/// Submit a standup update to the team's Airtable table
#[derive(Parser)]
#[command(name = "standup-submit", version)]
struct Args {
    /// What was accomplished yesterday
    #[arg(long)]
    yesterday: String,

    /// What is planned for today
    #[arg(long)]
    today: String,

    /// Any blockers
    #[arg(long)]
    blockers: Option<String>,

    /// Send a confirmation via Slack
    #[arg(long)]
    notify: bool,
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
    let airtable = config.airtable()?;
    let email = config.user_email()?;
    info!(
        "connecting to airtable base: {}, table: {}",
        airtable.base_id, airtable.table_id
    );

    let table = Table::new(&airtable);
    let slack = config.slack_opt().map(|c| SlackClient::new(&c));
    let completion = match config.llm() {
        Some(llm) => match ChatCompletion::new(llm, Some(&email)) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("completion client unavailable: {}", e);
                None
            }
        },
        None => None,
    };

    let submitter = Submitter {
        table: &table,
        slack: slack.as_ref(),
        completion: completion.as_ref().map(|c| c as &dyn Completion),
        scrum_master_email: config.scrum_master_email(),
    };
    let update = StandupUpdate::new(&email, &args.yesterday, &args.today, args.blockers.as_deref());

    let outcome = submitter.submit(&update, args.notify, Utc::now())?;
    match outcome.upsert {
        Upsert::Updated(id) => println!("Updated standup record {} for {}", id, email),
        Upsert::Created(id) => println!("Created standup record {} for {}", id, email),
    }

    Ok(())
}
