use chrono::Utc;
use clap::Parser;
use standup_bot::airtable::Table;
use standup_bot::handle::report;
use standup_bot::{exit_with, init_tracing, Config, Result};

/// Print today's standup submissions as JSON
#[derive(Parser)]
#[command(name = "standup-report", version)]
struct Args {}

fn main() {
    Args::parse();
    let config = Config::from_env();
    init_tracing();

    if let Err(e) = run(&config) {
        exit_with(&e);
    }
}

fn run(config: &Config) -> Result<()> {
    let table = Table::new(&config.airtable()?);
    let daily = report(&table, config.date_field(), Utc::now().date_naive())?;
    println!("{}", serde_json::to_string_pretty(&daily)?);
    Ok(())
}
