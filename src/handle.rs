use crate::airtable::{quote, ListQuery, Record, Table};
use crate::classify::{self, Completion};
use crate::models::{BlockerAnalysis, DailyReport, StandupRecord, StandupUpdate};
use crate::schema::{self, TableSchema, EMAIL};
use crate::slack::SlackClient;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

pub fn report(table: &Table, date_field: &str, date: NaiveDate) -> Result<DailyReport> {
    let day = date.format("%Y-%m-%d").to_string();
    let formula = format!(
        "DATETIME_FORMAT({{{}}}, 'YYYY-MM-DD') = {}",
        date_field,
        quote(&day)
    );

    let records = table.list(&ListQuery::filter(formula))?;
    info!("retrieved {} standup reports for {}", records.len(), day);

    Ok(DailyReport::from_records(date, &records))
}

/// Splits arguments such as `"a@x.io, b@x.io" "c@x.io"` into addresses.
pub fn parse_emails<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(String::from)
        .collect()
}

pub fn notify_user(slack: &SlackClient, email: &str, agent_uuid: &str) -> Result<()> {
    slack.send_reminder(email, agent_uuid)?;
    info!("sent standup reminder to {}", email);
    Ok(())
}

/// Reminds everyone in `emails`, carrying on past individual failures.
/// Returns the addresses that could not be notified.
pub fn notify_team(
    slack: &SlackClient,
    emails: &[String],
    agent_uuid: &str,
) -> Vec<(String, Error)> {
    let mut failures = Vec::new();

    for email in emails {
        if let Err(e) = notify_user(slack, email, agent_uuid) {
            warn!("failed to notify {}: {}", email, e);
            failures.push((email.clone(), e));
        }
    }

    failures
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    Created(String),
    Updated(String),
}

#[derive(Debug)]
pub struct SubmitOutcome {
    pub upsert: Upsert,
    pub analysis: BlockerAnalysis,
}

/// Collaborators for one standup submission.
pub struct Submitter<'a> {
    pub table: &'a Table,
    pub slack: Option<&'a SlackClient>,
    pub completion: Option<&'a dyn Completion>,
    pub scrum_master_email: Option<&'a str>,
}

impl<'a> Submitter<'a> {
    pub fn submit(
        &self,
        update: &StandupUpdate,
        notify: bool,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        let schema = discover_schema(self.table);

        info!("analyzing standup update for blockers");
        let analysis = classify::analyze(self.completion, update);

        let record = StandupRecord::new(update, analysis.clone(), now);
        let fields = schema::build_payload(&schema, &record);
        info!(
            "record data to submit: {:?}",
            fields.keys().collect::<Vec<_>>()
        );

        let existing = if schema.contains(EMAIL) {
            find_existing(self.table, &update.email)
        } else {
            info!("email field not available, will create new record");
            None
        };

        let upsert = match existing {
            Some(record) => {
                info!("updating existing record {} for {}", record.id, update.email);
                let updated = self.table.update(&record.id, &fields)?;
                Upsert::Updated(updated.id)
            }
            None => {
                info!("creating new record for {}", update.email);
                let created = self.table.create(&fields)?;
                Upsert::Created(created.id)
            }
        };

        if analysis.has_blockers {
            info!("blockers detected: {}", analysis.summary);
            self.escalate(&update.email, &analysis.summary);
        }

        if notify {
            self.confirm(&update.email);
        }

        Ok(SubmitOutcome { upsert, analysis })
    }

    fn escalate(&self, member_email: &str, summary: &str) {
        let (slack, scrum_master) = match (self.slack, self.scrum_master_email) {
            (Some(slack), Some(scrum_master)) => (slack, scrum_master),
            _ => {
                info!("skipping scrum master notification: SLACK_API_TOKEN or SCRUM_MASTER_EMAIL not provided");
                return;
            }
        };

        match slack.send_escalation(scrum_master, member_email, summary) {
            Ok(()) => info!("notified scrum master about blocker from {}", member_email),
            Err(e) => warn!("failed to notify scrum master: {}", e),
        }
    }

    fn confirm(&self, email: &str) {
        let slack = match self.slack {
            Some(slack) => slack,
            None => {
                info!("skipping confirmation: SLACK_API_TOKEN not provided");
                return;
            }
        };

        match slack.send_confirmation(email) {
            Ok(()) => info!("sent confirmation to {}", email),
            Err(e) => warn!("failed to send confirmation: {}", e),
        }
    }
}

/// Columns currently in the table; empty when the table can't be sampled.
pub fn discover_schema(table: &Table) -> TableSchema {
    match TableSchema::discover(table) {
        Ok(schema) => {
            if schema.is_empty() {
                info!("table is empty, will create first record");
            } else {
                info!(
                    "current table fields: {}",
                    schema.iter().collect::<Vec<_>>().join(", ")
                );
            }
            schema
        }
        Err(e) => {
            warn!("could not inspect table structure: {}", e);
            TableSchema::default()
        }
    }
}

/// The row already holding `email`, if any. Falls back to scanning the
/// whole table when the formula lookup is rejected.
pub fn find_existing(table: &Table, email: &str) -> Option<Record> {
    let formula = format!("{{{}}} = {}", EMAIL, quote(email));

    let matches = match table.list(&ListQuery::filter(formula)) {
        Ok(records) => records,
        Err(e) => {
            warn!("error checking for existing records: {}", e);
            match table.list(&ListQuery::default()) {
                Ok(all) => all
                    .into_iter()
                    .filter(|r| r.fields.get(EMAIL).and_then(|v| v.as_str()) == Some(email))
                    .collect(),
                Err(e) => {
                    warn!("manual search also failed: {}", e);
                    Vec::new()
                }
            }
        }
    };

    info!("found {} existing records for {}", matches.len(), email);
    matches.into_iter().next()
}
