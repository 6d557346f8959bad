use crate::airtable::{Fields, Record};
use crate::{display_name, email_local_part};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

pub const NO_BLOCKERS: &str = "No blockers identified";
const NO_UPDATE: &str = "No update provided";

/// What a team member typed into the submit tool.
#[derive(Debug, Clone)]
pub struct StandupUpdate {
    pub email: String,
    pub yesterday: String,
    pub today: String,
    pub blockers: Option<String>,
}

impl StandupUpdate {
    pub fn new(email: &str, yesterday: &str, today: &str, blockers: Option<&str>) -> StandupUpdate {
        StandupUpdate {
            email: email.to_string(),
            yesterday: yesterday.to_string(),
            today: today.to_string(),
            blockers: blockers
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(String::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerAnalysis {
    pub has_blockers: bool,
    #[serde(default = "no_blockers_summary")]
    pub summary: String,
}

fn no_blockers_summary() -> String {
    NO_BLOCKERS.to_string()
}

impl BlockerAnalysis {
    pub fn none() -> BlockerAnalysis {
        BlockerAnalysis {
            has_blockers: false,
            summary: NO_BLOCKERS.to_string(),
        }
    }
}

/// A row as the submit flow wants to write it, before it is fitted to the
/// columns the table actually has.
#[derive(Debug, Clone)]
pub struct StandupRecord {
    pub email: String,
    pub name: String,
    pub yesterday: String,
    pub today: String,
    pub blockers: Option<String>,
    pub analysis: BlockerAnalysis,
    pub last_updated: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

impl StandupRecord {
    pub fn new(
        update: &StandupUpdate,
        analysis: BlockerAnalysis,
        now: DateTime<Utc>,
    ) -> StandupRecord {
        StandupRecord {
            email: update.email.clone(),
            name: display_name(&update.email),
            yesterday: update.yesterday.clone(),
            today: update.today.clone(),
            blockers: update.blockers.clone(),
            analysis,
            last_updated: now.date_naive(),
            timestamp: now,
        }
    }

    pub fn date_string(&self) -> String {
        self.last_updated.format("%Y-%m-%d").to_string()
    }

    /// Plain-text rendering of the whole update, for tables that only have a
    /// free-form summary column.
    pub fn summary_text(&self) -> String {
        format!(
            "STANDUP UPDATE - {date}\n\
             User: {email}\n\
             Name: {name}\n\
             \n\
             YESTERDAY:\n{yesterday}\n\
             \n\
             TODAY:\n{today}\n\
             \n\
             BLOCKERS:\n{blockers}\n\
             \n\
             BLOCKER ANALYSIS:\n\
             - Has Blockers: {has}\n\
             - Summary: {summary}\n\
             \n\
             Timestamp: {ts}",
            date = self.date_string(),
            email = self.email,
            name = self.name,
            yesterday = self.yesterday,
            today = self.today,
            blockers = self.blockers.as_deref().unwrap_or("None"),
            has = self.analysis.has_blockers,
            summary = self.analysis.summary,
            ts = self.timestamp.to_rfc3339(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub email: String,
    pub yesterday: String,
    pub today: String,
    pub blockers: Option<String>,
}

impl ReportEntry {
    pub fn from_fields(fields: &Fields) -> ReportEntry {
        let email = text(fields.get("Email")).unwrap_or_else(|| "Unknown".to_string());

        ReportEntry {
            name: email_local_part(&email).to_string(),
            yesterday: text(fields.get("Yesterday")).unwrap_or_else(|| NO_UPDATE.to_string()),
            today: text(fields.get("Today")).unwrap_or_else(|| NO_UPDATE.to_string()),
            blockers: text(fields.get("Blockers")).filter(|b| !b.is_empty()),
            email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReport {
    pub date: String,
    pub reports: Vec<ReportEntry>,
    pub has_blockers: bool,
}

impl DailyReport {
    pub fn from_records(date: NaiveDate, records: &[Record]) -> DailyReport {
        let reports: Vec<ReportEntry> = records
            .iter()
            .map(|r| ReportEntry::from_fields(&r.fields))
            .collect();

        DailyReport {
            date: date.format("%Y-%m-%d").to_string(),
            has_blockers: reports.iter().any(|r| r.blockers.is_some()),
            reports,
        }
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(fields: Value) -> Record {
        serde_json::from_value(json!({ "id": "rec", "fields": fields })).unwrap()
    }

    #[test]
    fn blank_blockers_are_dropped() {
        let update = StandupUpdate::new("a@x.io", "y", "t", Some("   "));
        assert_eq!(update.blockers, None);
    }

    #[test]
    fn report_flags_blockers_when_any_row_has_them() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let records = vec![
            record(json!({"Email": "jane.doe@example.com", "Yesterday": "a", "Today": "b"})),
            record(json!({"Email": "bob@example.com", "Blockers": "waiting on review"})),
        ];

        let report = DailyReport::from_records(date, &records);

        assert!(report.has_blockers);
        assert_eq!(report.date, "2024-03-01");
        assert_eq!(report.reports[0].name, "jane.doe");
        assert_eq!(report.reports[0].blockers, None);
        assert_eq!(report.reports[1].today, "No update provided");
    }

    #[test]
    fn empty_blockers_do_not_flag_report() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let records = vec![
            record(json!({"Email": "a@example.com", "Blockers": ""})),
            record(json!({"Blockers": null})),
        ];

        let report = DailyReport::from_records(date, &records);

        assert!(!report.has_blockers);
        assert_eq!(report.reports[1].email, "Unknown");
        assert!(DailyReport::from_records(date, &[]).reports.is_empty());
    }

    #[test]
    fn report_serializes_null_blockers() {
        let entry = ReportEntry::from_fields(&record(json!({"Email": "a@x.io"})).fields);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["blockers"], Value::Null);
    }

    #[test]
    fn summary_text_renders_whole_update() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let update = StandupUpdate::new("jane.doe@example.com", "shipped", "testing", None);
        let record = StandupRecord::new(&update, BlockerAnalysis::none(), now);

        let text = record.summary_text();

        assert!(text.starts_with("STANDUP UPDATE - 2024-03-01"));
        assert!(text.contains("Name: Jane Doe"));
        assert!(text.contains("BLOCKERS:\nNone"));
        assert!(text.contains("- Has Blockers: false"));
        assert!(text.ends_with("Timestamp: 2024-03-01T09:30:00+00:00"));
    }
}
