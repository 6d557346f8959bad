use crate::airtable::{Fields, ListQuery, Record, Table};
use crate::models::StandupRecord;
use crate::Result;
use serde_json::Value;
use std::collections::BTreeSet;

pub const SAMPLE_SIZE: usize = 3;
pub const EMAIL: &str = "Email";
pub const ATTACHMENT_SUMMARY: &str = "Attachment Summary";

type Writer = fn(&StandupRecord) -> Value;

/// Columns a standup row may carry, and how each is filled in.
pub const COLUMNS: [(&str, Writer); 9] = [
    (EMAIL, |r| Value::from(r.email.as_str())),
    ("Name", |r| Value::from(r.name.as_str())),
    ("Yesterday", |r| Value::from(r.yesterday.as_str())),
    ("Today", |r| Value::from(r.today.as_str())),
    ("Last_Updated", |r| Value::from(r.date_string())),
    ("Timestamp", |r| Value::from(r.timestamp.to_rfc3339())),
    ("Has_Blockers", |r| Value::from(r.analysis.has_blockers)),
    ("Blocker_Summary", |r| Value::from(r.analysis.summary.as_str())),
    ("Blockers", |r| Value::from(r.blockers.as_deref().unwrap_or(""))),
];

/// Column names seen in the table. Airtable omits empty cells from a
/// record, so this is the union over the sampled rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    fields: BTreeSet<String>,
}

impl TableSchema {
    pub fn from_records(records: &[Record]) -> TableSchema {
        TableSchema {
            fields: records
                .iter()
                .flat_map(|r| r.fields.keys().cloned())
                .collect(),
        }
    }

    pub fn discover(table: &Table) -> Result<TableSchema> {
        let sample = table.list(&ListQuery::sample(SAMPLE_SIZE))?;
        Ok(TableSchema::from_records(&sample))
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

impl<S: Into<String>> std::iter::FromIterator<S> for TableSchema {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TableSchema {
            fields: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// The fields to write for `record`, restricted to columns the table has.
pub fn build_payload(schema: &TableSchema, record: &StandupRecord) -> Fields {
    let mut fields = Fields::new();

    if schema.contains(ATTACHMENT_SUMMARY) {
        fields.insert(
            ATTACHMENT_SUMMARY.to_string(),
            Value::from(record.summary_text()),
        );
    }

    for (column, write) in COLUMNS.iter() {
        if schema.contains(column) {
            fields.insert(column.to_string(), write(record));
        }
    }

    fields
}
