use crate::config::AirtableConfig;
use crate::error::ensure_success;
use crate::Result;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Map, Value};
use tracing::debug;

const SERVICE: &str = "airtable";

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Deserialize)]
struct ListResponse {
    records: Vec<Record>,
    offset: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ListQuery {
    pub formula: Option<String>,
    pub max_records: Option<usize>,
}

impl ListQuery {
    pub fn filter(formula: impl Into<String>) -> ListQuery {
        ListQuery {
            formula: Some(formula.into()),
            max_records: None,
        }
    }

    pub fn sample(max_records: usize) -> ListQuery {
        ListQuery {
            formula: None,
            max_records: Some(max_records),
        }
    }
}

/// One table of an Airtable base.
pub struct Table {
    client: Client,
    api_key: String,
    url: String,
}

impl Table {
    pub fn new(config: &AirtableConfig) -> Table {
        Table {
            client: Client::new(),
            api_key: config.api_key.clone(),
            url: format!(
                "{}/{}/{}",
                config.api_url.trim_end_matches('/'),
                config.base_id,
                config.table_id
            ),
        }
    }

    /// Lists every record matching the query, following `offset` pages.
    pub fn list(&self, query: &ListQuery) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = Vec::new();
            if let Some(formula) = &query.formula {
                params.push(("filterByFormula", formula.clone()));
            }
            if let Some(max) = query.max_records {
                params.push(("maxRecords", max.to_string()));
            }
            if let Some(o) = &offset {
                params.push(("offset", o.clone()));
            }

            let resp = self
                .client
                .get(&self.url)
                .query(&params)
                .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
                .send()?;
            let page: ListResponse = ensure_success(SERVICE, resp)?.json()?;
            debug!(count = page.records.len(), "fetched airtable page");
            records.extend(page.records);

            match page.offset {
                Some(next) if query.max_records.map_or(true, |max| records.len() < max) => {
                    offset = Some(next)
                }
                _ => break,
            }
        }

        Ok(records)
    }

    pub fn create(&self, fields: &Fields) -> Result<Record> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "fields": fields }))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()?;
        Ok(ensure_success(SERVICE, resp)?.json()?)
    }

    pub fn update(&self, record_id: &str, fields: &Fields) -> Result<Record> {
        let resp = self
            .client
            .patch(&format!("{}/{}", self.url, record_id))
            .json(&json!({ "fields": fields }))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()?;
        Ok(ensure_success(SERVICE, resp)?.json()?)
    }
}

/// Formula string literal, escaped for single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
