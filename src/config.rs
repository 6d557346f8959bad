use crate::{Error, Result};
use dotenv::dotenv;
use std::env;

const AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";
const SLACK_API_URL: &str = "https://slack.com/api";
const LLM_BASE_URL: &str = "https://api.openai.com/v1";
const LLM_MODEL: &str = "Llama-4-Scout";
// Column the submit tool writes. Tables keyed on a `Date` column set
// STANDUP_DATE_FIELD=Date instead.
const DATE_FIELD: &str = "Last_Updated";

#[derive(Debug, Clone)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub table_id: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub token: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Everything the tools read from the environment, gathered in one place.
/// Required values are checked by the accessors, so each binary only fails
/// on what it actually needs.
#[derive(Debug, Clone)]
pub struct Config {
    airtable_api_key: Option<String>,
    airtable_base_id: Option<String>,
    airtable_table_id: Option<String>,
    airtable_api_url: String,
    date_field: String,
    slack_token: Option<String>,
    slack_api_url: String,
    scrum_master_email: Option<String>,
    agent_uuid: String,
    user_email: Option<String>,
    llm: Option<LlmConfig>,
}

impl Config {
    pub fn from_env() -> Config {
        dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        // blank values count as unset
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let llm_api_key = get("LLM_API_KEY");
        let llm_base_url = get("LLM_BASE_URL");
        let llm = if llm_api_key.is_some() || llm_base_url.is_some() {
            Some(LlmConfig {
                api_key: llm_api_key,
                base_url: llm_base_url.unwrap_or_else(|| LLM_BASE_URL.to_string()),
                model: get("LLM_MODEL").unwrap_or_else(|| LLM_MODEL.to_string()),
            })
        } else {
            None
        };

        Config {
            airtable_api_key: get("AIRTABLE_API_KEY"),
            airtable_base_id: get("AIRTABLE_BASE_ID"),
            airtable_table_id: get("AIRTABLE_TABLE_ID").or_else(|| get("AIRTABLE_TABLE_NAME")),
            airtable_api_url: get("AIRTABLE_API_URL")
                .unwrap_or_else(|| AIRTABLE_API_URL.to_string()),
            date_field: get("STANDUP_DATE_FIELD").unwrap_or_else(|| DATE_FIELD.to_string()),
            slack_token: get("SLACK_API_TOKEN"),
            slack_api_url: get("SLACK_API_URL").unwrap_or_else(|| SLACK_API_URL.to_string()),
            scrum_master_email: get("SCRUM_MASTER_EMAIL"),
            agent_uuid: get("KUBIYA_AGENT_UUID").unwrap_or_default(),
            user_email: get("KUBIYA_USER_EMAIL"),
            llm,
        }
    }

    pub fn airtable(&self) -> Result<AirtableConfig> {
        Ok(AirtableConfig {
            api_key: require(&self.airtable_api_key, "AIRTABLE_API_KEY")?,
            base_id: require(&self.airtable_base_id, "AIRTABLE_BASE_ID")?,
            table_id: require(&self.airtable_table_id, "AIRTABLE_TABLE_ID")?,
            api_url: self.airtable_api_url.clone(),
        })
    }

    pub fn slack(&self) -> Result<SlackConfig> {
        Ok(SlackConfig {
            token: require(&self.slack_token, "SLACK_API_TOKEN")?,
            api_url: self.slack_api_url.clone(),
        })
    }

    /// Slack settings for the best-effort messages that are skipped without a token.
    pub fn slack_opt(&self) -> Option<SlackConfig> {
        self.slack().ok()
    }

    pub fn user_email(&self) -> Result<String> {
        require(&self.user_email, "KUBIYA_USER_EMAIL")
    }

    pub fn llm(&self) -> Option<&LlmConfig> {
        self.llm.as_ref()
    }

    pub fn scrum_master_email(&self) -> Option<&str> {
        self.scrum_master_email.as_deref()
    }

    pub fn agent_uuid(&self) -> &str {
        &self.agent_uuid
    }

    pub fn date_field(&self) -> &str {
        &self.date_field
    }
}

fn require(value: &Option<String>, name: &'static str) -> Result<String> {
    value.clone().ok_or(Error::MissingConfig(name))
}

#[cfg(test)]
mod test {
    use super::Config;
    use crate::Error;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn airtable_requires_every_credential() {
        let c = config(&[("AIRTABLE_API_KEY", "key"), ("AIRTABLE_BASE_ID", "app1")]);
        match c.airtable() {
            Err(Error::MissingConfig(name)) => assert_eq!(name, "AIRTABLE_TABLE_ID"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn table_name_is_accepted_for_table_id() {
        let c = config(&[
            ("AIRTABLE_API_KEY", "key"),
            ("AIRTABLE_BASE_ID", "app1"),
            ("AIRTABLE_TABLE_NAME", "Standups"),
        ]);
        let airtable = c.airtable().unwrap();
        assert_eq!(airtable.table_id, "Standups");
        assert_eq!(airtable.api_url, "https://api.airtable.com/v0");
    }

    #[test]
    fn blank_values_are_unset() {
        let c = config(&[("SLACK_API_TOKEN", "  "), ("SCRUM_MASTER_EMAIL", "")]);
        assert!(c.slack_opt().is_none());
        assert!(c.scrum_master_email().is_none());
        assert_eq!(c.agent_uuid(), "");
    }

    #[test]
    fn llm_is_optional() {
        assert!(config(&[]).llm().is_none());

        let c = config(&[("LLM_API_KEY", "sk-test")]);
        let llm = c.llm().unwrap();
        assert_eq!(llm.base_url, "https://api.openai.com/v1");
        assert_eq!(llm.model, "Llama-4-Scout");
    }

    #[test]
    fn date_field_defaults_to_last_updated() {
        assert_eq!(config(&[]).date_field(), "Last_Updated");
        assert_eq!(config(&[("STANDUP_DATE_FIELD", "Date")]).date_field(), "Date");
    }
}
