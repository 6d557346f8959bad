use crate::config::LlmConfig;
use crate::error::ensure_success;
use crate::models::{BlockerAnalysis, StandupUpdate, NO_BLOCKERS};
use crate::{Error, Result};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use tracing::{info, warn};

const SERVICE: &str = "completion";
const TIMEOUT: Duration = Duration::from_secs(30);

pub const SYSTEM_PROMPT: &str = "You are a scrum master assistant that analyzes standup updates to identify blockers. Always respond with valid JSON.";

pub const BLOCKER_KEYWORDS: [&str; 9] = [
    "blocked",
    "blocker",
    "impediment",
    "waiting for",
    "can't",
    "unable",
    "stuck",
    "issue",
    "problem",
];

/// Something that can answer a chat prompt with free-form text.
pub trait Completion {
    fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletion {
    client: Client,
    config: LlmConfig,
    user: Option<String>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    presence_penalty: f32,
    frequency_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletion {
    pub fn new(config: &LlmConfig, user: Option<&str>) -> Result<ChatCompletion> {
        Ok(ChatCompletion {
            client: Client::builder().timeout(TIMEOUT).build()?,
            config: config.clone(),
            user: user.map(String::from),
        })
    }
}

impl Completion for ChatCompletion {
    fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.1,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            user: self.user.as_deref(),
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let resp: ChatResponse = ensure_success(SERVICE, builder.send()?)?.json()?;
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| Error::Malformed {
                service: SERVICE,
                reason: "no message content in completion".to_string(),
            })
    }
}

pub fn analysis_prompt(update: &StandupUpdate) -> String {
    format!(
        r#"Analyze this standup update to determine if the user has any blockers that need scrum master attention.

Yesterday: {yesterday}
Today: {today}
Blockers mentioned: {blockers}

Please analyze if there are any blockers, impediments, or issues that would require scrum master intervention or team awareness. Look for:
- Explicit mentions of blockers or impediments
- Dependencies on other team members
- Technical issues preventing progress
- Resource constraints
- Waiting for external approvals or decisions

Respond with a JSON object containing:
- "has_blockers": true/false
- "summary": brief description of the blockers if any, or "No blockers identified" if none

Example response:
{{"has_blockers": true, "summary": "Waiting for DevOps team to provision database access"}}"#,
        yesterday = update.yesterday,
        today = update.today,
        blockers = update
            .blockers
            .as_deref()
            .unwrap_or("None explicitly mentioned"),
    )
}

/// Reads a completion as a `BlockerAnalysis` object, allowing for a
/// markdown code fence around it.
pub fn parse_analysis(text: &str) -> Option<BlockerAnalysis> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).ok()
}

/// Best guess from a completion that wasn't valid JSON.
pub fn response_heuristic(text: &str) -> BlockerAnalysis {
    let lower = text.to_lowercase();
    let has_blockers =
        lower.contains("true") && (lower.contains("blocker") || lower.contains("impediment"));

    BlockerAnalysis {
        has_blockers,
        summary: if has_blockers {
            text.to_string()
        } else {
            NO_BLOCKERS.to_string()
        },
    }
}

pub fn keyword_analysis(update: &StandupUpdate) -> BlockerAnalysis {
    let haystack = format!(
        "{} {} {}",
        update.yesterday,
        update.today,
        update.blockers.as_deref().unwrap_or("")
    )
    .to_lowercase();
    let has_blockers = BLOCKER_KEYWORDS.iter().any(|k| haystack.contains(k));

    BlockerAnalysis {
        has_blockers,
        summary: match &update.blockers {
            Some(b) if has_blockers => b.clone(),
            _ => NO_BLOCKERS.to_string(),
        },
    }
}

/// Decides whether an update needs scrum master attention. Asks the
/// completion service first; a reply that isn't JSON is scanned for
/// blocker words, and a failed or missing service falls back to keyword
/// matching on the update itself. Never fails.
pub fn analyze(completion: Option<&dyn Completion>, update: &StandupUpdate) -> BlockerAnalysis {
    let reply = completion
        .ok_or(Error::CompletionUnavailable)
        .and_then(|c| c.complete(SYSTEM_PROMPT, &analysis_prompt(update)));

    match reply {
        Ok(text) => parse_analysis(&text).unwrap_or_else(|| {
            info!("completion was not JSON, scanning reply text");
            response_heuristic(&text)
        }),
        Err(e) => {
            warn!("failed to analyze blockers with completion service: {}", e);
            keyword_analysis(update)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::LlmConfig;
    use serde_json::json;

    struct Fixed(&'static str);

    impl Completion for Fixed {
        fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl Completion for Failing {
        fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
            Err(Error::Malformed {
                service: SERVICE,
                reason: "boom".to_string(),
            })
        }
    }

    fn update(blockers: Option<&str>, today: &str) -> StandupUpdate {
        StandupUpdate::new("jane.doe@example.com", "reviewed PRs", today, blockers)
    }

    #[test]
    fn json_reply_is_returned_as_is() {
        let reply = Fixed(r#"{"has_blockers": true, "summary": "waiting on X"}"#);

        let analysis = analyze(Some(&reply), &update(None, "coding"));

        assert_eq!(
            analysis,
            BlockerAnalysis {
                has_blockers: true,
                summary: "waiting on X".to_string(),
            }
        );
    }

    #[test]
    fn fenced_json_reply_is_parsed() {
        let reply = Fixed("```json\n{\"has_blockers\": false, \"summary\": \"No blockers identified\"}\n```");

        let analysis = analyze(Some(&reply), &update(Some("stuck"), "coding"));

        assert_eq!(analysis, BlockerAnalysis::none());
    }

    #[test]
    fn json_reply_without_summary_gets_default() {
        let reply = Fixed(r#"{"has_blockers": true}"#);

        let analysis = analyze(Some(&reply), &update(None, "coding"));

        assert!(analysis.has_blockers);
        assert_eq!(analysis.summary, NO_BLOCKERS);
    }

    #[test]
    fn non_json_reply_uses_text_heuristic() {
        let text = "has_blockers: true, there is a blocker with the database";

        let analysis = analyze(Some(&Fixed(text)), &update(None, "coding"));

        assert!(analysis.has_blockers);
        assert_eq!(analysis.summary, text);
    }

    #[test]
    fn non_json_reply_without_markers_is_clear() {
        let analysis = analyze(Some(&Fixed("all good")), &update(Some("stuck"), "coding"));
        assert_eq!(analysis, BlockerAnalysis::none());
    }

    #[test]
    fn failed_completion_falls_back_to_keywords() {
        let analysis = analyze(Some(&Failing), &update(None, "I'm stuck on the migration"));

        assert!(analysis.has_blockers);
        assert_eq!(analysis.summary, "No blockers identified");
    }

    #[test]
    fn missing_completion_falls_back_to_keywords() {
        let analysis = analyze(None, &update(Some("Waiting for DevOps access"), "deploys"));

        assert!(analysis.has_blockers);
        assert_eq!(analysis.summary, "Waiting for DevOps access");

        assert_eq!(analyze(None, &update(None, "writing docs")), BlockerAnalysis::none());
    }

    #[test]
    fn prompt_mentions_missing_blockers() {
        let prompt = analysis_prompt(&update(None, "coding"));
        assert!(prompt.contains("Blockers mentioned: None explicitly mentioned"));
        assert!(prompt.contains(r#"{"has_blockers": true, "summary": "#));
    }

    #[test]
    fn chat_completion_posts_openai_request() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "Llama-4-Scout",
                "max_tokens": 2048,
                "user": "jane.doe@example.com",
                "top_p": 0.1
            })))
            .with_body(
                json!({"choices": [{"message": {"role": "assistant", "content": " {\"has_blockers\": false, \"summary\": \"none\"} "}}]})
                    .to_string(),
            )
            .create();
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            base_url: server.url(),
            model: "Llama-4-Scout".to_string(),
        };

        let completion = ChatCompletion::new(&config, Some("jane.doe@example.com")).unwrap();
        let text = completion.complete(SYSTEM_PROMPT, "prompt").unwrap();

        mock.assert();
        assert_eq!(text, r#"{"has_blockers": false, "summary": "none"}"#);
    }
}
