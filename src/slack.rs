use crate::config::SlackConfig;
use crate::error::ensure_success;
use crate::{display_name, Error, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use tracing::debug;

const SERVICE: &str = "slack";
pub const REMINDER_ACTION_ID: &str = "agent.process_message_1";
pub const REMINDER_TRIGGER: &str = "I would like to submit my standup report";

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
    user: Option<SlackUser>,
}

#[derive(Deserialize)]
struct SlackUser {
    id: String,
}

pub struct SlackClient {
    client: Client,
    token: String,
    api_url: String,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> SlackClient {
        SlackClient {
            client: Client::new(),
            token: config.token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn lookup_user_id(&self, email: &str) -> Result<String> {
        let resp = self
            .client
            .get(&format!("{}/users.lookupByEmail", self.api_url))
            .query(&[("email", email)])
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()?;

        let body = read(resp)?;
        body.user.map(|u| u.id).ok_or_else(|| Error::Malformed {
            service: SERVICE,
            reason: "users.lookupByEmail returned no user".to_string(),
        })
    }

    pub fn post_message(&self, channel: &str, text: &str, blocks: Value) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "text": text,
            "blocks": blocks,
        });

        let resp = self
            .client
            .post(&format!("{}/chat.postMessage", self.api_url))
            .json(&payload)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()?;

        read(resp)?;
        debug!(channel, "posted slack message");
        Ok(())
    }

    pub fn send_reminder(&self, email: &str, agent_uuid: &str) -> Result<()> {
        let user_id = self.lookup_user_id(email)?;
        self.post_message(
            &user_id,
            "Daily Standup Reminder",
            reminder_blocks(&user_id, agent_uuid, Utc::now()),
        )
    }

    pub fn send_escalation(
        &self,
        scrum_master_email: &str,
        member_email: &str,
        summary: &str,
    ) -> Result<()> {
        let scrum_master_id = self.lookup_user_id(scrum_master_email)?;
        self.post_message(
            &scrum_master_id,
            "Team Member Has Blocker",
            escalation_blocks(member_email, summary, Utc::now()),
        )
    }

    pub fn send_confirmation(&self, email: &str) -> Result<()> {
        let user_id = self.lookup_user_id(email)?;
        self.post_message(
            &user_id,
            "Standup Submitted",
            confirmation_blocks(&user_id, Utc::now()),
        )
    }
}

// Slack reports most failures as 200 with `ok: false`.
fn read(resp: reqwest::blocking::Response) -> Result<SlackResponse> {
    let body: SlackResponse = ensure_success(SERVICE, resp)?.json()?;
    if body.ok {
        Ok(body)
    } else {
        Err(Error::Slack(
            body.error.unwrap_or_else(|| "unknown_error".to_string()),
        ))
    }
}

fn header(text: &str) -> Value {
    json!({
        "type": "header",
        "text": { "type": "plain_text", "text": text, "emoji": true }
    })
}

fn section(text: &str) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text }
    })
}

fn divider() -> Value {
    json!({ "type": "divider" })
}

fn timestamp_context(now: DateTime<Utc>) -> Value {
    json!({
        "type": "context",
        "elements": [{
            "type": "mrkdwn",
            "text": format!("🕒 {}", now.format("%Y-%m-%d %H:%M:%S UTC"))
        }]
    })
}

pub fn reminder_blocks(user_id: &str, agent_uuid: &str, now: DateTime<Utc>) -> Value {
    let button_value = json!({
        "agent_uuid": agent_uuid,
        "message": REMINDER_TRIGGER,
    });

    json!([
        header(":memo: Daily Standup Reminder"),
        section(&format!("Hi <@{}> :wave:", user_id)),
        section("It's time for your daily standup report! Please share what you've been working on."),
        divider(),
        section(":rocket: *Ready to submit your standup?*\nClick the button below to start your standup report!"),
        {
            "type": "actions",
            "elements": [{
                "type": "button",
                "text": { "type": "plain_text", "text": "🚀 Submit Standup Report", "emoji": true },
                "style": "primary",
                "value": button_value.to_string(),
                "action_id": REMINDER_ACTION_ID
            }]
        },
        divider(),
        timestamp_context(now),
    ])
}

pub fn escalation_blocks(member_email: &str, summary: &str, now: DateTime<Utc>) -> Value {
    json!([
        header(":warning: Team Member Has Blocker"),
        section(&format!(
            "*Team Member:* {} ({})",
            display_name(member_email),
            member_email
        )),
        section(&format!("*Blocker Summary:*\n{}", summary)),
        divider(),
        section(":point_right: *Action Required:* Please follow up with the team member to help resolve this blocker."),
        timestamp_context(now),
    ])
}

pub fn confirmation_blocks(user_id: &str, now: DateTime<Utc>) -> Value {
    json!([
        header(":white_check_mark: Standup Submitted"),
        section(&format!(
            "Thanks <@{}>! Your standup update has been recorded.",
            user_id
        )),
        divider(),
        timestamp_context(now),
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> SlackClient {
        SlackClient::new(&SlackConfig {
            token: "xoxb-test".to_string(),
            api_url: server.url(),
        })
    }

    #[test]
    fn lookup_returns_user_id() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/users.lookupByEmail")
            .match_query(Matcher::UrlEncoded("email".into(), "jane@x.io".into()))
            .match_header("authorization", "Bearer xoxb-test")
            .with_body(r#"{"ok": true, "user": {"id": "U123"}}"#)
            .create();

        assert_eq!(client_for(&server).lookup_user_id("jane@x.io").unwrap(), "U123");
        mock.assert();
    }

    #[test]
    fn not_ok_response_is_an_error() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/users.lookupByEmail")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": false, "error": "users_not_found"}"#)
            .create();

        match client_for(&server).lookup_user_id("ghost@x.io") {
            Err(Error::Slack(e)) => assert_eq!(e, "users_not_found"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn non_200_response_is_an_error() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("POST", "/chat.postMessage")
            .with_status(500)
            .with_body("oops")
            .create();

        let err = client_for(&server)
            .post_message("U1", "hi", json!([]))
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn reminder_posts_to_looked_up_user() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/users.lookupByEmail")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": true, "user": {"id": "U42"}}"#)
            .create();
        let post = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::PartialJson(json!({"channel": "U42"})))
            .with_body(r#"{"ok": true}"#)
            .create();

        client_for(&server).send_reminder("jane@x.io", "agent-1").unwrap();
        post.assert();
    }

    #[test]
    fn reminder_button_carries_agent_and_trigger() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        let blocks = reminder_blocks("U42", "agent-1", now);

        let actions = &blocks[5];
        assert_eq!(actions["type"], "actions");
        let button = &actions["elements"][0];
        assert_eq!(button["action_id"], REMINDER_ACTION_ID);
        let value: Value = serde_json::from_str(button["value"].as_str().unwrap()).unwrap();
        assert_eq!(value, json!({"agent_uuid": "agent-1", "message": REMINDER_TRIGGER}));

        assert_eq!(blocks[1]["text"]["text"], "Hi <@U42> :wave:");
        assert_eq!(blocks[7]["elements"][0]["text"], "🕒 2024-03-01 09:05:07 UTC");
    }

    #[test]
    fn escalation_names_team_member() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let blocks = escalation_blocks("jane.doe@example.com", "waiting on X", now);

        assert_eq!(
            blocks[1]["text"]["text"],
            "*Team Member:* Jane Doe (jane.doe@example.com)"
        );
        assert_eq!(blocks[2]["text"]["text"], "*Blocker Summary:*\nwaiting on X");
    }
}
