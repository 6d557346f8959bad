use reqwest::blocking::Response;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} environment variable not set")]
    MissingConfig(&'static str),

    #[error("{service} request failed with status {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("slack responded with error: {0}")]
    Slack(String),

    #[error("unexpected response from {service}: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },

    #[error("completion service not configured")]
    CompletionUnavailable,

    #[error("{0}")]
    Usage(String),

    #[error("failed to notify: {}", .0.join(", "))]
    NotifyFailed(Vec<String>),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

const UNKNOWN_FIELD_HINTS: &str = "Troubleshooting 422 Unknown Field Error:
The table doesn't have the expected fields. You need to either:
1. Add the required fields to your Airtable table:
   - Email (Single line text)
   - Name (Single line text)
   - Yesterday (Long text)
   - Today (Long text)
   - Blockers (Long text)
   - Last_Updated (Date)
   - Timestamp (Single line text)
   - Has_Blockers (Checkbox)
   - Blocker_Summary (Long text)
2. Or add an \"Attachment Summary\" long text field to store the full update";

const FORBIDDEN_HINTS: &str = "Troubleshooting 403 Forbidden Error:
1. Verify your AIRTABLE_API_KEY has the correct permissions
2. Check that the AIRTABLE_BASE_ID is correct
3. Ensure the AIRTABLE_TABLE_ID exists in the base
4. Confirm your API key has read/write access to the table";

const NOT_FOUND_HINTS: &str = "Troubleshooting 404 Not Found Error:
1. Verify the AIRTABLE_BASE_ID is correct
2. Check that the AIRTABLE_TABLE_ID exists
3. Ensure the base is accessible with your API key";

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Troubleshooting text for the storage failures users hit most often.
    pub fn hints(&self) -> Option<&'static str> {
        match self.status() {
            Some(422) => Some(UNKNOWN_FIELD_HINTS),
            Some(403) => Some(FORBIDDEN_HINTS),
            Some(404) => Some(NOT_FOUND_HINTS),
            _ => None,
        }
    }
}

/// Turns a non-2xx response into `Error::Api`, keeping the body for diagnostics.
pub(crate) fn ensure_success(service: &'static str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(Error::Api {
            service,
            status: status.as_u16(),
            body: resp.text().unwrap_or_default(),
        })
    }
}
