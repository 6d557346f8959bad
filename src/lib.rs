#[macro_use]
extern crate serde_derive;

pub mod airtable;
pub mod classify;
pub mod config;
pub mod error;
pub mod handle;
pub mod models;
pub mod schema;
pub mod slack;

pub use config::Config;
pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Part of an email address before the `@`.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// `jane.doe@example.com` becomes `Jane Doe`.
pub fn display_name(email: &str) -> String {
    email_local_part(email)
        .split('.')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Logs go to stderr so stdout stays free for tool output.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Prints the error, plus troubleshooting hints where we have them, and
/// exits with a failure status.
pub fn exit_with(err: &Error) -> ! {
    eprintln!("Error: {}", err);
    if let Some(hints) = err.hints() {
        eprintln!("\n{}", hints);
    }
    std::process::exit(1)
}
