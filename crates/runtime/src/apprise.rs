use crate::Notifier;
use crate::program::Program;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// Sends notifications through the Apprise CLI.
///
/// URIs are handed over via `APPRISE_URLS` rather than the command line, so
/// that tokens embedded in them don't show up in the process list.
#[derive(Debug, Clone)]
pub struct Apprise {
    program: Option<Program>,
    urls: Vec<String>,
    timeout: Duration,
}

impl Apprise {
    pub fn new(urls: Vec<String>, timeout: Duration) -> Self {
        let program = match Program::discover("apprise") {
            Ok(program) => Some(program),
            Err(err) if !urls.is_empty() => {
                tracing::warn!(error = ?err, "Notifications are configured but cannot be sent");
                None
            },
            Err(_) => None,
        };
        Self { program, urls, timeout }
    }
}

#[async_trait]
impl Notifier for Apprise {
    #[instrument(skip(self, body))]
    async fn notify(&self, title: &str, body: &str) {
        let Some(program) = &self.program else {
            tracing::info!(title, "No notifier available");
            return;
        };
        if self.urls.is_empty() {
            tracing::info!(title, "No notification URIs configured");
            return;
        }
        let mut command = program.command();
        command.args(["--title", title, "--body", body]).env("APPRISE_URLS", self.urls.join(" "));
        match program.run(command, self.timeout).await {
            Ok(_) => tracing::info!(title, services = self.urls.len(), "Notification sent"),
            Err(err) => tracing::error!(title, error = ?err, "Failed to send notification"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_without_urls_sends_nothing() {
        let apprise = Apprise::new(Vec::new(), Duration::from_millis(10));
        assert!(apprise.urls.is_empty());
        // Must return without spawning anything, whether or not apprise is installed.
        apprise.notify("Update available for app:1", "body").await;
    }
}
