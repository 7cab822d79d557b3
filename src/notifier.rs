use crate::constants::MESSAGE_WRAP_WIDTH;
use crate::transport::Transport;
use crate::types::{LogicalRecord, Watcher};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryTally {
    pub sent: usize,
    pub failed: usize,
}

impl DeliveryTally {
    pub fn absorb(&mut self, other: DeliveryTally) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

/// Formats and delivers one message per (record, watcher). Single-shot, no retry.
pub struct Notifier {
    transport: Arc<dyn Transport>,
    subject: String,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>, subject: impl Into<String>) -> Self {
        Self {
            transport,
            subject: subject.into(),
        }
    }

    pub async fn notify(&self, watcher: &Watcher, record: &LogicalRecord) -> DeliveryOutcome {
        let body = format_message(watcher, record);
        match self
            .transport
            .deliver(&watcher.email, &self.subject, &body)
            .await
        {
            Ok(()) => {
                info!(
                    "Notified {} about {}",
                    watcher.email,
                    record.case_number.as_deref().unwrap_or_default()
                );
                DeliveryOutcome::Sent
            }
            Err(e) => {
                warn!("Failed to notify {}: {}", watcher.email, e);
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }

    /// Deliver to every watcher; a failed recipient never stops the rest.
    pub async fn notify_all(
        &self,
        watchers: &BTreeSet<Watcher>,
        record: &LogicalRecord,
    ) -> DeliveryTally {
        let mut tally = DeliveryTally::default();
        for watcher in watchers {
            match self.notify(watcher, record).await {
                DeliveryOutcome::Sent => tally.sent += 1,
                DeliveryOutcome::Failed(_) => tally.failed += 1,
            }
        }
        tally
    }
}

/// Plain-text notification body.
pub fn format_message(watcher: &Watcher, record: &LogicalRecord) -> String {
    let case = record.case_number.as_deref().unwrap_or_default();
    format!(
        "Dear {name},\n\n\
         {case} has been mentioned in today's Cause List.\n\n\
         Main Parties:\n{parties}\n\n\
         Petitioner Advocates:\n{petitioners}\n\n\
         Respondent Advocates:\n{respondents}\n",
        name = watcher.name,
        case = case,
        parties = fill(&record.parties, MESSAGE_WRAP_WIDTH),
        petitioners = fill(&record.petitioner_advocates.join(", "), MESSAGE_WRAP_WIDTH),
        respondents = fill(&record.respondent_advocates.join(", "), MESSAGE_WRAP_WIDTH),
    )
}

/// Greedy word wrap. Words longer than `width` are split.
fn fill(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let line_len = line.chars().count();
            let needed = if line.is_empty() { word.len() } else { line_len + 1 + word.len() };
            if needed <= width {
                if !line.is_empty() {
                    line.push(' ');
                }
                line.extend(word.iter());
                break;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                continue;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CauseListError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FlakyTransport {
        fail_for: String,
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn deliver(&self, address: &str, _subject: &str, _body: &str) -> Result<()> {
            self.attempts.lock().unwrap().push(address.to_string());
            if address == self.fail_for {
                return Err(CauseListError::Delivery {
                    address: address.to_string(),
                    message: "mailbox unavailable".into(),
                });
            }
            Ok(())
        }
    }

    fn watcher(name: &str, email: &str) -> Watcher {
        Watcher {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    fn record() -> LogicalRecord {
        LogicalRecord {
            sequence_number: "1".into(),
            case_number: Some("WP(C)/1234/2024".into()),
            parties: "RAM KUMAR vs THE STATE OF ASSAM".into(),
            petitioner_advocates: vec!["Adv1".into(), "Adv2".into()],
            respondent_advocates: vec!["GA, ASSAM".into()],
        }
    }

    #[test]
    fn test_message_layout() {
        let body = format_message(&watcher("Asha", "asha@example.com"), &record());
        assert!(body.starts_with("Dear Asha,\n\nWP(C)/1234/2024 has been mentioned in today's Cause List."));
        assert!(body.contains("Main Parties:\nRAM KUMAR vs THE STATE OF ASSAM\n"));
        assert!(body.contains("Petitioner Advocates:\nAdv1, Adv2\n"));
        assert!(body.contains("Respondent Advocates:\nGA, ASSAM\n"));
    }

    #[test]
    fn test_fill_wraps_at_width() {
        let text = "alpha beta gamma delta";
        assert_eq!(fill(text, 11), "alpha beta\ngamma delta");
        assert_eq!(fill("abcdefghij", 4), "abcd\nefgh\nij");
        assert_eq!(fill("", 80), "");

        let long = "word ".repeat(40);
        assert!(fill(&long, 80).lines().all(|l| l.chars().count() <= 80));
    }

    #[tokio::test]
    async fn test_one_failed_recipient_does_not_block_others() {
        let transport = Arc::new(FlakyTransport {
            fail_for: "asha@example.com".into(),
            attempts: Mutex::new(Vec::new()),
        });
        let notifier = Notifier::new(transport.clone(), "Case Notification");
        let watchers: BTreeSet<Watcher> = [
            watcher("Asha", "asha@example.com"),
            watcher("Bimal", "bimal@example.com"),
        ]
        .into_iter()
        .collect();

        let tally = notifier.notify_all(&watchers, &record()).await;

        assert_eq!(tally, DeliveryTally { sent: 1, failed: 1 });
        assert_eq!(transport.attempts.lock().unwrap().len(), 2);
    }
}
