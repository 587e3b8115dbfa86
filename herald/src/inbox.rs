//! In-process inbox backing the in-app channel.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use dashmap::DashMap;

use herald_common::Recipient;
use herald_dispatch::adapter::ChannelAdapter;
use herald_dispatch::error::AdapterError;
use herald_registry::RenderedContent;

/// A message landed in a recipient's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    pub subject: Option<String>,
    pub body: String,
    pub received_at: SystemTime,
    pub read: bool,
}

/// In-memory mailbox store.
///
/// The same instance serves two sides: registered as the in-app channel's
/// adapter it receives deliveries, and the platform UI reads and
/// acknowledges messages through it. Clones share the store.
#[derive(Debug, Clone, Default)]
pub struct InAppInbox {
    mailboxes: Arc<DashMap<Recipient, Vec<InboxMessage>>>,
}

impl InAppInbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages for a recipient, oldest first.
    #[must_use]
    pub fn messages_for(&self, recipient: &Recipient) -> Vec<InboxMessage> {
        self.mailboxes
            .get(recipient)
            .map(|mailbox| mailbox.value().clone())
            .unwrap_or_default()
    }

    /// Unread messages for a recipient.
    #[must_use]
    pub fn unread_count(&self, recipient: &Recipient) -> usize {
        self.mailboxes.get(recipient).map_or(0, |mailbox| {
            mailbox.iter().filter(|message| !message.read).count()
        })
    }

    /// Mark every message read; returns how many changed.
    pub fn mark_all_read(&self, recipient: &Recipient) -> usize {
        let Some(mut mailbox) = self.mailboxes.get_mut(recipient) else {
            return 0;
        };

        let mut changed = 0;
        for message in mailbox.iter_mut() {
            if !message.read {
                message.read = true;
                changed += 1;
            }
        }
        changed
    }

    /// Messages across every mailbox.
    #[must_use]
    pub fn total_messages(&self) -> usize {
        self.mailboxes.iter().map(|mailbox| mailbox.len()).sum()
    }
}

#[async_trait]
impl ChannelAdapter for InAppInbox {
    async fn send(
        &self,
        recipient: &Recipient,
        content: &RenderedContent,
    ) -> Result<(), AdapterError> {
        self.mailboxes
            .entry(recipient.clone())
            .or_default()
            .push(InboxMessage {
                subject: content.subject.clone(),
                body: content.body.clone(),
                received_at: SystemTime::now(),
                read: false,
            });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn message(body: &str) -> RenderedContent {
        RenderedContent {
            subject: None,
            body: body.to_owned(),
        }
    }

    #[tokio::test]
    async fn messages_accumulate_per_recipient() {
        let inbox = InAppInbox::new();
        let ada = Recipient::new("ada");
        let grace = Recipient::new("grace");

        inbox.send(&ada, &message("first")).await.unwrap();
        inbox.send(&ada, &message("second")).await.unwrap();
        inbox.send(&grace, &message("other")).await.unwrap();

        let bodies: Vec<String> = inbox
            .messages_for(&ada)
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, vec!["first".to_owned(), "second".to_owned()]);
        assert_eq!(inbox.total_messages(), 3);
    }

    #[tokio::test]
    async fn unread_tracking() {
        let inbox = InAppInbox::new();
        let ada = Recipient::new("ada");

        inbox.send(&ada, &message("first")).await.unwrap();
        inbox.send(&ada, &message("second")).await.unwrap();
        assert_eq!(inbox.unread_count(&ada), 2);

        assert_eq!(inbox.mark_all_read(&ada), 2);
        assert_eq!(inbox.unread_count(&ada), 0);
        assert_eq!(inbox.mark_all_read(&ada), 0);

        // unknown recipients have an empty mailbox
        assert_eq!(inbox.unread_count(&Recipient::new("nobody")), 0);
        assert_eq!(inbox.mark_all_read(&Recipient::new("nobody")), 0);
    }
}
