use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use super::model::{Message, MessageKind, StoredMessage};

/// Which side of a message a listing is keyed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Party {
    Recipient(String),
    Sender(String),
}

impl Party {
    pub fn address(&self) -> &str {
        match self {
            Party::Recipient(address) | Party::Sender(address) => address,
        }
    }

    fn matches(&self, message: &Message) -> bool {
        match self {
            Party::Recipient(address) => message.recipient == *address,
            Party::Sender(address) => message.sender.as_deref() == Some(address.as_str()),
        }
    }
}

/// Key-based message persistence
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages for a party, newest first, optionally of one kind
    async fn list(&self, party: &Party, kind: Option<MessageKind>) -> Result<Vec<StoredMessage>>;

    async fn get(&self, message_id: &str) -> Result<Option<StoredMessage>>;

    async fn save(&self, message: StoredMessage) -> Result<()>;

    /// Remove a message; removing an unknown id is not an error
    async fn remove(&self, message_id: &str) -> Result<()>;
}

/// An email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDelivery {
    pub to: String,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub body: String,
}

/// An SMS ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsDelivery {
    pub to: String,
    pub sender_id: String,
    pub subject: Option<String>,
    pub body: String,
}

/// Publish/deliver back end
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Enqueue a message for later delivery, returning its id
    async fn publish(&self, message: &Message) -> Result<String>;

    async fn send_email(&self, email: &EmailDelivery) -> Result<()>;

    async fn send_sms(&self, sms: &SmsDelivery) -> Result<()>;
}

/// Message store kept in process memory
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<String, StoredMessage>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn list(&self, party: &Party, kind: Option<MessageKind>) -> Result<Vec<StoredMessage>> {
        let messages = self.messages.read().await;
        let mut found: Vec<StoredMessage> = messages
            .values()
            .filter(|stored| party.matches(&stored.message))
            .filter(|stored| kind.map_or(true, |kind| stored.message.kind == kind))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.message_id.cmp(&b.message_id)));
        Ok(found)
    }

    async fn get(&self, message_id: &str) -> Result<Option<StoredMessage>> {
        Ok(self.messages.read().await.get(message_id).cloned())
    }

    async fn save(&self, message: StoredMessage) -> Result<()> {
        self.messages
            .write()
            .await
            .insert(message.message_id.clone(), message);
        Ok(())
    }

    async fn remove(&self, message_id: &str) -> Result<()> {
        self.messages.write().await.remove(message_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: &str, recipient: &str, sender: Option<&str>, kind: MessageKind, timestamp: i64) -> StoredMessage {
        StoredMessage {
            message_id: id.to_string(),
            timestamp: Some(timestamp),
            status: None,
            message: Message {
                body: "hello".to_string(),
                recipient: recipient.to_string(),
                kind,
                sender: sender.map(str::to_string),
                subject: None,
            },
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let store = InMemoryMessageStore::new();
        store.save(stored("a", "+31611111111", None, MessageKind::Sms, 1)).await.unwrap();
        store.save(stored("b", "+31611111111", None, MessageKind::Sms, 3)).await.unwrap();
        store.save(stored("c", "ann@example.com", Some("+31611111111"), MessageKind::Email, 2)).await.unwrap();

        let recipient = Party::Recipient("+31611111111".to_string());
        let ids: Vec<String> = store
            .list(&recipient, None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.message_id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);

        let sender = Party::Sender("+31611111111".to_string());
        assert_eq!(store.list(&sender, None).await.unwrap().len(), 1);
        assert!(store.list(&sender, Some(MessageKind::Sms)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let store = InMemoryMessageStore::new();
        store.save(stored("a", "ann@example.com", None, MessageKind::Email, 1)).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());

        store.remove("a").await.unwrap();
        store.remove("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
