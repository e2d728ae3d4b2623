//! Message delivery service

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{PdpError, Result};
use super::model::{Message, MessageKind, StoredMessage};
use super::store::{DeliveryChannel, EmailDelivery, MessageStore, Party, SmsDelivery};
use super::validation::{sms_sender_id, validate_address, validate_email, validate_phone};

/// Sends messages to users and keeps track of what was sent
#[derive(Clone)]
pub struct Messenger {
    store: Arc<dyn MessageStore>,
    channel: Arc<dyn DeliveryChannel>,
}

impl Messenger {
    pub fn new(store: Arc<dyn MessageStore>, channel: Arc<dyn DeliveryChannel>) -> Self {
        Self { store, channel }
    }

    /// List messages addressed to a recipient or sent by a sender
    ///
    /// When both are given the sender is used.
    pub async fn list(
        &self,
        recipient: Option<&str>,
        sender: Option<&str>,
        kind: Option<MessageKind>,
    ) -> Result<Vec<StoredMessage>> {
        tracing::debug!(?recipient, ?sender, ?kind, "Listing messages");

        for address in [recipient, sender].into_iter().flatten() {
            if !validate_address(address) {
                return Err(PdpError::BadRequest(format!(
                    "Invalid phone number or email address. {}",
                    address
                )));
            }
        }

        let party = match (recipient, sender) {
            (_, Some(sender)) => Party::Sender(sender.to_string()),
            (Some(recipient), None) => Party::Recipient(recipient.to_string()),
            (None, None) => return Err(PdpError::BadRequest("Invalid recipient or sender.".to_string())),
        };

        self.store.list(&party, kind).await
    }

    pub async fn get(&self, message_id: &str) -> Result<StoredMessage> {
        tracing::debug!(message_id, "Getting message");
        self.store
            .get(message_id)
            .await?
            .ok_or_else(|| PdpError::NotFound(format!("Message with specified ID not found. {}", message_id)))
    }

    /// Store a message that went through the publish topic
    pub async fn save_published(&self, message_id: &str, timestamp: Option<i64>, payload: &str) -> Result<StoredMessage> {
        let message: Message = serde_json::from_str(payload)
            .map_err(|e| PdpError::BadRequest(format!("Unable to parse published message: {}", e)))?;
        let stored = StoredMessage {
            message_id: message_id.to_string(),
            timestamp,
            status: None,
            message,
        };
        self.store.save(stored.clone()).await?;
        tracing::debug!(message_id, "Saved published message");
        Ok(stored)
    }

    /// Store a message that was never published, assigning a fresh id
    pub async fn save(&self, message: Message) -> Result<StoredMessage> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .ok();
        let stored = StoredMessage {
            message_id,
            timestamp,
            status: None,
            message,
        };
        self.store.save(stored.clone()).await?;
        Ok(stored)
    }

    /// Returns the id of the removed message
    pub async fn remove(&self, message_id: &str) -> Result<String> {
        tracing::debug!(message_id, "Removing message");
        self.store.remove(message_id).await?;
        Ok(message_id.to_string())
    }

    /// Enqueue a message for later delivery
    pub async fn publish(&self, message: Message) -> Result<StoredMessage> {
        let message_id = self.channel.publish(&message).await?;
        tracing::debug!(%message_id, "Published message");
        Ok(StoredMessage {
            message_id,
            timestamp: None,
            status: None,
            message,
        })
    }

    /// Deliver a published payload
    pub async fn send_payload(&self, payload: &str) -> Result<()> {
        let message: Message = serde_json::from_str(payload).map_err(|e| {
            PdpError::BadRequest(format!(
                "Invalid or missing message type (\"sms\" or \"email\"): {}",
                e
            ))
        })?;
        self.send(&message).await
    }

    /// Deliver by email or SMS depending on the message kind
    pub async fn send(&self, message: &Message) -> Result<()> {
        match message.kind {
            MessageKind::Email => {
                if !validate_email(&message.recipient) {
                    return Err(PdpError::BadRequest(format!(
                        "Email is not properly formatted. {}",
                        message.recipient
                    )));
                }
                self.channel
                    .send_email(&EmailDelivery {
                        to: message.recipient.clone(),
                        from: message.sender.clone(),
                        subject: message.subject.clone(),
                        body: message.body.clone(),
                    })
                    .await
            }
            MessageKind::Sms => {
                if !validate_phone(&message.recipient) {
                    return Err(PdpError::BadRequest(format!(
                        "Phone number does not match E.164 format. {}",
                        message.recipient
                    )));
                }
                self.channel
                    .send_sms(&SmsDelivery {
                        to: message.recipient.clone(),
                        sender_id: sms_sender_id(message.sender.as_deref()),
                        subject: message.subject.clone(),
                        body: message.body.clone(),
                    })
                    .await
            }
        }
    }
}
