//! Message service collaborators gated by the authorizer
//!
//! The authorizer never calls into this module; it only decides whether a
//! caller may reach the handlers that do. The storage and delivery
//! back ends are traits so any database or notification service fits.

pub mod model;
pub mod validation;
pub mod store;
pub mod messenger;

pub use model::*;
pub use messenger::Messenger;
pub use store::{DeliveryChannel, EmailDelivery, InMemoryMessageStore, MessageStore, Party, SmsDelivery};
