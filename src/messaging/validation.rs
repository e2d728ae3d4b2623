//! Address validation for message recipients and senders

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}").expect("email pattern is valid")
});

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9]\d{8,14}$").expect("phone pattern is valid"));

/// Sender id used for SMS when the sender is not a usable number
pub const DEFAULT_SMS_SENDER_ID: &str = "MSGAPPNL";

pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && EMAIL_REGEX.is_match(email)
}

/// E.164 phone number, leading `+` optional
pub fn validate_phone(phone: &str) -> bool {
    !phone.is_empty() && PHONE_REGEX.is_match(phone)
}

pub fn validate_address(address: &str) -> bool {
    validate_email(address) || validate_phone(address)
}

/// SMS sender id: `n` plus the first ten digits of a long enough sender
pub fn sms_sender_id(sender: Option<&str>) -> String {
    match sender {
        Some(sender) if sender.chars().count() >= 10 => {
            let digits: String = sender.chars().filter(char::is_ascii_digit).take(10).collect();
            format!("n{}", digits)
        }
        _ => DEFAULT_SMS_SENDER_ID.to_string(),
    }
}
