//! Alert channels
//!
//! - `SlackChannel`: incoming-webhook POST of `{"text": ...}`
//! - `EmailChannel`: one recipient, delivered through a `Mailer`

pub mod email;
pub mod slack;

pub use email::{EmailChannel, Mailer, SendmailMailer};
pub use slack::SlackChannel;
