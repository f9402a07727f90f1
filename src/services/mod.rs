pub mod mailer;
pub mod notifications;
pub mod store;
pub mod workflow;
