use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    config::SmtpConfig,
    error::AppError,
    models::trip::Trip,
    services::store::{Store, StoreError},
};

/// Outbound email. Implementations load what they need from the store, so
/// they can run long after the request that scheduled them has finished.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Asks the trip owner to confirm a freshly created trip.
    async fn send_owner_confirmation_email(&self, trip_id: Uuid) -> Result<(), AppError>;
    /// Asks every current participant of a confirmed trip to confirm attendance.
    async fn send_trip_confirmed_emails(&self, trip_id: Uuid) -> Result<(), AppError>;
}

#[derive(Template)]
#[template(path = "emails/owner_confirmation.txt")]
struct OwnerConfirmationEmail<'a> {
    owner_name: &'a str,
    destination: &'a str,
    starts_on: String,
    confirm_url: String,
}

#[derive(Template)]
#[template(path = "emails/trip_confirmed.txt")]
struct TripConfirmedEmail<'a> {
    destination: &'a str,
    starts_on: String,
    ends_on: String,
    confirm_url: String,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SmtpMailer {
    store: Arc<dyn Store>,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    base_url: Url,
}

impl SmtpMailer {
    pub fn new(store: Arc<dyn Store>, smtp: &SmtpConfig, base_url: Url) -> Result<Self, AppError> {
        let from: Mailbox = smtp
            .from
            .parse()
            .map_err(|err| AppError::Config(format!("invalid MAIL_FROM: {err}")))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host).port(smtp.port);
        if let Some((user, password)) = &smtp.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            store,
            transport: builder.build(),
            from,
            base_url,
        })
    }

    fn trip_confirmed_body(&self, trip: &Trip, participant_id: Uuid) -> Result<String, AppError> {
        TripConfirmedEmail {
            destination: &trip.destination,
            starts_on: trip.starts_at.format(DATE_FORMAT).to_string(),
            ends_on: trip.ends_at.format(DATE_FORMAT).to_string(),
            confirm_url: action_url(
                &self.base_url,
                &format!("participants/{participant_id}/confirm"),
            )?,
        }
        .render()
        .map_err(|err| AppError::Mail(format!("failed to render email: {err}")))
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> Result<(), AppError> {
        let to: Mailbox = to
            .parse()
            .map_err(|err| AppError::Mail(format!("invalid recipient {to}: {err}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|err| AppError::Mail(format!("failed to build email: {err}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|err| AppError::Mail(format!("failed to send email: {err}")))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn send_owner_confirmation_email(&self, trip_id: Uuid) -> Result<(), AppError> {
        let trip = self
            .store
            .get_trip(trip_id)
            .await
            .map_err(|err| load_failed("trip", trip_id, err))?;

        let body = OwnerConfirmationEmail {
            owner_name: &trip.owner_name,
            destination: &trip.destination,
            starts_on: trip.starts_at.format(DATE_FORMAT).to_string(),
            confirm_url: action_url(&self.base_url, &format!("trips/{trip_id}/confirm"))?,
        }
        .render()
        .map_err(|err| AppError::Mail(format!("failed to render email: {err}")))?;

        self.send(&trip.owner_email, "Confirm your trip", body).await?;
        debug!(%trip_id, "owner confirmation email sent");
        Ok(())
    }

    async fn send_trip_confirmed_emails(&self, trip_id: Uuid) -> Result<(), AppError> {
        let trip = self
            .store
            .get_trip(trip_id)
            .await
            .map_err(|err| load_failed("trip", trip_id, err))?;
        let participants = self
            .store
            .list_participants(trip_id)
            .await
            .map_err(|err| load_failed("participants", trip_id, err))?;

        let subject = format!("Confirm your trip to {}", trip.destination);
        let mut failed = 0usize;
        for participant in &participants {
            let sent = match self.trip_confirmed_body(&trip, participant.id) {
                Ok(body) => self.send(&participant.email, &subject, body).await,
                Err(err) => Err(err),
            };
            if let Err(err) = sent {
                warn!(%trip_id, participant_id = %participant.id, "trip confirmed email failed: {err}");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(AppError::Mail(format!(
                "{failed} of {} trip confirmed emails failed",
                participants.len()
            )));
        }
        debug!(%trip_id, recipients = participants.len(), "trip confirmed emails sent");
        Ok(())
    }
}

fn load_failed(what: &str, trip_id: Uuid, err: StoreError) -> AppError {
    AppError::Mail(format!("failed to load {what} for trip {trip_id}: {err}"))
}

fn action_url(base: &Url, path: &str) -> Result<String, AppError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(path)
        .map(String::from)
        .map_err(|err| AppError::Mail(format!("failed to build link: {err}")))
}
