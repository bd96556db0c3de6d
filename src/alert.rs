use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt;
use tracing::{error, info, warn};

use crate::config::{AlertSettings, SmtpSettings};
use crate::error::DispatchError;
use crate::models::AlertEvent;

const LOCAL_RELAY_HOST: &str = "localhost";
const FALLBACK_SENDER_USER: &str = "proxy-monitor";

/// Where an alert leaves this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    LocalRelay,
    Remote {
        server: String,
        port: u16,
        user: String,
        password: String,
    },
}

impl Route {
    fn channel(&self) -> Channel {
        match self {
            Route::LocalRelay => Channel::LocalRelay,
            Route::Remote { .. } => Channel::Remote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    LocalRelay,
    Remote,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::LocalRelay => f.write_str("local MTA"),
            Channel::Remote => f.write_str("external SMTP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoRecipient,
    IncompleteSmtpConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent(Channel),
    Skipped(SkipReason),
}

/// Mail hand-off. Implementations only move bytes; routing decisions stay
/// in [`AlertDispatcher`].
#[async_trait]
pub trait MailTransport {
    async fn deliver(&self, route: &Route, mail: &AlertEmail) -> Result<(), DispatchError>;
}

/// SMTP transport backed by lettre: the local relay or an authenticated
/// remote server.
pub struct SmtpMailer;

fn mailbox(addr: &str) -> Result<Mailbox, DispatchError> {
    addr.parse()
        .map_err(|_| DispatchError::Address(addr.to_string()))
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, route: &Route, mail: &AlertEmail) -> Result<(), DispatchError> {
        let message = Message::builder()
            .from(mailbox(&mail.from)?)
            .to(mailbox(&mail.to)?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| DispatchError::Message(e.to_string()))?;

        let transport = match route {
            Route::LocalRelay => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(LOCAL_RELAY_HOST).build()
            }
            Route::Remote {
                server,
                port,
                user,
                password,
            } => AsyncSmtpTransport::<Tokio1Executor>::relay(server)
                .map_err(|e| DispatchError::Transport(e.to_string()))?
                .port(*port)
                .credentials(Credentials::new(user.clone(), password.clone()))
                .build(),
        };

        transport
            .send(message)
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// `user@host` for mail leaving through the local relay.
pub fn local_sender() -> String {
    let user = std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| FALLBACK_SENDER_USER.to_string());
    let host = sysinfo::System::host_name().unwrap_or_else(|| "localhost".to_string());
    format!("{}@{}", user, host)
}

fn remote_route(smtp: &SmtpSettings) -> Option<Route> {
    Some(Route::Remote {
        server: smtp.server.clone()?,
        port: smtp.port?,
        user: smtp.user.clone()?,
        password: smtp.password.clone()?,
    })
}

pub struct AlertDispatcher<T> {
    settings: AlertSettings,
    transport: T,
}

impl<T: MailTransport> AlertDispatcher<T> {
    pub fn new(settings: AlertSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Picks the route and sends. Skips, without touching the transport,
    /// when no recipient is set or remote settings are incomplete.
    pub async fn dispatch(&self, event: &AlertEvent) -> Result<Delivery, DispatchError> {
        let Some(recipient) = self.settings.recipient.as_deref() else {
            return Ok(Delivery::Skipped(SkipReason::NoRecipient));
        };

        let (route, from) = if self.settings.use_local_mta {
            (Route::LocalRelay, local_sender())
        } else {
            match remote_route(&self.settings.smtp) {
                Some(route) => {
                    let from = self.settings.smtp.user.clone().unwrap_or_default();
                    (route, from)
                }
                None => return Ok(Delivery::Skipped(SkipReason::IncompleteSmtpConfig)),
            }
        };

        let mail = AlertEmail {
            from,
            to: recipient.to_string(),
            subject: event.subject.clone(),
            body: event.body.clone(),
        };
        self.transport.deliver(&route, &mail).await?;
        Ok(Delivery::Sent(route.channel()))
    }

    /// Like [`dispatch`](Self::dispatch) but never fails; every result is logged.
    pub async fn notify(&self, event: &AlertEvent) -> Option<Channel> {
        match self.dispatch(event).await {
            Ok(Delivery::Sent(channel)) => {
                info!("Email alert sent successfully via {}.", channel);
                Some(channel)
            }
            Ok(Delivery::Skipped(SkipReason::NoRecipient)) => {
                info!("Recipient email not configured. Skipping email alert.");
                None
            }
            Ok(Delivery::Skipped(SkipReason::IncompleteSmtpConfig)) => {
                warn!("External SMTP server configuration is not complete. Skipping email alert.");
                None
            }
            Err(e) => {
                error!("Failed to send email alert: {}", e);
                None
            }
        }
    }
}
