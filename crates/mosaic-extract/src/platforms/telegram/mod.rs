//! Telegram channels, groups and users over an authenticated MTProto session.
//!
//! The session is abstracted behind [`TelegramSession`] so the extraction flow
//! can run against a scripted session in tests. The real backend lives in
//! [`mtproto`] and is compiled only with the `telegram` feature.

#[cfg(feature = "telegram")]
pub mod mtproto;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use mosaic_core::PlatformId;
use serde::Serialize;

use super::{clean_handle, PlatformClient};
use crate::error::ExtractError;
use crate::persist::extraction_timestamp;
use crate::reporter::Reporter;

pub const MESSAGE_CAP: usize = 800;
const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Channel,
    Supergroup,
    Group,
    User,
    Unknown,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Channel => "channel",
            EntityKind::Supergroup => "supergroup",
            EntityKind::Group => "group",
            EntityKind::User => "user",
            EntityKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TelegramEntityInfo {
    pub id: i64,
    pub username: Option<String>,
    /// Chat title, or first name for users.
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelegramMessage {
    pub id: i64,
    pub date: Option<String>,
    pub text: String,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub has_media: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelegramDocument {
    pub entity_info: TelegramEntityInfo,
    pub messages: Vec<TelegramMessage>,
    pub extraction_date: String,
}

/// The account the session is logged in as.
#[derive(Debug, Clone)]
pub struct ConnectedAccount {
    pub first_name: String,
    pub username: Option<String>,
}

/// An authenticated Telegram session.
#[async_trait]
pub trait TelegramSession: Send + Sync {
    /// Connect and authorize, prompting for a login code if needed.
    async fn connect(&self) -> Result<ConnectedAccount, ExtractError>;

    /// # Errors
    ///
    /// [`ExtractError::UsernameNotOccupied`] when nobody holds the username.
    async fn resolve(&self, username: &str) -> Result<TelegramEntityInfo, ExtractError>;

    /// Newest-first message history of `username`, at most `limit` items.
    fn messages<'a>(
        &'a self,
        username: &'a str,
        limit: usize,
    ) -> BoxStream<'a, Result<TelegramMessage, ExtractError>>;

    async fn disconnect(&self);
}

pub struct TelegramClient {
    session: Box<dyn TelegramSession>,
    reporter: Arc<dyn Reporter>,
}

impl TelegramClient {
    #[must_use]
    pub fn new(session: Box<dyn TelegramSession>, reporter: Arc<dyn Reporter>) -> Self {
        Self { session, reporter }
    }

    /// Drain the message stream, keeping whatever arrived before an error.
    async fn messages(&self, username: &str) -> Vec<TelegramMessage> {
        self.reporter
            .info(&format!("Fetching up to {MESSAGE_CAP} messages..."));
        let mut stream = self.session.messages(username, MESSAGE_CAP);
        let mut messages = Vec::new();

        while let Some(next) = stream.next().await {
            match next {
                Ok(message) => {
                    messages.push(message);
                    if messages.len() % PROGRESS_EVERY == 0 {
                        self.reporter
                            .progress(&format!("{}/{MESSAGE_CAP} messages", messages.len()));
                    }
                    if messages.len() >= MESSAGE_CAP {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(platform = "telegram", error = %e, kept = messages.len(), "message stream failed");
                    self.reporter.warning(&format!(
                        "Message retrieval stopped early after {} message(s): {e}",
                        messages.len()
                    ));
                    break;
                }
            }
        }

        self.reporter
            .success(&format!("{} messages retrieved", messages.len()));
        messages
    }

    /// # Errors
    ///
    /// Connection and entity lookup failures are fatal; the session is
    /// disconnected either way.
    pub async fn fetch_document(&self, username: &str) -> Result<TelegramDocument, ExtractError> {
        let username = clean_handle(username);
        self.reporter
            .header(&format!("{} TELEGRAM EXTRACTOR", PlatformId::Telegram.icon()));

        let account = self.session.connect().await?;
        match &account.username {
            Some(handle) => self.reporter.success(&format!(
                "Connected as: {} (@{handle})",
                account.first_name
            )),
            None => self
                .reporter
                .success(&format!("Connected as: {}", account.first_name)),
        }

        self.reporter
            .step(&format!("Fetching info for @{username}"));
        let entity_info = match self.session.resolve(username).await {
            Ok(info) => info,
            Err(e) => {
                self.session.disconnect().await;
                return Err(e);
            }
        };
        self.reporter.success(&format!(
            "Entity info retrieved: {} ({}){}",
            entity_info.title.as_deref().unwrap_or("N/A"),
            entity_info.kind,
            entity_info
                .participants_count
                .map(|n| format!(", {n} members"))
                .unwrap_or_default()
        ));

        let messages = self.messages(username).await;
        self.session.disconnect().await;
        self.reporter.progress("Disconnected");

        Ok(TelegramDocument {
            entity_info,
            messages,
            extraction_date: extraction_timestamp(),
        })
    }
}

#[async_trait]
impl PlatformClient for TelegramClient {
    fn platform(&self) -> PlatformId {
        PlatformId::Telegram
    }

    async fn extract(&self, identity: &str) -> Result<serde_json::Value, ExtractError> {
        let document = self.fetch_document(identity).await?;
        Ok(serde_json::to_value(document)?)
    }
}
