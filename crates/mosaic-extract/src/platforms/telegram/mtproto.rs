//! Grammers-backed [`TelegramSession`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use dialoguer::{Input, Password};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use grammers_client::types::{Chat, Message};
use grammers_client::{Client, Config, InitParams, SignInError};
use grammers_session::{PackedChat, Session};
use tokio::sync::OnceCell;

use super::{ConnectedAccount, EntityKind, TelegramEntityInfo, TelegramMessage, TelegramSession};
use crate::error::ExtractError;

fn telegram_error(e: impl std::fmt::Display) -> ExtractError {
    ExtractError::Telegram(e.to_string())
}

/// Terminal prompts block, so they run off the async worker threads.
async fn prompt(label: &'static str, secret: bool) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || {
        if secret {
            Password::new().with_prompt(label).interact()
        } else {
            Input::<String>::new().with_prompt(label).interact_text()
        }
    })
    .await
    .map_err(telegram_error)?
    .map_err(telegram_error)
}

/// Chats already resolved in this session, keyed by lowercased username.
#[derive(Debug)]
struct ChatCache<T> {
    chats: Mutex<HashMap<String, T>>,
}

impl<T: Copy> ChatCache<T> {
    fn new() -> Self {
        Self {
            chats: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, username: &str) -> Option<T> {
        self.chats
            .lock()
            .ok()
            .and_then(|chats| chats.get(&username.to_lowercase()).copied())
    }

    fn remember(&self, username: &str, chat: T) {
        if let Ok(mut chats) = self.chats.lock() {
            chats.insert(username.to_lowercase(), chat);
        }
    }
}

pub struct MtprotoSession {
    api_id: i32,
    api_hash: String,
    phone: Option<String>,
    session_path: PathBuf,
    client: OnceCell<Client>,
    resolved: ChatCache<PackedChat>,
}

impl MtprotoSession {
    /// The session file is `{session_name}.session` in the working directory.
    #[must_use]
    pub fn new(api_id: i32, api_hash: String, phone: Option<String>, session_name: &str) -> Self {
        Self {
            api_id,
            api_hash,
            phone,
            session_path: PathBuf::from(format!("{session_name}.session")),
            client: OnceCell::new(),
            resolved: ChatCache::new(),
        }
    }

    fn client(&self) -> Result<&Client, ExtractError> {
        self.client
            .get()
            .ok_or_else(|| ExtractError::Telegram("session is not connected".to_string()))
    }

    async fn authorize(&self, client: &Client) -> Result<(), ExtractError> {
        if client.is_authorized().await.map_err(telegram_error)? {
            return Ok(());
        }

        let phone = match &self.phone {
            Some(phone) => phone.clone(),
            None => prompt("Telegram phone number (international format)", false).await?,
        };
        let token = client
            .request_login_code(&phone)
            .await
            .map_err(telegram_error)?;
        let code = prompt("Login code sent by Telegram", false).await?;

        match client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompt("Two-step verification password", true).await?;
                client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(telegram_error)?;
            }
            Err(e) => return Err(telegram_error(e)),
        }

        client
            .session()
            .save_to_file(&self.session_path)
            .map_err(|e| ExtractError::Io {
                path: self.session_path.display().to_string(),
                source: e,
            })
    }

    async fn resolve_chat(&self, username: &str) -> Result<Chat, ExtractError> {
        let chat = self
            .client()?
            .resolve_username(username)
            .await
            .map_err(telegram_error)?
            .ok_or_else(|| ExtractError::UsernameNotOccupied {
                username: username.to_string(),
            })?;
        self.resolved.remember(username, chat.pack());
        Ok(chat)
    }

    async fn packed_chat(&self, username: &str) -> Result<PackedChat, ExtractError> {
        match self.resolved.get(username) {
            Some(packed) => Ok(packed),
            None => Ok(self.resolve_chat(username).await?.pack()),
        }
    }
}

fn entity_info(chat: &Chat) -> TelegramEntityInfo {
    let (kind, participants_count) = match chat {
        Chat::User(_) => (EntityKind::User, None),
        Chat::Group(group) if group.is_megagroup() => (EntityKind::Supergroup, None),
        Chat::Group(_) => (EntityKind::Group, None),
        Chat::Channel(channel) => (
            EntityKind::Channel,
            channel
                .raw
                .participants_count
                .and_then(|n| u64::try_from(n).ok()),
        ),
    };
    let name = chat.name();
    TelegramEntityInfo {
        id: chat.id(),
        username: chat.username().map(str::to_owned),
        title: (!name.is_empty()).then(|| name.to_string()),
        kind,
        participants_count,
    }
}

fn to_message(message: &Message) -> TelegramMessage {
    TelegramMessage {
        id: i64::from(message.id()),
        date: Some(message.date().to_rfc3339()),
        text: message.text().to_string(),
        views: message.view_count().map(i64::from),
        forwards: message.forward_count().map(i64::from),
        has_media: message.media().is_some(),
    }
}

#[async_trait]
impl TelegramSession for MtprotoSession {
    async fn connect(&self) -> Result<ConnectedAccount, ExtractError> {
        let session = Session::load_file_or_create(&self.session_path).map_err(|e| {
            ExtractError::Io {
                path: self.session_path.display().to_string(),
                source: e,
            }
        })?;
        let client = Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(telegram_error)?;

        self.authorize(&client).await?;
        let me = client.get_me().await.map_err(telegram_error)?;
        let account = ConnectedAccount {
            first_name: me.first_name().to_string(),
            username: me.username().map(str::to_owned),
        };

        self.client
            .set(client)
            .map_err(|_| ExtractError::Telegram("session already connected".to_string()))?;
        Ok(account)
    }

    async fn resolve(&self, username: &str) -> Result<TelegramEntityInfo, ExtractError> {
        let chat = self.resolve_chat(username).await?;
        Ok(entity_info(&chat))
    }

    fn messages<'a>(
        &'a self,
        username: &'a str,
        limit: usize,
    ) -> BoxStream<'a, Result<TelegramMessage, ExtractError>> {
        let start = async move {
            let chat = self.packed_chat(username).await?;
            Ok::<_, ExtractError>(self.client()?.iter_messages(chat).limit(limit))
        };

        stream::once(start)
            .map(|started| match started {
                Ok(iter) => stream::try_unfold(iter, |mut iter| async move {
                    match iter.next().await.map_err(telegram_error)? {
                        Some(message) => Ok(Some((to_message(&message), iter))),
                        None => Ok(None),
                    }
                })
                .boxed(),
                Err(e) => stream::once(async move { Err(e) }).boxed(),
            })
            .flatten()
            .boxed()
    }

    async fn disconnect(&self) {
        if let Ok(client) = self.client() {
            if let Err(e) = client.session().save_to_file(&self.session_path) {
                tracing::warn!(platform = "telegram", error = %e, "failed to persist session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_cache_is_keyed_case_insensitively() {
        let cache = ChatCache::new();
        assert_eq!(cache.get("durov"), None);
        cache.remember("Durov", 7_u32);
        assert_eq!(cache.get("durov"), Some(7));
        assert_eq!(cache.get("DUROV"), Some(7));
        assert_eq!(cache.get("telegram"), None);
    }
}
