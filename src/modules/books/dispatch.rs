//! Inbound event routing.
//!
//! Every update is resolved to a [`Route`] first and then handled. A
//! recognised command always wins and discards a form in progress; free text
//! goes to the form when the user has one; list selections never touch the
//! form.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use shelfbot_kernel::settings::Settings;

use super::error::CatalogueError;
use super::form::{Advance, SessionStore, UserId};
use super::models::Field;
use super::presenter::{self, HttpImageFetcher, ImageFetcher, Reply};
use super::store::CatalogueStore;

/// An inbound user event as delivered by a transport.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub callback: Option<String>,
}

impl Update {
    pub fn message(user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: None,
            text: Some(text.into()),
            callback: None,
        }
    }

    pub fn selection(user_id: UserId, data: impl Into<String>) -> Self {
        Self {
            user_id,
            user_name: None,
            text: None,
            callback: Some(data.into()),
        }
    }

    /// The payload carried by this update; selections take precedence.
    pub fn event(&self) -> Option<Event<'_>> {
        match (&self.callback, &self.text) {
            (Some(data), _) => Some(Event::Selection(data)),
            (None, Some(text)) => Some(Event::Message(text)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    Message(&'a str),
    Selection(&'a str),
}

/// Bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Books,
    CreateBook,
    Cancel,
    Help,
    Unknown(String),
}

impl BotCommand {
    /// Parse `text` as a command; `None` if it doesn't start with `/`.
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        if !word.starts_with('/') {
            return None;
        }
        let command = word.split('@').next().unwrap_or(word).to_lowercase();

        Some(match command.as_str() {
            "/start" => BotCommand::Start,
            "/books" => BotCommand::Books,
            "/create_book" => BotCommand::CreateBook,
            "/cancel" => BotCommand::Cancel,
            "/help" => BotCommand::Help,
            _ => BotCommand::Unknown(command),
        })
    }
}

const HELP_TEXT: &str = "Commands:\n\
    /books - list the catalogue\n\
    /create_book - add a book step by step\n\
    /cancel - stop adding a book\n\
    /help - show this message";

#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Command(BotCommand),
    FormInput(&'a str),
    Selection(&'a str),
    Unrouted,
}

/// Routes updates to the catalogue and the per-user form sessions.
pub struct Dispatcher {
    store: Arc<CatalogueStore>,
    sessions: SessionStore,
    images: Arc<dyn ImageFetcher>,
}

impl Dispatcher {
    pub fn new(store: Arc<CatalogueStore>, images: Arc<dyn ImageFetcher>) -> Self {
        Self {
            store,
            sessions: SessionStore::new(),
            images,
        }
    }

    /// Dispatcher over the configured catalogue file with HTTP cover fetching.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store = Arc::new(CatalogueStore::new(&settings.storage.catalogue_path));
        let images = HttpImageFetcher::new(Duration::from_millis(
            settings.bot.image_fetch_timeout_ms,
        ))?;
        Ok(Self::new(store, Arc::new(images)))
    }

    pub fn store(&self) -> &CatalogueStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one update and produce the replies to send back.
    ///
    /// Failures are turned into a user-facing reply; nothing here is fatal.
    pub async fn dispatch(&self, update: &Update) -> Vec<Reply> {
        let user = update.user_id;
        let route = self.route(update);
        tracing::debug!(user_id = user, ?route, "update routed");

        let result = match route {
            Route::Command(command) => self.on_command(update, command).await,
            Route::FormInput(text) => self.on_form_input(user, text).await,
            Route::Selection(data) => self.on_selection(data).await,
            Route::Unrouted => Ok(vec![Reply::text(format!(
                "I didn't understand that.\n{HELP_TEXT}"
            ))]),
        };

        result.unwrap_or_else(|err| {
            tracing::error!(user_id = user, error = %err, "update handling failed");
            vec![Reply::text(err.user_message())]
        })
    }

    fn route<'a>(&self, update: &'a Update) -> Route<'a> {
        match update.event() {
            Some(Event::Message(text)) => match BotCommand::parse(text) {
                Some(command) => Route::Command(command),
                None if self.sessions.is_active(update.user_id) => Route::FormInput(text),
                None => Route::Unrouted,
            },
            Some(Event::Selection(data)) => Route::Selection(data),
            None => Route::Unrouted,
        }
    }

    async fn on_command(
        &self,
        update: &Update,
        command: BotCommand,
    ) -> Result<Vec<Reply>, CatalogueError> {
        let user = update.user_id;
        let discarded =
            !matches!(command, BotCommand::Unknown(_)) && self.sessions.discard(user);
        if discarded {
            tracing::info!(user_id = user, ?command, "form session discarded by command");
        }

        let reply = match command {
            BotCommand::Start => {
                let name = update.user_name.as_deref().unwrap_or("reader");
                tracing::info!(user_id = user, name, "user started the bot");
                Reply::text(format!(
                    "Welcome, {name}!\nI manage a catalogue of books.\n{HELP_TEXT}"
                ))
            }
            BotCommand::Books => {
                let books = self.store.list_books().await?;
                presenter::catalogue_reply(&books)
            }
            BotCommand::CreateBook => {
                let stage = self.sessions.begin(user);
                tracing::info!(user_id = user, "form session started");
                Reply::text(stage.prompt())
            }
            BotCommand::Cancel if discarded => Reply::text("Adding the book was cancelled."),
            BotCommand::Cancel => Reply::text("There is nothing to cancel."),
            BotCommand::Help => Reply::text(HELP_TEXT),
            BotCommand::Unknown(name) => {
                Reply::text(format!("Unknown command {name}.\n{HELP_TEXT}"))
            }
        };

        Ok(vec![reply])
    }

    async fn on_form_input(&self, user: UserId, text: &str) -> Result<Vec<Reply>, CatalogueError> {
        let awaiting_name = self
            .sessions
            .get(user)
            .is_some_and(|session| session.stage() == Field::Name);
        if awaiting_name && text.is_empty() {
            return Ok(vec![Reply::text(format!(
                "The title cannot be empty. {}",
                Field::Name.prompt()
            ))]);
        }

        let step = match self.sessions.advance(user, text) {
            Some(step) => step?,
            // Session vanished between routing and handling.
            None => return Ok(vec![Reply::text(HELP_TEXT)]),
        };

        match step {
            Advance::Next(field) => {
                tracing::debug!(user_id = user, stage = field.key(), "form stage advanced");
                Ok(vec![Reply::text(field.prompt())])
            }
            Advance::Complete { book, session } => {
                let name = book.name.clone();
                let index = match self.store.append_book(book).await {
                    Ok(index) => index,
                    Err(err) => {
                        let restored = self.sessions.restore(user, session);
                        tracing::warn!(
                            user_id = user,
                            restored,
                            "book not saved; form kept for retry"
                        );
                        return Err(err);
                    }
                };

                tracing::info!(user_id = user, index, name = %name, "book created via form");
                Ok(vec![Reply::text(format!(
                    "Book \"{name}\" added to the catalogue."
                ))])
            }
        }
    }

    async fn on_selection(&self, data: &str) -> Result<Vec<Reply>, CatalogueError> {
        let Some(index) = presenter::parse_callback(data) else {
            tracing::warn!(data, "unrecognised selection payload");
            return Ok(vec![Reply::text("That selection is no longer valid.")]);
        };

        let book = self.store.get_book(index).await?;
        Ok(vec![presenter::book_reply(&book, self.images.as_ref()).await])
    }
}
