//! Guided book creation, one field per message.
//!
//! A [`FormSession`] walks the fixed field order from [`Field::ORDER`]:
//! name, description, rating, genre, authors, poster. Each answer is stored
//! unvalidated and the session advances; after the poster the collected
//! answers are turned into a [`Book`]. Sessions are kept per user in a
//! [`SessionStore`].

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::error::CatalogueError;
use super::models::{split_authors, Book, Field, FieldValue, FormData};

/// Chat user identity as delivered by the transport.
pub type UserId = u64;

/// Outcome of feeding one message into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStep {
    /// The answer was stored; this field is asked next.
    Next(Field),
    /// All fields are in; the book is ready to be stored.
    Complete(Book),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSession {
    stage: Field,
    data: FormData,
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            stage: Field::ORDER[0],
            data: FormData::new(),
        }
    }

    /// The field currently awaited.
    pub fn stage(&self) -> Field {
        self.stage
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    /// Store `text` for the awaited field and advance.
    ///
    /// When the last field is answered the stage stays on it, so a failed
    /// save can be retried by answering that field again.
    pub fn accept(&mut self, text: &str) -> Result<FormStep, CatalogueError> {
        let value = match self.stage {
            Field::Authors => FieldValue::List(split_authors(text)),
            _ => FieldValue::Text(text.to_string()),
        };
        self.data.insert(self.stage, value);

        match self.stage.next() {
            Some(next) => {
                self.stage = next;
                Ok(FormStep::Next(next))
            }
            None => Book::from_fields(&self.data).map(FormStep::Complete),
        }
    }
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`SessionStore::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The answer was stored; this field is asked next.
    Next(Field),
    /// The form is finished and has been taken out of the store. Hand the
    /// session to [`SessionStore::restore`] if the book cannot be saved.
    Complete { book: Book, session: FormSession },
}

/// Active form sessions keyed by user.
///
/// Sessions are copied out rather than borrowed so no map guard is held
/// across an await point.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<UserId, FormSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session for `user`, replacing any previous one.
    pub fn begin(&self, user: UserId) -> Field {
        let session = FormSession::new();
        let stage = session.stage();
        self.sessions.insert(user, session);
        stage
    }

    pub fn is_active(&self, user: UserId) -> bool {
        self.sessions.contains_key(&user)
    }

    pub fn get(&self, user: UserId) -> Option<FormSession> {
        self.sessions.get(&user).map(|entry| entry.value().clone())
    }

    /// Feed one message to the user's session; `None` if there is none.
    ///
    /// A completed session is removed in the same step, so a repeated final
    /// answer cannot complete it twice.
    pub fn advance(&self, user: UserId, text: &str) -> Option<Result<Advance, CatalogueError>> {
        let Entry::Occupied(mut entry) = self.sessions.entry(user) else {
            return None;
        };

        let accepted = entry.get_mut().accept(text);
        let step = match accepted {
            Ok(FormStep::Next(field)) => Ok(Advance::Next(field)),
            Ok(FormStep::Complete(book)) => Ok(Advance::Complete {
                book,
                session: entry.remove(),
            }),
            Err(err) => Err(err),
        };
        Some(step)
    }

    /// Put a completed session back after its book failed to save.
    ///
    /// A session the user started in the meantime wins. Returns whether the
    /// old one was put back.
    pub fn restore(&self, user: UserId, session: FormSession) -> bool {
        match self.sessions.entry(user) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
        }
    }

    /// Drop the user's session. Returns whether one existed.
    pub fn discard(&self, user: UserId) -> bool {
        self.sessions.remove(&user).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
