use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::CatalogueError;

/// Separator users put between author names.
pub const AUTHORS_SEPARATOR: &str = ", ";

/// A catalogue entry, stored field-for-field in the JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Title of the book
    pub name: String,
    pub description: String,
    /// Free-form rating; older files may carry a bare number here
    #[serde(deserialize_with = "text_or_number")]
    pub rating: String,
    pub genre: String,
    pub authors: Vec<String>,
    /// Cover image URL
    pub poster: String,
}

/// The fields collected for a book, in the order the form asks for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Description,
    Rating,
    Genre,
    Authors,
    Poster,
}

impl Field {
    pub const ORDER: [Field; 6] = [
        Field::Name,
        Field::Description,
        Field::Rating,
        Field::Genre,
        Field::Authors,
        Field::Poster,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Description => "description",
            Field::Rating => "rating",
            Field::Genre => "genre",
            Field::Authors => "authors",
            Field::Poster => "poster",
        }
    }

    /// The field collected after this one, `None` for the last.
    pub fn next(self) -> Option<Field> {
        let position = Self::ORDER.iter().position(|f| *f == self)?;
        Self::ORDER.get(position + 1).copied()
    }

    /// Question sent to the user while this field is outstanding.
    pub const fn prompt(self) -> &'static str {
        match self {
            Field::Name => "Enter the book title.",
            Field::Description => "Enter the book description.",
            Field::Rating => "Enter the book rating from 0 to 10.",
            Field::Genre => "Enter the book genre.",
            Field::Authors => "Enter the book authors. Separate names with a comma and a space.",
            Field::Poster => "Enter a link to the book cover.",
        }
    }
}

/// A collected answer. Only `authors` is a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// Partial answers keyed by field.
pub type FormData = BTreeMap<Field, FieldValue>;

/// Split author input on the literal `", "` separator, without trimming.
pub fn split_authors(text: &str) -> Vec<String> {
    text.split(AUTHORS_SEPARATOR).map(str::to_string).collect()
}

impl Book {
    /// Materialize a book from collected answers.
    ///
    /// Every field must be present with its natural shape, and `name` must
    /// not be empty.
    pub fn from_fields(fields: &FormData) -> Result<Self, CatalogueError> {
        let name = text(fields, Field::Name)?;
        if name.is_empty() {
            return Err(CatalogueError::Validation {
                field: Field::Name.key(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            name,
            description: text(fields, Field::Description)?,
            rating: text(fields, Field::Rating)?,
            genre: text(fields, Field::Genre)?,
            authors: list(fields, Field::Authors)?,
            poster: text(fields, Field::Poster)?,
        })
    }

    /// Substring after the last `.` of the poster URL.
    pub fn poster_extension(&self) -> &str {
        self.poster.rsplit('.').next().unwrap_or_default()
    }

    pub fn cover_filename(&self) -> String {
        format!("{}_cover.{}", self.name, self.poster_extension())
    }
}

fn text(fields: &FormData, field: Field) -> Result<String, CatalogueError> {
    match fields.get(&field) {
        Some(FieldValue::Text(value)) => Ok(value.clone()),
        Some(FieldValue::List(_)) => Err(CatalogueError::Validation {
            field: field.key(),
            reason: "must be text".to_string(),
        }),
        None => Err(CatalogueError::missing(field.key())),
    }
}

fn list(fields: &FormData, field: Field) -> Result<Vec<String>, CatalogueError> {
    match fields.get(&field) {
        Some(FieldValue::List(values)) => Ok(values.clone()),
        Some(FieldValue::Text(_)) => Err(CatalogueError::Validation {
            field: field.key(),
            reason: "must be a list".to_string(),
        }),
        None => Err(CatalogueError::missing(field.key())),
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rating {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Rating::deserialize(deserializer)? {
        Rating::Text(text) => text,
        Rating::Number(number) => number.to_string(),
    })
}
