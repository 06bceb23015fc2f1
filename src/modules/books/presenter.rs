//! Reply rendering: the selectable catalogue list and the book detail card.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Serialize, Serializer};

use super::error::CatalogueError;
use super::models::Book;

const CALLBACK_PREFIX: &str = "book:";

/// One outbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
            photo: None,
        }
    }
}

/// A selectable entry; pressing it sends `callback` back to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub callback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    pub filename: String,
    pub content_type: Option<String>,
    #[serde(rename = "data_base64", serialize_with = "as_base64")]
    pub data: Vec<u8>,
}

fn as_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
}

/// Callback payload for the list entry at `index`.
pub fn callback_data(index: usize) -> String {
    format!("{CALLBACK_PREFIX}{index}")
}

/// Index carried by a list selection, if `data` is one.
pub fn parse_callback(data: &str) -> Option<usize> {
    data.strip_prefix(CALLBACK_PREFIX)?.parse().ok()
}

pub fn catalogue_reply(books: &[Book]) -> Reply {
    if books.is_empty() {
        return Reply::text("The catalogue is empty. Use /create_book to add the first book.");
    }

    Reply {
        text: "Books in the catalogue. Tap a title for details.".to_string(),
        buttons: books
            .iter()
            .enumerate()
            .map(|(index, book)| Button {
                label: book.name.clone(),
                callback: callback_data(index),
            })
            .collect(),
        photo: None,
    }
}

pub fn details_text(book: &Book) -> String {
    format!(
        "Book: {}\nDescription: {}\nRating: {}\nGenre: {}\nAuthors: {}\n",
        book.name,
        book.description,
        book.rating,
        book.genre,
        book.authors.join(",")
    )
}

/// Detail card with the cover attached, or text only if the cover fails.
pub async fn book_reply(book: &Book, images: &dyn ImageFetcher) -> Reply {
    let mut reply = Reply::text(details_text(book));

    match images.fetch(&book.poster).await {
        Ok(image) => {
            reply.photo = Some(Photo {
                filename: book.cover_filename(),
                content_type: image.content_type,
                data: image.data,
            });
        }
        Err(err) => {
            tracing::error!(book = %book.name, error = %err, "failed to load cover image");
        }
    }

    reply
}

/// Raw cover bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, CatalogueError>;
}

/// Downloads covers over HTTP.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, CatalogueError> {
        let failed = |reason: String| CatalogueError::ImageFetchFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| failed(err.to_string()))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(kind) = content_type.as_deref() {
            if !kind.starts_with("image/") {
                return Err(failed(format!("unexpected content type {kind}")));
            }
        }

        let data = response
            .bytes()
            .await
            .map_err(|err| failed(err.to_string()))?;

        Ok(FetchedImage {
            content_type,
            data: data.to_vec(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Serves a fixed image, or fails for every URL.
    pub(crate) struct StubFetcher {
        pub image: Option<FetchedImage>,
    }

    #[async_trait]
    impl ImageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedImage, CatalogueError> {
            self.image
                .clone()
                .ok_or_else(|| CatalogueError::ImageFetchFailed {
                    url: url.to_string(),
                    reason: "unreachable".to_string(),
                })
        }
    }

    fn dune() -> Book {
        Book {
            name: "Dune".to_string(),
            description: "desert".to_string(),
            rating: "9".to_string(),
            genre: "sci-fi".to_string(),
            authors: vec!["Frank Herbert".to_string(), "Kevin J. Anderson".to_string()],
            poster: "http://x/y.jpg".to_string(),
        }
    }

    #[test]
    fn list_entries_call_back_with_their_index() {
        let mut second = dune();
        second.name = "Emma".to_string();

        let reply = catalogue_reply(&[dune(), second]);

        assert_eq!(reply.buttons.len(), 2);
        assert_eq!(reply.buttons[1].label, "Emma");
        assert_eq!(parse_callback(&reply.buttons[1].callback), Some(1));
    }

    #[test]
    fn empty_catalogue_has_no_buttons() {
        let reply = catalogue_reply(&[]);
        assert!(reply.buttons.is_empty());
        assert!(reply.text.contains("/create_book"));
    }

    #[test]
    fn parse_callback_rejects_foreign_data() {
        assert_eq!(parse_callback("book:12"), Some(12));
        assert_eq!(parse_callback("book:-1"), None);
        assert_eq!(parse_callback("author:1"), None);
        assert_eq!(parse_callback("book:"), None);
    }

    #[test]
    fn details_join_authors_with_comma() {
        assert_eq!(
            details_text(&dune()),
            "Book: Dune\nDescription: desert\nRating: 9\nGenre: sci-fi\nAuthors: Frank Herbert,Kevin J. Anderson\n"
        );
    }

    #[tokio::test]
    async fn cover_is_attached_when_fetched() {
        let images = StubFetcher {
            image: Some(FetchedImage {
                content_type: Some("image/jpeg".to_string()),
                data: vec![0xff, 0xd8],
            }),
        };

        let reply = book_reply(&dune(), &images).await;
        let photo = reply.photo.expect("photo attached");

        assert_eq!(photo.filename, "Dune_cover.jpg");
        assert_eq!(photo.data, vec![0xff, 0xd8]);
        assert_eq!(
            serde_json::to_value(&photo).unwrap()["data_base64"],
            serde_json::json!("/9g=")
        );
    }

    #[tokio::test]
    async fn cover_failure_falls_back_to_text() {
        let images = StubFetcher { image: None };

        let reply = book_reply(&dune(), &images).await;

        assert!(reply.photo.is_none());
        assert_eq!(reply.text, details_text(&dune()));
    }
}
