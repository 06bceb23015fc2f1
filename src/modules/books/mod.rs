pub mod dispatch;
pub mod error;
pub mod form;
pub mod models;
pub mod presenter;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use shelfbot_http::error::AppError;
use shelfbot_kernel::settings::Settings;
use shelfbot_kernel::{InitCtx, Module};

use dispatch::{Dispatcher, Update};
use models::Book;
use presenter::Reply;

/// Book catalogue feature: chat dispatch plus read-only catalogue endpoints
pub struct BooksModule {
    dispatcher: Arc<Dispatcher>,
    create_if_missing: bool,
}

impl BooksModule {
    pub fn new(dispatcher: Arc<Dispatcher>, create_if_missing: bool) -> Self {
        Self {
            dispatcher,
            create_if_missing,
        }
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let store = self.dispatcher.store();
        if self.create_if_missing {
            store.ensure_exists().await?;
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            catalogue = %store.path().display(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books))
            .route("/health", get(health_check))
            .route("/updates", post(handle_update))
            .route("/{index}", get(get_book))
            .with_state(self.dispatcher.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List the catalogue",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "All books in insertion order",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "503": error_response("Catalogue file missing or unreadable")
                        }
                    }
                },
                "/{index}": {
                    "get": {
                        "summary": "Get the book at a zero-based position",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "index",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "integer", "minimum": 0 }
                        }],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": error_response("Index outside the catalogue"),
                            "503": error_response("Catalogue file missing or unreadable")
                        }
                    }
                },
                "/updates": {
                    "post": {
                        "summary": "Deliver one chat event and receive the bot's replies",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Update" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Replies to send back to the user",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/UpdateResponse" }
                                    }
                                }
                            },
                            "400": error_response("Update carries neither text nor callback")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Books health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "description": { "type": "string" },
                            "rating": { "type": "string" },
                            "genre": { "type": "string" },
                            "authors": { "type": "array", "items": { "type": "string" } },
                            "poster": { "type": "string", "format": "uri" }
                        },
                        "required": ["name", "description", "rating", "genre", "authors", "poster"]
                    },
                    "Update": {
                        "type": "object",
                        "properties": {
                            "user_id": { "type": "integer", "minimum": 0 },
                            "user_name": { "type": "string" },
                            "text": { "type": "string", "description": "Message text" },
                            "callback": {
                                "type": "string",
                                "description": "List selection payload such as book:3"
                            }
                        },
                        "required": ["user_id"]
                    },
                    "UpdateResponse": {
                        "type": "object",
                        "properties": {
                            "replies": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "text": { "type": "string" },
                                        "buttons": {
                                            "type": "array",
                                            "items": {
                                                "type": "object",
                                                "properties": {
                                                    "label": { "type": "string" },
                                                    "callback": { "type": "string" }
                                                }
                                            }
                                        },
                                        "photo": {
                                            "type": "object",
                                            "properties": {
                                                "filename": { "type": "string" },
                                                "content_type": { "type": "string" },
                                                "data_base64": { "type": "string" }
                                            }
                                        }
                                    },
                                    "required": ["text"]
                                }
                            }
                        },
                        "required": ["replies"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            open_forms = self.dispatcher.sessions().len(),
            "books module stopped"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    replies: Vec<Reply>,
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(dispatcher): State<Arc<Dispatcher>>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(dispatcher.store().list_books().await?))
}

async fn get_book(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(index): Path<usize>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(dispatcher.store().get_book(index).await?))
}

/// Webhook entry point: one chat event in, the bot's replies out
async fn handle_update(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(update): Json<Update>,
) -> Result<Json<UpdateResponse>, AppError> {
    if update.event().is_none() {
        return Err(AppError::bad_request(
            "update must carry either `text` or `callback`",
        ));
    }

    let replies = dispatcher.dispatch(&update).await;
    Ok(Json(UpdateResponse { replies }))
}

/// Create the books module over the configured catalogue
pub fn create_module(settings: &Settings) -> anyhow::Result<Arc<BooksModule>> {
    let dispatcher = Dispatcher::from_settings(settings)?;
    Ok(Arc::new(BooksModule::new(
        Arc::new(dispatcher),
        settings.storage.create_if_missing,
    )))
}
