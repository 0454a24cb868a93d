//! HTTP API for querying the crawled search index.
//!
//! Every endpoint answers JSON. Errors are returned as `{"error": "<message>"}`.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/search` (GET)
//!
//!   Expects a `q` query parameter, e.g. `/search?q=rust%20notes`. Terms are matched
//!   case-insensitively against each document's title, body text and meta description, and any
//!   matching term is enough for a document to be returned.
//!
//!   Returns HTTP 200 (OK) and the matching documents, best first:
//!
//!   ```json
//!   [
//!     { "id": 4, "title": "Rust Notes", "description": "My notes", "url": "notes.dev", "score": 3.2 }
//!   ]
//!   ```
//!
//!   Page text is never included. `description` is omitted for pages without one.
//!
//!   Returns HTTP 400 (Bad Request) if `q` is missing or blank.
//!
//! ## `/random` (GET)
//!
//!   Returns HTTP 200 (OK) and one indexed document chosen at random, in the same form as a
//!   search result without `score`.
//!
//!   Returns HTTP 404 (Not Found) if the index holds no documents.
//!
//! Both `/search` and `/random` return HTTP 503 (Service Unavailable) until the first index has
//! been built, either from the warm-start snapshot or from a live crawl.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
