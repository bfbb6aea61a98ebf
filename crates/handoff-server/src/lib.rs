//! # handoff-server
//!
//! HTTP bridge between a system of record and a rendering service.
//!
//! ## Routes
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /healthz` | Liveness |
//! | `GET /view?id=<token>` | Validate a token and seal the subject's artifact |
//! | `GET /artifact/{handle}` | Release the ciphertext once |
//! | `GET /generate-link?subject=` | Mint a test link (only with `enable_link_generator`) |
//!
//! Token failures of every kind answer 401 with the same body; vault misses
//! answer 404 whatever the reason.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod source;
pub mod state;

pub use error::ServerError;
pub use routes::create_router;
pub use server::{HandoffServer, spawn_sweeper};
pub use source::{Artifact, ArtifactSource, DirectorySource, SourceError};
pub use state::AppState;
