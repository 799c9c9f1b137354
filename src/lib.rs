//! # Study Helper
//!
//! A local-first study assistant. Upload a PDF, get model-generated study
//! notes, and ask free-form questions grounded in the document's text — all
//! against a locally hosted language model (Ollama-compatible
//! `/api/generate` endpoint).
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────┐   ┌───────────┐
//! │ PDF file │──▶│ Extractor │──▶│  Session /  │──▶│   Model   │
//! └──────────┘   └───────────┘   │ Controller  │   │  (HTTP)   │
//!                                └──────┬──────┘   └───────────┘
//!                                       │
//!                         ┌─────────────┴───────┐
//!                         ▼                     ▼
//!                   ┌──────────┐          ┌──────────┐
//!                   │   CLI    │          │ Web UI   │
//!                   │ (study)  │          │ (axum)   │
//!                   └──────────┘          └──────────┘
//! ```
//!
//! Three flat files in the data directory record everything durable:
//! `extracted_content.txt`, `summary_and_key_points.txt`, and the
//! append-only `chat_history.txt`.
//!
//! ## Quick Start
//!
//! ```bash
//! study summarize ./lecture3.pdf
//! study ask "What are the key definitions?"
//! study history
//! study serve        # browser UI on 127.0.0.1:8080
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF text extraction |
//! | [`storage`] | Durable file persistence |
//! | [`model`] | Generate-endpoint client and response assembly |
//! | [`session`] | Conversation controller and per-session state |
//! | [`server`] | Browser UI and JSON API |

pub mod config;
pub mod extract;
pub mod model;
pub mod server;
pub mod session;
pub mod storage;
