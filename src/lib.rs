//! # DataSynergy
//!
//! A data-access façade for a dashboard product: a registry of external
//! data sources, connection testing, schema introspection and export,
//! direct queries, an advisory query optimizer, heuristic quality reports
//! and a natural-language bridge with a local fallback. Backing stores are
//! simulated, so the whole service runs offline.
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────┐
//!   CLI (dsyn) ─▶│              │──▶ SourceRegistry ──▶ SourceStore (in-memory)
//!                │ DataService  │──▶ Tester / Schema / Query / Quality
//!   HTTP (axum) ▶│              │──▶ Backend (simulated)
//!                └──────┬───────┘
//!                       ▼
//!                   NlBridge ──▶ AI backend (HTTP) ─╳─▶ local responder
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dsyn sources                          # list the demo sources
//! dsyn query 1 "SELECT * FROM users"    # run a query
//! dsyn ask "Tell me about GenePoint"    # natural-language question
//! dsyn serve                            # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`backend`] | Backing-store trait |
//! | [`simulated`] | Simulated backing store |
//! | [`registry`] | Source registry and status state machine |
//! | [`tester`] | Connection tester |
//! | [`schema`] | Schema introspection and export |
//! | [`query`] | Query execution, optimizer and samples |
//! | [`quality`] | Quality analysis |
//! | [`ai`] | Remote AI backend client |
//! | [`nl`] | Natural-language bridge with fallback |
//! | [`insights`] | Insight feed and dashboard summary |
//! | [`seed`] | Demo data |
//! | [`service`] | The `DataService` façade |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command handlers |

pub mod ai;
pub mod backend;
pub mod commands;
pub mod config;
pub mod insights;
pub mod logging;
pub mod nl;
pub mod quality;
pub mod query;
pub mod registry;
pub mod schema;
pub mod seed;
pub mod server;
pub mod service;
pub mod simulated;
pub mod tester;

pub use datasynergy_core::{models, ConnectionFailure, Result, ServiceError};
pub use service::DataService;
