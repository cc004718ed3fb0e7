//! Tidewave infrastructure provider
//!
//! This crate implements a declarative-infrastructure provider for the
//! Tidewave managed time-series-database platform. A plugin host owns the
//! resource graph (diffing, dependency ordering, plan/apply orchestration)
//! and drives this provider through the fixed entry points of
//! [`ProviderHandler`]; the provider translates those calls into REST
//! requests against the Tidewave control plane and reconciles the remote
//! objects back into host-owned state.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **[`TidewaveProvider`]**: the [`ProviderHandler`] implementation,
//!   dispatching over the `tidewave_service` and `tidewave_vpc` resource
//!   kinds
//! - **Schema types**: declarations the host consumes, including fixed
//!   allow-lists for compute tiers and region codes
//! - **[`Client`]**: the control-plane REST client
//! - **[`StateChange`]**: the readiness poller that blocks service creation
//!   until the remote service reports READY
//! - **Error types**: a [`ProviderError`] taxonomy that keeps timeouts,
//!   cancellations, and control-plane failures distinguishable
//! - **Logging**: integration with `tracing` for structured logging
//! - **Testing**: a harness for driving the provider without a host
//!
//! # Quick Start
//!
//! ```ignore
//! use tidewave_provider::{init_logging, ProviderHandler, TidewaveProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = TidewaveProvider::new();
//!     provider
//!         .configure(serde_json::json!({
//!             "access_key": std::env::var("TIDEWAVE_ACCESS_KEY")?,
//!             "secret_key": std::env::var("TIDEWAVE_SECRET_KEY")?,
//!             "project_id": std::env::var("TIDEWAVE_PROJECT_ID")?,
//!         }))
//!         .await?;
//!
//!     let cancel = CancellationToken::new();
//!     let state = provider
//!         .create(
//!             "tidewave_service",
//!             serde_json::json!({"name": "orders-db", "memory_gb": 4, "milli_cpu": 1000}),
//!             &cancel,
//!         )
//!         .await?;
//!
//!     println!("service ready at {}", state["hostname"]);
//!     Ok(())
//! }
//! ```
//!
//! # Readiness polling
//!
//! Service creation is the one long-running operation: the control plane
//! registers a service shell immediately and provisions it in the
//! background. [`StateChange`] waits an initial delay, then fetches the
//! service on a fixed cadence until it reports READY, a recognized failure
//! status, a fetch error, the configured timeout (default 45 minutes,
//! overridable per resource via `timeouts.create`), or host cancellation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod poll;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod testing;
pub mod validation;

// Re-export main types at crate root
pub use client::Client;
pub use config::{ProviderConfig, Timeouts, DEFAULT_CREATE_TIMEOUT};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use poll::StateChange;
pub use provider::{ProviderHandler, ProviderMetadata, TidewaveProvider};
pub use schema::{Diagnostic, ProviderSchema};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tokio_util;
pub use tracing;
