//! Fetch layer: request descriptors and their resilient execution
//!
//! This module handles:
//! - Shaping catalog requests ([`Catalog`], [`FetchTask`])
//! - Bounded concurrency and cooldown ([`Admission`])
//! - Connection pool replacement and recycling ([`SessionPool`])
//! - Retry with exponential backoff under a hard deadline ([`Fetcher`])

pub mod admission;
pub mod fetcher;
pub mod session;
pub mod task;

pub use admission::Admission;
pub use fetcher::{backoff_delay, Fetcher};
pub use session::{build_http_client, RecoveryReason, Session, SessionPool};
pub use task::{Catalog, FetchTask, MaslulQuery, TaskKind};
