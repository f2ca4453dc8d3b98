//! fieldsync - write-through cache and sync layer for per-user time-series
//! documents in Firestore.
//!
//! One remote document per entity id holds named partitions of timestamped
//! records. `SyncManager` mirrors that document in memory, serves reads
//! from the mirror (lazily populating it on first access), and propagates
//! every write to the remote store before committing it locally, so the
//! remote store is always at least as fresh as the cache.
//!
//! ```no_run
//! use fieldsync::{Config, FirestoreClient, Record, SyncManager};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let client = FirestoreClient::new(&config, "u1")?.with_token("id-token".to_string());
//! let mut manager = SyncManager::create(client).await;
//!
//! manager.create_partition("steps").await;
//! manager
//!     .add("steps", Record::new(chrono::Utc::now(), vec![1.0, 2.0, 3.0]))
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod codec;
pub mod config;
pub mod models;
pub mod remote;
pub mod sync;

pub use auth::{Session, SessionData};
pub use cache::{Mirror, MirrorError};
pub use codec::MalformedRecord;
pub use config::Config;
pub use models::{DocumentData, Record};
pub use remote::{FirestoreClient, RemoteError, RemoteStore};
pub use sync::SyncManager;
