//! Leader-elected synthetic match tracker.
//!
//! Many processes run the same periodic job; a lock with expiry makes one of
//! them the leader for each cycle. The leader resolves the tracked match,
//! synthesizes play-by-play events from durable counters, queues them for
//! delivery and writes the counters back so the next leader resumes from
//! them. Without a reachable lock backend every process leads.

pub mod config;
pub mod context;
pub mod delivery;
pub mod emitter;
pub mod envelope;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod random;
pub mod scheduler;
pub mod selection;
pub mod service;
pub mod storage;
pub mod synthesis;
pub mod testing;
pub mod tracker_storage;
pub mod types;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use service::TrackerService;
