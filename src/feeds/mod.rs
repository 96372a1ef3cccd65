//! Live ingestion tasks.
//!
//! One streaming subscriber task per exchange plus one periodic poll
//! refresher, all writing into the shared metric store. The supervisor owns
//! task lifecycles and health aggregation; shutdown is coordinated through a
//! broadcast channel.

pub mod poller;
pub mod subscriber;
pub mod supervisor;

pub use poller::PollRefresher;
pub use subscriber::{ConnectionState, StreamSubscriber};
pub use supervisor::FeedSupervisor;
