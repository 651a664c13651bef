//! Service layer: the State Store, the Work Queue and the Coordinator,
//! plus the retry, locking and event plumbing they share.

pub mod coordinator;
pub mod coordinator_daemon;
pub mod event_bus;
pub mod keyed_lock;
pub mod state_store;
pub mod storage_retry;
pub mod team_formation;
pub mod work_queue;

pub use coordinator::{Coordinator, CoordinatorStatus, PerformanceReport, RebalanceReport};
pub use coordinator_daemon::{CoordinatorDaemon, DaemonHandle, DaemonTask, TaskStats};
pub use event_bus::{BroadcastEventSink, EventBusConfig};
pub use keyed_lock::KeyedLocks;
pub use state_store::StateStore;
pub use storage_retry::RetryPolicy;
pub use team_formation::{FormationRequest, Selection};
pub use work_queue::{SlingRequest, WorkQueue};
