//! Long-running agent processes.
//!
//! A **collector** polls a security product on a fixed period and reports
//! what it saw; an **injector** executes orders pushed to it over a message
//! queue. Both register with the platform at start-up and keep a presence
//! heartbeat running until shut down.
//!
//! ```ignore
//! let collector = CollectorDaemon::new(Configuration::load(hints)?)?
//!     .on_tick(|ctx| async move {
//!         // fetch alerts, match expectations, report through ctx.api
//!         Ok(())
//!     });
//! shutdown_on_signal(collector.shutdown_token());
//! collector.start().await?;
//! ```

pub mod collector;
pub mod daemon;
pub mod error;
pub mod heartbeat;
pub mod injector;
pub mod scheduler;

#[cfg(test)]
mod fake_api;

pub use collector::{CollectorCallback, CollectorDaemon, DEFAULT_PERIOD_SECONDS};
pub use daemon::{
    api_from_configuration, daemon_id, init_daemon_logging, shutdown_on_signal, DaemonContext,
    BAS_TOKEN, BAS_URL,
};
pub use error::DaemonError;
pub use heartbeat::{HeartbeatHandle, HeartbeatWorker, PingFn, DEFAULT_HEARTBEAT_INTERVAL};
pub use injector::{InjectorCallback, InjectorDaemon};
pub use scheduler::{Job, PeriodicScheduler};
