pub mod controller;
pub mod error;
pub mod events;
pub mod log_streamer;
pub mod namespace;
pub mod pod_tracker;
pub mod query;
pub mod wait_job;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::polling::PollingConfig;
use crate::kubernetes_objects::client::BootJobApi;
use crate::shutdown::Shutdown;

use self::error::BootJobError;
use self::events::{BootEvent, EventSink};

pub use self::log_streamer::LogOptions;
pub use self::pod_tracker::{JobProgress, PodStatusMemo};

/// Absolute end of a polling operation, fixed when the operation starts.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    configured: Duration,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self {
            at: Instant::now() + duration,
            configured: duration,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() > self.at
    }

    pub fn configured(&self) -> Duration {
        self.configured
    }

    pub(crate) fn timeout(&self) -> BootJobError {
        BootJobError::timeout(self.configured)
    }
}

/// Everything one invocation of the controller needs. Owns no per-wait state.
pub struct BootJobContext<A> {
    pub(crate) api: A,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) shutdown: Shutdown,
    pub(crate) polling: PollingConfig,
}

impl<A: BootJobApi> BootJobContext<A> {
    pub fn new(
        api: A,
        events: Arc<dyn EventSink>,
        shutdown: Shutdown,
        polling: PollingConfig,
    ) -> Self {
        Self {
            api,
            events,
            shutdown,
            polling,
        }
    }

    pub(crate) fn emit(&self, event: BootEvent) {
        self.events.emit(event);
    }

    /// Sleeps between polls, failing with `Cancelled` if shutdown arrives first.
    pub(crate) async fn pause<F>(&self, interval: Duration, activity: F) -> Result<(), BootJobError>
    where
        F: FnOnce() -> String,
    {
        let mut shutdown = self.shutdown.clone();
        match shutdown.sleep_or_shutdown(interval).await {
            None => Ok(()),
            Some(signal) => Err(BootJobError::Cancelled {
                signal,
                activity: activity(),
            }),
        }
    }
}
