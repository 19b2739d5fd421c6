//! The periodic background maintenance task (§4.6).
//!
//! [`run`] loops until told to stop: each iteration re-resolves every
//! finger entry but the first, then pings the current successor, retrying
//! up to a configured number of times before logging it as dead. The loop
//! is cancellable (§9 redesign note: "model as a cancellable periodic task
//! with a shutdown signal observed before each sleep").

use crate::procedures;
use crate::routing::NodeState;
use log::{info, warn};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Duration;

/// Tunables governing one stabilization cycle.
pub struct StabilizationConfig {
    pub stabilize_delay_secs: u64,
    pub ping_max_retries: u32,
    pub ping_retry_delay_secs: u64,
    pub connection_timeout_ms: u64,
}

/// Runs the stabilization loop until `shutdown` fires, sleeping
/// `config.stabilize_delay_secs` between iterations. Returns once the
/// shutdown signal is observed.
pub fn run(state: &Mutex<NodeState>, config: &StabilizationConfig, shutdown: &Receiver<()>) {
    loop {
        if wait_or_shutdown(shutdown, Duration::from_secs(config.stabilize_delay_secs)) {
            return;
        }

        tick(state, config);
    }
}

/// One stabilization cycle: `fix_fingers()` then a successor liveness probe.
fn tick(state: &Mutex<NodeState>, config: &StabilizationConfig) {
    info!("stabilizing routing information");

    NodeState::fix_fingers(state, config.connection_timeout_ms);

    let (self_addr, successor) = {
        let guard = state.lock().unwrap();
        (guard.addr, guard.successor())
    };

    if successor == self_addr {
        return;
    }

    for attempt in 1..=config.ping_max_retries {
        match procedures::ping(successor, self_addr, config.connection_timeout_ms) {
            Ok(()) => return,
            Err(err) => {
                warn!("ping attempt {}/{} to successor {} failed: {}", attempt, config.ping_max_retries, successor, err);
                if attempt < config.ping_max_retries {
                    std::thread::sleep(Duration::from_secs(config.ping_retry_delay_secs));
                }
            }
        }
    }

    warn!("successor {} is down", successor);
}

/// Blocks for `delay` or until `shutdown` fires, whichever comes first.
/// Returns `true` if shutdown was observed.
fn wait_or_shutdown(shutdown: &Receiver<()>, delay: Duration) -> bool {
    match shutdown.recv_timeout(delay) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}
