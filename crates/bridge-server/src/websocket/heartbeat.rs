//! Heartbeat liveness monitoring.
//!
//! Each tick checks the alive flag that inbound Pongs (and any other frame)
//! set, then queues the next Ping. A ping therefore always has one full
//! interval to be answered before it is checked.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Consecutive silent intervals tolerated before timing out.
///
/// `timeout / interval`, clamped to at least 1.
pub fn max_missed(interval: Duration, timeout: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    u32::try_from(timeout.as_millis() / interval_ms)
        .unwrap_or(u32::MAX)
        .max(1)
}

/// Ping a connection and watch its liveness until it times out or `cancel`
/// fires.
///
/// The first ping goes out one `interval` after the start. At every tick the
/// alive flag is checked and reset before the next ping is queued; the flag
/// starts set, so the first tick never counts as a miss. Once [`max_missed`]
/// consecutive ticks pass without activity the connection is considered dead.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut ping_interval = time::interval(interval);
    let mut missed_pongs: u32 = 0;
    let max_missed = max_missed(interval, timeout);

    // first tick fires immediately
    let _ = ping_interval.tick().await;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if connection.check_alive() {
                    missed_pongs = 0;
                } else {
                    missed_pongs += 1;
                    if missed_pongs >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
                if connection.ping() {
                    trace!(client_id = %connection.id, "ping queued");
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}
