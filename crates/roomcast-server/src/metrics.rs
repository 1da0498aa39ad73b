//! Metrics collection and export for Roomcast.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "roomcast_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "roomcast_connections_active";
    pub const MESSAGES_TOTAL: &str = "roomcast_messages_total";
    pub const MESSAGES_BYTES: &str = "roomcast_messages_bytes";
    pub const REQUESTS_TOTAL: &str = "roomcast_requests_total";
    pub const CHATS_ACTIVE: &str = "roomcast_chats_active";
    pub const CHAT_EVENTS_TOTAL: &str = "roomcast_chat_events_total";
    pub const MEMBERSHIP_CHANGES_TOTAL: &str = "roomcast_membership_changes_total";
    pub const BROADCAST_RECIPIENTS: &str = "roomcast_broadcast_recipients";
    pub const LATENCY_SECONDS: &str = "roomcast_latency_seconds";
    pub const ERRORS_TOTAL: &str = "roomcast_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of connections since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of active connections"
    );
    metrics::describe_counter!(names::MESSAGES_TOTAL, "Total number of messages processed");
    metrics::describe_counter!(names::MESSAGES_BYTES, "Total bytes of messages processed");
    metrics::describe_counter!(names::REQUESTS_TOTAL, "Requests handled, by command");
    metrics::describe_gauge!(names::CHATS_ACTIVE, "Current number of chats");
    metrics::describe_counter!(names::CHAT_EVENTS_TOTAL, "Chats created and deleted");
    metrics::describe_counter!(
        names::MEMBERSHIP_CHANGES_TOTAL,
        "Clients joining, leaving or evicted from a chat"
    );
    metrics::describe_histogram!(
        names::BROADCAST_RECIPIENTS,
        "Deliveries dispatched per broadcast"
    );
    metrics::describe_histogram!(
        names::LATENCY_SECONDS,
        "Message processing latency in seconds"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a new connection.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a disconnection.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a message.
pub fn record_message(bytes: usize, direction: &str) {
    counter!(names::MESSAGES_TOTAL, "direction" => direction.to_string()).increment(1);
    counter!(names::MESSAGES_BYTES, "direction" => direction.to_string()).increment(bytes as u64);
}

/// Record a handled request.
pub fn record_request(command: &'static str) {
    counter!(names::REQUESTS_TOTAL, "command" => command).increment(1);
}

/// Record the fan-out of one broadcast.
pub fn record_broadcast(recipients: usize) {
    histogram!(names::BROADCAST_RECIPIENTS).record(recipients as f64);
}

/// Record message latency.
pub fn record_latency(seconds: f64) {
    histogram!(names::LATENCY_SECONDS).record(seconds);
}

/// Update active chat count.
pub fn set_active_chats(count: usize) {
    gauge!(names::CHATS_ACTIVE).set(count as f64);
}

/// Record a created chat; `remaining` is the chat count afterwards.
pub fn record_chat_created(remaining: usize) {
    counter!(names::CHAT_EVENTS_TOTAL, "event" => "created").increment(1);
    set_active_chats(remaining);
}

/// Record a deleted chat; `remaining` is the chat count afterwards.
pub fn record_chat_deleted(remaining: usize) {
    counter!(names::CHAT_EVENTS_TOTAL, "event" => "deleted").increment(1);
    set_active_chats(remaining);
}

/// How a client's room changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Left,
    /// Forced out because the chat was deleted.
    Evicted,
}

impl MembershipChange {
    /// Label value, also used as the announced event name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::Left => "left",
            Self::Evicted => "evicted",
        }
    }
}

/// Record `clients` membership changes of one kind.
pub fn record_membership(change: MembershipChange, clients: usize) {
    if clients > 0 {
        counter!(names::MEMBERSHIP_CHANGES_TOTAL, "change" => change.as_str())
            .increment(clients as u64);
    }
}

/// Record an error.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

/// Metrics guard that records disconnection on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a connection.
    #[must_use]
    pub fn new() -> Self {
        record_connection();
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        record_disconnection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_guard() {
        // No recorder installed; recording must be a silent no-op
        let _guard = ConnectionMetricsGuard::new();
        record_request("join");
        record_broadcast(3);
        record_chat_created(1);
        record_membership(MembershipChange::Evicted, 0);
    }

    #[test]
    fn test_membership_change_labels() {
        assert_eq!(MembershipChange::Joined.as_str(), "joined");
        assert_eq!(MembershipChange::Left.as_str(), "left");
        assert_eq!(MembershipChange::Evicted.as_str(), "evicted");
    }
}
