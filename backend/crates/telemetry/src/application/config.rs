//! Application Configuration

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Events buffered between the middleware and the worker
    pub queue_capacity: usize,
    /// Events being written at the same time
    pub max_in_flight: usize,
    /// Largest failed-response body kept as the log entry's `error`
    pub error_body_limit: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_in_flight: 64,
            error_body_limit: 64 * 1024,
        }
    }
}

impl TelemetryConfig {
    /// Zero capacities are raised to one
    pub fn normalized(mut self) -> Self {
        self.queue_capacity = self.queue_capacity.max(1);
        self.max_in_flight = self.max_in_flight.max(1);
        self
    }
}
