//! Message loop configuration.

/// Configuration for a [`MessageLoop`](crate::MessageLoop).
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Initial capacity of each of the two message queues.
    pub queue_capacity: usize,
    /// Emit a `trace` event for every message delivered to a system.
    pub trace_dispatch: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            trace_dispatch: false,
        }
    }
}

impl LoopConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Enable or disable per-message dispatch tracing.
    #[must_use]
    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = LoopConfig::new()
            .with_queue_capacity(8)
            .with_trace_dispatch(true);
        assert_eq!(config.queue_capacity, 8);
        assert!(config.trace_dispatch);
        assert!(!LoopConfig::default().trace_dispatch);
    }
}
