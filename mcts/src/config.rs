//! Search configuration.

use std::time::Duration;

/// Configuration of a Monte Carlo engine.
#[derive(Debug, Clone)]
pub struct UctConfig {
    /// Ceiling on live tree nodes before garbage pruning kicks in.
    pub max_nodes: usize,

    /// Minimum elapsed time between progress reports.
    pub report_interval: Duration,

    /// Number of pruning iterations to run at once.
    pub prune_iterations: usize,
}

impl Default for UctConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1 << 20,
            report_interval: Duration::from_millis(450),
            prune_iterations: 20,
        }
    }
}

impl UctConfig {
    /// Builder pattern: set the live node ceiling.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Builder pattern: set the report interval.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Builder pattern: set the pruning batch size.
    pub fn with_prune_iterations(mut self, iterations: usize) -> Self {
        self.prune_iterations = iterations;
        self
    }
}
