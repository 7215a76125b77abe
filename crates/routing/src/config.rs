//! Engine configuration shared by the allocator and the batch runner.

use serde::{Deserialize, Serialize};

/// How candidate widths are explored for a requested pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidthOrder {
    /// Try every width from the endpoint maximum down to 1 and let the
    /// strategy's preference arbitrate.
    Descending,
    /// Evaluate only the endpoint maximum.
    Fixed,
}

/// Recognized engine options. Physical parameters (`alpha`, `q`, `k`) ride
/// on the topology itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Enables recovery-path planning and the repair engine.
    pub allow_recovery: bool,
    pub width_order: WidthOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_recovery: true,
            width_order: WidthOrder::Descending,
        }
    }
}
