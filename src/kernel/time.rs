use serde::{Deserialize, Serialize};

/// Logical clock of the controller. Advances once per processed event,
/// so telemetry can order what happened without reading wall time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tick {
    pub step: u64,
}

impl Tick {
    pub fn new() -> Self {
        Tick { step: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { step: self.step + 1 }
    }

    pub fn since(&self, earlier: Tick) -> u64 {
        self.step.saturating_sub(earlier.step)
    }
}
