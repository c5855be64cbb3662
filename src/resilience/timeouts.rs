//! Per-call timeout selection.
//!
//! Every detail call carries an explicit budget: the upstream default, or a
//! tighter one for ids known to respond slowly so a single call cannot hold
//! its batch slot for the full default.

use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CallTimeouts {
    default: Duration,
    slow: Duration,
    slow_ids: HashSet<String>,
}

impl CallTimeouts {
    pub fn new<I, S>(default: Duration, slow: Duration, slow_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default,
            slow,
            slow_ids: slow_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Effective budget for `id`.
    pub fn for_id(&self, id: &str) -> Duration {
        if self.slow_ids.contains(id) {
            self.slow
        } else {
            self.default
        }
    }
}
