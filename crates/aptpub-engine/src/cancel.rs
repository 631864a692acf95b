//! Cooperative cancellation for long-running operations

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{EngineError, Result};

/// Shared cancellation flag
///
/// Cloning shares the flag. Operations check it between remote calls and
/// stop with [`EngineError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(flag.check().is_ok());

        other.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(EngineError::Cancelled)));
    }
}
