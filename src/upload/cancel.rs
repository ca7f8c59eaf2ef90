//! Per-attempt cancellation handles

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A revocable handle tied to one upload attempt.
///
/// Clones share the same token and identity. Identity is what lets a
/// finishing request tell whether it is still the attempt the controller
/// cares about.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: Uuid,
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Token to hand to the request
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_same(&self, other: &CancelHandle) -> bool {
        self.id == other.id
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}
