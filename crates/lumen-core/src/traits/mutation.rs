use crate::models::MutationEvent;

/// Subscriber to store mutations (used by caches for invalidation).
pub trait IMutationListener: Send + Sync {
    fn on_mutation(&self, event: &MutationEvent);
}
