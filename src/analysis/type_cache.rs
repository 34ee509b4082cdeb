use super::types::{HandlerDefinition, RequestType, ResponseType};
use crate::workspace::symbols::{TypeIdentity, TypeRef};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for the work a cache saved or did.
#[derive(Debug, Default)]
pub struct ResolutionStats {
    handler_resolutions: AtomicUsize,
    request_checks: AtomicUsize,
    response_checks: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub handler_resolutions: usize,
    pub request_checks: usize,
    pub response_checks: usize,
}

/// Project-scoped memoization of request, response and handler resolution. Negative results are
/// stored as `None`. Entries are insert-once: the first writer wins and nothing is evicted.
#[derive(Debug, Default)]
pub struct TypeCache {
    requests: DashMap<TypeRef, Option<Arc<RequestType>>>,
    responses: DashMap<TypeRef, Option<Arc<ResponseType>>>,
    handlers: DashMap<TypeIdentity, Option<Arc<HandlerDefinition>>>,
    stats: ResolutionStats,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(None)` is a cached negative.
    pub fn request(&self, ty: &TypeRef) -> Option<Option<Arc<RequestType>>> {
        self.requests.get(ty).map(|entry| entry.value().clone())
    }

    pub fn insert_request(&self, ty: TypeRef, value: Option<Arc<RequestType>>) -> Option<Arc<RequestType>> {
        self.requests.entry(ty).or_insert(value).value().clone()
    }

    pub fn response(&self, ty: &TypeRef) -> Option<Option<Arc<ResponseType>>> {
        self.responses.get(ty).map(|entry| entry.value().clone())
    }

    pub fn insert_response(
        &self,
        ty: TypeRef,
        value: Option<Arc<ResponseType>>,
    ) -> Option<Arc<ResponseType>> {
        self.responses.entry(ty).or_insert(value).value().clone()
    }

    pub fn handler(&self, class: &TypeIdentity) -> Option<Option<Arc<HandlerDefinition>>> {
        self.handlers.get(class).map(|entry| entry.value().clone())
    }

    pub fn insert_handler(
        &self,
        class: TypeIdentity,
        value: Option<Arc<HandlerDefinition>>,
    ) -> Option<Arc<HandlerDefinition>> {
        self.handlers.entry(class).or_insert(value).value().clone()
    }

    pub fn cached_handlers(&self) -> usize {
        self.handlers.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            handler_resolutions: self.stats.handler_resolutions.load(Ordering::Relaxed),
            request_checks: self.stats.request_checks.load(Ordering::Relaxed),
            response_checks: self.stats.response_checks.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_handler_resolution(&self) {
        self.stats.handler_resolutions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request_check(&self) {
        self.stats.request_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_response_check(&self) {
        self.stats.response_checks.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::MemberedType;
    use crate::workspace::symbols::NamedType;

    fn named(name: &str) -> TypeRef {
        TypeRef::Named(NamedType {
            identity: TypeIdentity::new("Contracts", name),
            args: Vec::new(),
        })
    }

    #[test]
    fn first_writer_wins() {
        let cache = TypeCache::new();
        let ty = named("Contoso.GetOrderRequest");
        let first = Arc::new(RequestType::new(ty.clone(), MemberedType::default()));
        let stored = cache.insert_request(ty.clone(), Some(first.clone()));
        assert!(stored.is_some_and(|stored| Arc::ptr_eq(&stored, &first)));

        let kept = cache.insert_request(ty.clone(), None);
        assert!(kept.is_some_and(|kept| Arc::ptr_eq(&kept, &first)));
    }

    #[test]
    fn negatives_are_cached() {
        let cache = TypeCache::new();
        let ty = named("Contoso.Order");
        assert!(cache.request(&ty).is_none());
        cache.insert_request(ty.clone(), None);
        assert_eq!(cache.request(&ty).map(|hit| hit.is_none()), Some(true));
    }
}
