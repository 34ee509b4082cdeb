use super::context::ContextFactory;
use super::handlers::HandlerResolver;
use super::request_types::RequestTypeResolver;
use super::types::{HandlerDefinition, RequestExecution, RequestType, TypeLocation};
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::workspace::DocumentId;
use crate::workspace::symbols::TypeRef;
use crate::workspace::syntax::{Location, find_node, token_at};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

pub type ImplementationLocation = TypeLocation<Arc<HandlerDefinition>>;

/// One request a handler executes, and where that request is implemented.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    pub execution: RequestExecution,
    pub implementation: Option<ImplementationLocation>,
}

/// Ties request types back to the handlers that implement them, across the whole solution.
pub struct DependencyResolver {
    pool: rayon::ThreadPool,
}

impl DependencyResolver {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("reqtrace-fanout-{i}"));
        if config.fanout_threads > 0 {
            builder = builder.num_threads(config.fanout_threads);
        }
        Ok(Self { pool: builder.build()? })
    }

    /// Run `op` on the fan-out pool, so nested parallel iterators share its thread bound.
    fn in_pool<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    /// The handler declaring support for `request`, located at the place its execute method uses
    /// the request, or at the class declaration when it does not.
    pub fn find_request_implementation(
        &self,
        factory: &ContextFactory,
        request: &RequestType,
        cancel: &CancellationToken,
    ) -> Result<Option<ImplementationLocation>> {
        cancel.check()?;
        let target = request.declaring_type();
        let Some(identity) = target.identity() else {
            return Ok(None);
        };
        let groups = self.in_pool(|| factory.solution().find_references(identity, cancel))?;
        let locations: Vec<Location> = groups
            .iter()
            .find(|group| &group.definition == identity || group.definition.name() == identity.name())
            .map(|group| group.locations.clone())
            .unwrap_or_default();
        tracing::debug!(request = %request, references = locations.len(), "searching for implementation");

        let mut candidates: Vec<(Location, Option<Arc<HandlerDefinition>>)> = self.in_pool(|| {
            locations
                .par_iter()
                .map(|location| {
                    cancel.check()?;
                    let Some(context) = factory.try_create_context_for(location.document, cancel)? else {
                        return Ok((location.clone(), None));
                    };
                    let handler = HandlerResolver::new(&context, cancel).try_get_request_handler_at(location.span)?;
                    Ok((location.clone(), handler))
                })
                .collect::<Result<Vec<_>>>()
        })?;
        candidates.sort_by(|(a, _), (b, _)| a.sort_key().cmp(&b.sort_key()));

        let Some(handler) = candidates
            .into_iter()
            .filter_map(|(_, handler)| handler)
            .find(|handler| handler.supports(request))
        else {
            tracing::debug!(request = %request, "no handler implements request");
            return Ok(None);
        };

        let context = factory.create_context_for(handler.document, cancel)?;
        let resolver = HandlerResolver::new(&context, cancel);
        let uses = handler
            .execute_method
            .and_then(|method| find_node(context.root(), method.span))
            .map(|method| resolver.find_request_use_locations(handler.clone(), method))
            .unwrap_or_default();
        let display = target.to_string();
        let found = uses.into_iter().find(|used| {
            used.type_symbol
                .as_ref()
                .is_some_and(|ty| ty == target || ty.to_string() == display)
        });
        Ok(Some(found.unwrap_or_else(|| TypeLocation {
            container: handler.clone(),
            type_symbol: None,
            location: handler.declaration.clone(),
            syntax: None,
        })))
    }

    /// Resolve the request type at or just above `offset` in `document`, then find its
    /// implementation.
    pub fn find_request_implementation_at(
        &self,
        factory: &ContextFactory,
        document: DocumentId,
        offset: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<ImplementationLocation>> {
        let context = factory.create_context_for(document, cancel)?;
        let semantic = context.semantic();
        let mut node = token_at(context.root(), offset);
        let mut ty: Option<TypeRef> = None;
        for _ in 0..factory.config().ancestor_search_depth {
            let Some(current) = node else {
                break;
            };
            ty = semantic.type_of(current);
            if ty.is_some() {
                break;
            }
            node = current.parent();
        }
        let ty = ty.ok_or(Error::NotAType)?;
        let request = RequestTypeResolver::new(&context)
            .resolve_request_from_declaring_type(&ty)?
            .ok_or_else(|| Error::NotARequestType(ty.simple_name()))?;
        self.find_request_implementation(factory, &request, cancel)
    }

    /// Every request `handler` executes, paired with the handler implementing it.
    pub fn dependency_graph(
        &self,
        factory: &ContextFactory,
        handler: &HandlerDefinition,
        cancel: &CancellationToken,
    ) -> Result<Vec<DependencyEdge>> {
        let mut resolved: HashMap<TypeRef, Option<ImplementationLocation>> = HashMap::new();
        let mut edges = Vec::new();
        for execution in handler.request_executions.iter().flatten() {
            let key = execution.request.declaring_type().clone();
            let implementation = match resolved.get(&key) {
                Some(hit) => hit.clone(),
                None => {
                    let found = self.find_request_implementation(factory, &execution.request, cancel)?;
                    resolved.insert(key, found.clone());
                    found
                }
            };
            edges.push(DependencyEdge {
                execution: execution.clone(),
                implementation,
            });
        }
        Ok(edges)
    }
}
