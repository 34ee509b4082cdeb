use super::context::AnalysisContext;
use super::docs::DocComment;
use super::types::{Member, MemberedType, RequestType, ResponseType};
use crate::error::{Error, Result};
use crate::workspace::compilation::MemberRef;
use crate::workspace::symbols::{MemberKind, NamedType, TypeIdentity, TypeRef};
use std::collections::HashSet;
use std::sync::Arc;

/// Maps type symbols to request and response types through the project's type cache.
pub struct RequestTypeResolver<'a> {
    context: &'a AnalysisContext,
}

impl<'a> RequestTypeResolver<'a> {
    pub fn new(context: &'a AnalysisContext) -> Self {
        Self { context }
    }

    /// The request declared by `ty`, or `None` when `ty` does not derive from the request base.
    /// Both outcomes are cached.
    pub fn resolve_request_from_declaring_type(&self, ty: &TypeRef) -> Result<Option<Arc<RequestType>>> {
        if ty.is_void() {
            return Err(Error::InvalidArgument(
                "a declaring type is required to resolve a request".to_string(),
            ));
        }
        let cache = self.context.type_cache();
        if let Some(hit) = cache.request(ty) {
            return Ok(hit);
        }
        cache.record_request_check();
        let framework = self.context.framework();
        let request = match ty.named() {
            Some(named) if self.context.compilation().is_derived_from(ty, &framework.request) => {
                let shape = self.membered_type(named, &framework.request, framework.request_base_class_fqn());
                Some(Arc::new(RequestType::new(ty.clone(), shape)))
            }
            _ => None,
        };
        tracing::trace!(ty = %ty, request = request.is_some(), "request check");
        Ok(cache.insert_request(ty.clone(), request))
    }

    pub fn resolve_response_from_declaring_type(&self, ty: &TypeRef) -> Result<Option<Arc<ResponseType>>> {
        if ty.is_void() {
            return Err(Error::InvalidArgument(
                "a declaring type is required to resolve a response".to_string(),
            ));
        }
        let cache = self.context.type_cache();
        if let Some(hit) = cache.response(ty) {
            return Ok(hit);
        }
        cache.record_response_check();
        let framework = self.context.framework();
        let response = match ty.named() {
            Some(named) if self.context.compilation().is_derived_from(ty, &framework.response) => {
                let shape =
                    self.membered_type(named, &framework.response, framework.response_base_class_fqn());
                Some(Arc::new(ResponseType::new(Some(ty.clone()), shape)))
            }
            _ => None,
        };
        Ok(cache.insert_response(ty.clone(), response))
    }

    fn membered_type(&self, named: &NamedType, stop_at: &TypeIdentity, base_class_name: String) -> MemberedType {
        let compilation = self.context.compilation();
        let decl = compilation.type_decl(&named.identity);
        MemberedType {
            name: named.name().to_string(),
            namespace: decl.map(|decl| decl.namespace.clone()).unwrap_or_default(),
            base_class_name,
            members: self.members_of(named, stop_at),
            documentation: DocComment::parse(decl.and_then(|decl| decl.documentation.as_deref())).summary,
        }
    }

    /// Public instance properties, own declarations first, then inherited ones up to `stop_at`.
    fn members_of(&self, named: &NamedType, stop_at: &TypeIdentity) -> Vec<Member> {
        let compilation = self.context.compilation();
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        let owners = std::iter::once(named.clone())
            .chain(compilation.base_chain(named))
            .take_while(|owner| &owner.identity != stop_at);
        for owner in owners {
            let Some(decl) = compilation.type_decl(&owner.identity) else {
                continue;
            };
            for (index, member) in decl.members.iter().enumerate() {
                let MemberKind::Property { writable, .. } = member.kind else {
                    continue;
                };
                if !member.is_public || member.is_static || !seen.insert(member.name.clone()) {
                    continue;
                }
                let reference = MemberRef {
                    containing: owner.clone(),
                    decl: decl.clone(),
                    index,
                };
                let documentation = DocComment::parse(member.documentation.as_deref()).summary;
                members.push(Member::new(
                    member.name.clone(),
                    compilation.member_type(&reference),
                    documentation,
                    writable,
                ));
            }
        }
        members
    }
}
