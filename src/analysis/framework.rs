use super::types::{MemberedType, ResponseType};
use crate::error::{Error, Result};
use crate::workspace::compilation::Compilation;
use crate::workspace::symbols::TypeIdentity;
use std::sync::Arc;

const RUNTIME_NAMESPACE: &str = "Microsoft.Dynamics.Commerce.Runtime";
const MESSAGES_NAMESPACE: &str = "Microsoft.Dynamics.Commerce.Runtime.Messages";

pub const REQUEST_METADATA_NAME: &str = "Microsoft.Dynamics.Commerce.Runtime.Messages.Request";
pub const RESPONSE_METADATA_NAME: &str = "Microsoft.Dynamics.Commerce.Runtime.Messages.Response";
pub const NULL_RESPONSE_METADATA_NAME: &str =
    "Microsoft.Dynamics.Commerce.Runtime.Messages.NullResponse";
pub const REQUEST_HANDLER_METADATA_NAME: &str = "Microsoft.Dynamics.Commerce.Runtime.IRequestHandler";
pub const REQUEST_HANDLER_ASYNC_METADATA_NAME: &str =
    "Microsoft.Dynamics.Commerce.Runtime.IRequestHandlerAsync";
pub const SINGLE_REQUEST_HANDLER_METADATA_NAME: &str =
    "Microsoft.Dynamics.Commerce.Runtime.SingleRequestHandler`2";
pub const SINGLE_ASYNC_REQUEST_HANDLER_METADATA_NAME: &str =
    "Microsoft.Dynamics.Commerce.Runtime.SingleAsyncRequestHandler`1";
pub const SINGLE_ASYNC_REQUEST_HANDLER_WITH_RESPONSE_METADATA_NAME: &str =
    "Microsoft.Dynamics.Commerce.Runtime.SingleAsyncRequestHandler`2";

/// The well-known framework types as seen from one project's compilation.
#[derive(Debug)]
pub struct FrameworkReference {
    pub request: TypeIdentity,
    pub response: TypeIdentity,
    pub null_response: TypeIdentity,
    pub request_handler: TypeIdentity,
    pub request_handler_async: TypeIdentity,
    pub single_request_handler: TypeIdentity,
    pub single_async_request_handler: TypeIdentity,
    pub single_async_request_handler_with_response: TypeIdentity,
    void_response: Arc<ResponseType>,
}

impl FrameworkReference {
    /// Look every framework type up by metadata name. A project that cannot see them is either
    /// not a framework project or does not compile.
    pub fn resolve(compilation: &Compilation, project_name: &str) -> Result<Self> {
        let mut missing = Vec::new();
        let mut lookup = |metadata_name: &str| match compilation.type_by_metadata_name(metadata_name) {
            Some(decl) => Some(decl.identity.clone()),
            None => {
                missing.push(metadata_name.to_string());
                None
            }
        };
        let request = lookup(REQUEST_METADATA_NAME);
        let response = lookup(RESPONSE_METADATA_NAME);
        let null_response = lookup(NULL_RESPONSE_METADATA_NAME);
        let request_handler = lookup(REQUEST_HANDLER_METADATA_NAME);
        let request_handler_async = lookup(REQUEST_HANDLER_ASYNC_METADATA_NAME);
        let single_request_handler = lookup(SINGLE_REQUEST_HANDLER_METADATA_NAME);
        let single_async_request_handler = lookup(SINGLE_ASYNC_REQUEST_HANDLER_METADATA_NAME);
        let single_async_request_handler_with_response =
            lookup(SINGLE_ASYNC_REQUEST_HANDLER_WITH_RESPONSE_METADATA_NAME);

        let (
            Some(request),
            Some(response),
            Some(null_response),
            Some(request_handler),
            Some(request_handler_async),
            Some(single_request_handler),
            Some(single_async_request_handler),
            Some(single_async_request_handler_with_response),
        ) = (
            request,
            response,
            null_response,
            request_handler,
            request_handler_async,
            single_request_handler,
            single_async_request_handler,
            single_async_request_handler_with_response,
        )
        else {
            let diagnostics = compilation.error_count();
            if diagnostics > 0 {
                return Err(Error::CannotResolveFrameworkReferenceDueToCompilationError {
                    project: project_name.to_string(),
                    diagnostics,
                });
            }
            return Err(Error::CannotResolveFrameworkReference {
                project: project_name.to_string(),
                missing,
            });
        };

        let void_response = Arc::new(ResponseType::void(MemberedType {
            name: null_response.name().to_string(),
            namespace: MESSAGES_NAMESPACE.to_string(),
            base_class_name: response.display_name(),
            members: Vec::new(),
            documentation: String::new(),
        }));

        Ok(Self {
            request,
            response,
            null_response,
            request_handler,
            request_handler_async,
            single_request_handler,
            single_async_request_handler,
            single_async_request_handler_with_response,
            void_response,
        })
    }

    pub fn runtime_namespace(&self) -> &'static str {
        RUNTIME_NAMESPACE
    }

    pub fn request_base_class_fqn(&self) -> String {
        self.request.display_name()
    }

    pub fn response_base_class_fqn(&self) -> String {
        self.response.display_name()
    }

    /// The singleton "no response" marker. Compare with `Arc::ptr_eq`.
    pub fn void_response(&self) -> &Arc<ResponseType> {
        &self.void_response
    }

    pub fn is_handler_interface(&self, identity: &TypeIdentity) -> bool {
        identity == &self.request_handler || identity == &self.request_handler_async
    }

    /// Whether `identity` is one of the generic single-request handler bases.
    pub fn is_single_handler_shape(&self, identity: &TypeIdentity) -> bool {
        identity == &self.single_request_handler
            || identity == &self.single_async_request_handler
            || identity == &self.single_async_request_handler_with_response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::SolutionBuilder;

    #[test]
    fn resolves_from_framework_project() {
        let solution = SolutionBuilder::new()
            .project("Handlers", |p| {
                p.framework()
                    .expect("framework")
                    .document("Empty.cs", "namespace Contoso { class Empty { } }")
            })
            .build()
            .expect("solution");
        let project = &solution.projects()[0];
        let compilation = solution.compilation(project.id).expect("compilation");
        let framework = FrameworkReference::resolve(&compilation, "Handlers").expect("framework");
        assert_eq!(framework.request.name(), "Request");
        assert!(framework.is_handler_interface(&framework.request_handler_async));
        assert!(framework.is_single_handler_shape(&framework.single_request_handler));
        assert!(framework.void_response().is_void);
        assert_eq!(framework.void_response().shape.name, "NullResponse");
        assert_eq!(
            framework.request_base_class_fqn(),
            "Microsoft.Dynamics.Commerce.Runtime.Messages.Request"
        );
    }

    #[test]
    fn missing_framework_lists_types() {
        let solution = SolutionBuilder::new()
            .project("Plain", |p| p.document("Empty.cs", "class Empty { }"))
            .build()
            .expect("solution");
        let compilation = solution.compilation(solution.projects()[0].id).expect("compilation");
        match FrameworkReference::resolve(&compilation, "Plain") {
            Err(Error::CannotResolveFrameworkReference { project, missing }) => {
                assert_eq!(project, "Plain");
                assert_eq!(missing.len(), 8);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn compile_errors_explain_missing_framework() {
        let solution = SolutionBuilder::new()
            .project("Broken", |p| p.document("Broken.cs", "class Broken { void M( }"))
            .build()
            .expect("solution");
        let compilation = solution.compilation(solution.projects()[0].id).expect("compilation");
        assert!(matches!(
            FrameworkReference::resolve(&compilation, "Broken"),
            Err(Error::CannotResolveFrameworkReferenceDueToCompilationError { .. })
        ));
    }
}
