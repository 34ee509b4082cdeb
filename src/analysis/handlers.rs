use super::context::AnalysisContext;
use super::executions::ExecutionScanner;
use super::method_definition::HandlerMethodDefinition;
use super::request_types::RequestTypeResolver;
use super::shape::SupportedTypesShape;
use super::types::{HandlerDefinition, RequestType, TypeLocation};
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::workspace::semantic::is_declaration_name;
use crate::workspace::symbols::{NamedType, TypeRef};
use crate::workspace::syntax::{
    SyntaxRef, TextSpan, ancestors_and_self, descendants, descendants_and_self, find_node,
};
use std::collections::HashSet;
use std::sync::Arc;
use tree_sitter::Node;

const SUPPORTED_REQUEST_TYPES: &str = "SupportedRequestTypes";

/// Decides whether classes in a document are request handlers.
pub struct HandlerResolver<'a> {
    context: &'a AnalysisContext,
    cancel: &'a CancellationToken,
}

impl<'a> HandlerResolver<'a> {
    pub fn new(context: &'a AnalysisContext, cancel: &'a CancellationToken) -> Self {
        Self { context, cancel }
    }

    /// The first class in document order that is a request handler.
    pub fn try_get_request_handler_from_syntax_tree(&self) -> Result<Option<Arc<HandlerDefinition>>> {
        for node in descendants_and_self(self.context.root()) {
            if node.kind() != "class_declaration" {
                continue;
            }
            if let Some(handler) = self.resolve_class(node)? {
                return Ok(Some(handler));
            }
        }
        Ok(None)
    }

    /// The handler declared by the class enclosing `span`. Only that class is considered.
    pub fn try_get_request_handler_at(&self, span: TextSpan) -> Result<Option<Arc<HandlerDefinition>>> {
        let Some(node) = find_node(self.context.root(), span) else {
            return Ok(None);
        };
        match ancestors_and_self(node).find(|n| n.kind() == "class_declaration") {
            Some(class_node) => self.resolve_class(class_node),
            None => Ok(None),
        }
    }

    /// Every identifier below `node` whose type derives from the request base.
    pub fn find_request_use_locations<C: Clone>(&self, container: C, node: Node<'_>) -> Vec<TypeLocation<C>> {
        let semantic = self.context.semantic();
        descendants(node)
            .filter_map(|candidate| {
                let ty = self.request_type_of(candidate)?;
                Some(TypeLocation {
                    container: container.clone(),
                    type_symbol: Some(ty),
                    location: semantic.location(candidate),
                    syntax: Some(semantic.syntax_ref(candidate)),
                })
            })
            .collect()
    }

    /// Synthesize a request/response pair from the method declaration at or around `span`.
    pub fn try_get_handler_method_definition(&self, span: TextSpan) -> Result<Option<HandlerMethodDefinition>> {
        self.cancel.check()?;
        let semantic = self.context.semantic();
        let method = find_node(self.context.root(), span)
            .and_then(|node| ancestors_and_self(node).find(|n| n.kind() == "method_declaration"))
            .and_then(|node| semantic.declared_member(node))
            .and_then(|member| semantic.method_symbol(member));
        Ok(method.map(|method| HandlerMethodDefinition::from_method(&method, self.context.framework())))
    }

    fn resolve_class(&self, class_node: Node<'_>) -> Result<Option<Arc<HandlerDefinition>>> {
        self.cancel.check()?;
        let Some(class) = self.context.semantic().declared_type(class_node) else {
            return Ok(None);
        };
        let cache = self.context.type_cache();
        if let Some(hit) = cache.handler(&class.identity) {
            return Ok(hit);
        }
        cache.record_handler_resolution();

        let compilation = self.context.compilation();
        let framework = self.context.framework();
        let interface = compilation
            .all_interfaces(&class)
            .into_iter()
            .find(|interface| framework.is_handler_interface(&interface.identity));
        let definition = match interface {
            Some(interface) => Some(Arc::new(self.build_definition(class_node, &class, interface)?)),
            None => None,
        };
        Ok(cache.insert_handler(class.identity, definition))
    }

    fn build_definition(
        &self,
        class_node: Node<'_>,
        class: &NamedType,
        interface: NamedType,
    ) -> Result<HandlerDefinition> {
        let compilation = self.context.compilation();
        let member = compilation.find_implementation_for_interface_member(
            class,
            &interface.identity,
            SUPPORTED_REQUEST_TYPES,
        );
        let shape = SupportedTypesShape::classify(self.context, class, member.as_ref());
        tracing::debug!(class = %class.identity, shape = shape.label(), "request handler found");

        let discovered = match &shape {
            SupportedTypesShape::SameTree { declaration } => self.search_for_request_symbols(*declaration)?,
            other => other.base_request_argument().cloned().into_iter().collect(),
        };
        let resolver = RequestTypeResolver::new(self.context);
        let mut supported: Vec<Arc<RequestType>> = Vec::new();
        for ty in discovered {
            if ty.is_void() {
                continue;
            }
            if let Some(request) = resolver.resolve_request_from_declaring_type(&ty)? {
                if !supported.contains(&request) {
                    supported.push(request);
                }
            }
        }

        let execute_method = match shape.execute_method_name() {
            Some(name) => self.locate_execute_method(class, name)?,
            None => None,
        };
        let request_executions = execute_method
            .and_then(|method| find_node(self.context.root(), method.span))
            .map(|method| ExecutionScanner::new(self.context).find_in(method).collect());

        let semantic = self.context.semantic();
        Ok(HandlerDefinition {
            class_type: class.clone(),
            handler_interface: interface,
            document: self.context.document().id,
            declaration: semantic.location(class_node),
            shape,
            declared_supported_request_types: supported,
            execute_method,
            request_executions,
        })
    }

    /// The execute method among the class's own members, when declared in this document.
    fn locate_execute_method(&self, class: &NamedType, name: &str) -> Result<Option<SyntaxRef>> {
        let members = self.context.compilation().own_members(class, name);
        let Some(declaring) = members.first().and_then(|member| member.declaring()) else {
            return Ok(None);
        };
        if declaring.document != self.context.document().id {
            return Ok(None);
        }
        match find_node(self.context.root(), declaring.span) {
            Some(node) if node.kind() == "method_declaration" => Ok(Some(declaring)),
            _ => Err(Error::UnexpectedExecuteMethodImplementation {
                handler: class.name().to_string(),
                method: name.to_string(),
            }),
        }
    }

    /// Request types named below a `SupportedRequestTypes` declaration. When there are none and the
    /// body returns a variable declared in this document, follow it, a bounded number of times.
    fn search_for_request_symbols(&self, start: SyntaxRef) -> Result<Vec<TypeRef>> {
        let root = self.context.root();
        let document = self.context.document().id;
        let max_depth = self.context.config().max_chase_depth;
        let mut visited = HashSet::new();
        let mut found = Vec::new();
        let mut next = Some(start);

        while let Some(declaration) = next.take() {
            self.cancel.check()?;
            if visited.len() > max_depth || !visited.insert(declaration.span) {
                tracing::debug!(visited = visited.len(), "supported request types chase stopped");
                break;
            }
            let Some(node) = find_node(root, declaration.span) else {
                break;
            };
            let mut last_return = None;
            for candidate in descendants(node) {
                if matches!(candidate.kind(), "return_statement" | "arrow_expression_clause") {
                    last_return = Some(candidate);
                } else if let Some(ty) = self.request_type_of(candidate) {
                    found.push(ty);
                }
            }
            if !found.is_empty() {
                break;
            }
            next = last_return
                .and_then(|returned| returned.named_child(0))
                .filter(|value| value.kind() == "identifier")
                .and_then(|value| self.context.semantic().symbol_of(value))
                .and_then(|symbol| symbol.declaring())
                .filter(|declaring| declaring.document == document);
        }
        Ok(found)
    }

    fn request_type_of(&self, node: Node<'_>) -> Option<TypeRef> {
        if node.kind() != "identifier" || is_declaration_name(node) {
            return None;
        }
        let ty = self.context.semantic().type_of(node)?;
        self.context
            .compilation()
            .is_derived_from(&ty, &self.context.framework().request)
            .then_some(ty)
    }
}
