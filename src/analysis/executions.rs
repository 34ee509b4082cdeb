use super::context::AnalysisContext;
use super::request_types::RequestTypeResolver;
use super::types::RequestExecution;
use crate::workspace::semantic::invocation_arguments;
use crate::workspace::syntax::{Descendants, descendants};
use std::collections::VecDeque;
use tree_sitter::Node;

const EXECUTE_METHOD_NAMES: &[&str] = &["Execute", "ExecuteAsync"];

/// Finds calls that dispatch a request through the framework.
pub struct ExecutionScanner<'a> {
    context: &'a AnalysisContext,
}

impl<'a> ExecutionScanner<'a> {
    pub fn new(context: &'a AnalysisContext) -> Self {
        Self { context }
    }

    /// Every request execution in the document.
    pub fn find_all(&self) -> Executions<'a> {
        self.find_in(self.context.root())
    }

    /// Request executions at or below `node`, in document order. Each call restarts the scan.
    pub fn find_in(&self, node: Node<'a>) -> Executions<'a> {
        Executions {
            context: self.context,
            start: Some(node),
            nodes: descendants(node),
            pending: VecDeque::new(),
        }
    }
}

/// Lazy scan over a subtree. Nothing is cached.
pub struct Executions<'a> {
    context: &'a AnalysisContext,
    start: Option<Node<'a>>,
    nodes: Descendants<'a>,
    pending: VecDeque<RequestExecution>,
}

impl Iterator for Executions<'_> {
    type Item = RequestExecution;

    fn next(&mut self) -> Option<RequestExecution> {
        loop {
            if let Some(execution) = self.pending.pop_front() {
                return Some(execution);
            }
            let node = match self.start.take() {
                Some(start) => start,
                None => self.nodes.next()?,
            };
            if node.kind() == "invocation_expression" {
                self.inspect(node);
            }
        }
    }
}

impl Executions<'_> {
    fn inspect(&mut self, invocation: Node<'_>) {
        let context = self.context;
        let semantic = context.semantic();
        let Some(method) = semantic.invoked_method(invocation) else {
            return;
        };
        if !EXECUTE_METHOD_NAMES.contains(&method.name()) {
            return;
        }
        let request_base = &context.framework().request;
        let arguments = invocation_arguments(invocation);
        let resolver = RequestTypeResolver::new(context);
        for (parameter, argument) in method.parameters.iter().zip(arguments) {
            if parameter.ty.identity() != Some(request_base) {
                continue;
            }
            let Some(ty) = semantic.type_of(argument) else {
                continue;
            };
            if ty.is_void() {
                continue;
            }
            let Ok(Some(request)) = resolver.resolve_request_from_declaring_type(&ty) else {
                continue;
            };
            tracing::trace!(request = %request, "request execution");
            self.pending.push_back(RequestExecution {
                request,
                call_site: semantic.location(invocation),
                invocation: semantic.syntax_ref(invocation),
            });
        }
    }
}
