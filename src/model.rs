use crate::analysis::{DependencyEdge, HandlerDefinition, ImplementationLocation};
use crate::error::Error;
use crate::workspace::syntax::Location;
use serde::Serialize;

#[derive(Debug, Serialize, Clone)]
pub struct LocationReport {
    pub path: String,
    pub line: usize,
    pub column: usize,
    pub display: String,
}

impl From<&Location> for LocationReport {
    fn from(location: &Location) -> Self {
        LocationReport {
            path: location.path.to_string(),
            line: location.start_line,
            column: location.start_column,
            display: location.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        ErrorReport {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ImplementationReport {
    pub handler: String,
    pub request_type: Option<String>,
    pub location: LocationReport,
}

impl From<&ImplementationLocation> for ImplementationReport {
    fn from(found: &ImplementationLocation) -> Self {
        ImplementationReport {
            handler: found.container.class_type.identity.display_name(),
            request_type: found.type_symbol.as_ref().map(ToString::to_string),
            location: LocationReport::from(&found.location),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ExecutionReport {
    pub request: String,
    pub call_site: LocationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<ImplementationReport>,
}

#[derive(Debug, Serialize, Clone)]
pub struct HandlerReport {
    pub class: String,
    pub interface: String,
    pub shape: String,
    pub supported_request_types: Vec<String>,
    pub declaration: LocationReport,
    /// `None` when the execute method could not be resolved.
    pub executions: Option<Vec<ExecutionReport>>,
}

impl HandlerReport {
    pub fn new(handler: &HandlerDefinition) -> Self {
        HandlerReport {
            class: handler.class_type.identity.display_name(),
            interface: handler.handler_interface.identity.display_name(),
            shape: handler.shape.label().to_string(),
            supported_request_types: handler
                .declared_supported_request_types
                .iter()
                .map(|request| request.declaring_type().to_string())
                .collect(),
            declaration: LocationReport::from(&handler.declaration),
            executions: handler.request_executions.as_ref().map(|executions| {
                executions
                    .iter()
                    .map(|execution| ExecutionReport {
                        request: execution.request.declaring_type().to_string(),
                        call_site: LocationReport::from(&execution.call_site),
                        implementation: None,
                    })
                    .collect()
            }),
        }
    }

    /// Replace the executions with the resolved dependency edges.
    pub fn with_dependencies(mut self, edges: &[DependencyEdge]) -> Self {
        self.executions = Some(
            edges
                .iter()
                .map(|edge| ExecutionReport {
                    request: edge.execution.request.declaring_type().to_string(),
                    call_site: LocationReport::from(&edge.execution.call_site),
                    implementation: edge.implementation.as_ref().map(ImplementationReport::from),
                })
                .collect(),
        );
        self
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct DocumentReport {
    pub document: String,
    pub project: String,
    pub is_handler: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Serialize, Clone)]
pub struct AnalyzeReport {
    pub solution: String,
    pub projects: usize,
    pub documents: Vec<DocumentReport>,
}
