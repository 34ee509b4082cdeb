use std::sync::Arc;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the resolution engine.
///
/// Unsupported code shapes (partial classes, unresolved cross-tree bases) are not errors: they
/// resolve to empty results. Only precondition and assumption violations end up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "cannot create analysis context for project {project}: caller required to halt on error ({cause})"
    )]
    CannotCreateAnalysisContext {
        project: String,
        #[source]
        cause: Arc<Error>,
    },

    #[error(
        "a reference to the framework couldn't be found in project {project} (missing: {}); make sure the framework is referenced",
        missing.join(", ")
    )]
    CannotResolveFrameworkReference {
        project: String,
        missing: Vec<String>,
    },

    #[error(
        "a reference to the framework couldn't be found in project {project}, which has {diagnostics} compilation error(s)"
    )]
    CannotResolveFrameworkReferenceDueToCompilationError { project: String, diagnostics: usize },

    #[error(
        "the request handler {handler} has an unknown syntax node for its request execution method '{method}'; a method declaration was expected"
    )]
    UnexpectedExecuteMethodImplementation { handler: String, method: String },

    #[error(
        "the selected token is not a type; make sure a type is selected and there are no compilation errors"
    )]
    NotAType,

    #[error("the selected type '{0}' does not implement the contract of a request type")]
    NotARequestType(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("cannot build fan-out worker pool")]
    FanOutPool(#[from] rayon::ThreadPoolBuildError),

    #[error("workspace error: {0}")]
    Workspace(String),
}

impl Error {
    /// Stable name of the error kind, used by reports.
    pub fn code(&self) -> &'static str {
        match self {
            Error::CannotCreateAnalysisContext { .. } => "CannotCreateAnalysisContext",
            Error::CannotResolveFrameworkReference { .. } => "CannotResolveFrameworkReference",
            Error::CannotResolveFrameworkReferenceDueToCompilationError { .. } => {
                "CannotResolveFrameworkReferenceDueToCompilationError"
            }
            Error::UnexpectedExecuteMethodImplementation { .. } => {
                "UnexpectedExecuteMethodImplementation"
            }
            Error::NotAType => "NotAType",
            Error::NotARequestType(_) => "NotARequestType",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::Cancelled => "Cancelled",
            Error::FanOutPool(_) => "FanOutPool",
            Error::Workspace(_) => "Workspace",
        }
    }
}
