//! Request handler resolution on top of the workspace front-end.
//!
//! Everything starts from a [`ContextFactory`], the analysis session that memoizes per-project and
//! per-document state. Resolvers borrow an [`AnalysisContext`] from it.

pub mod context;
pub mod dependencies;
pub mod docs;
pub mod executions;
pub mod framework;
pub mod handlers;
pub mod method_definition;
pub mod request_types;
pub mod shape;
pub mod type_cache;
pub mod types;

pub use context::{AnalysisContext, ContextFactory, FactoryStats, ProjectCache};
pub use dependencies::{DependencyEdge, DependencyResolver, ImplementationLocation};
pub use executions::ExecutionScanner;
pub use framework::FrameworkReference;
pub use handlers::HandlerResolver;
pub use method_definition::HandlerMethodDefinition;
pub use request_types::RequestTypeResolver;
pub use shape::SupportedTypesShape;
pub use type_cache::{StatsSnapshot, TypeCache};
pub use types::{
    HandlerDefinition, Member, MemberedType, RequestExecution, RequestType, ResponseType, TypeLocation,
};
