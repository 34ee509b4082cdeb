use super::declarations::{DeclPart, extract_declarations};
use super::parse_csharp;
use crate::error::Result;
use std::sync::{Arc, OnceLock};

/// A referenced assembly known only through its declarations.
#[derive(Debug)]
pub struct MetadataAssembly {
    pub name: Arc<str>,
    pub types: Vec<DeclPart>,
}

impl MetadataAssembly {
    /// Build an assembly from declaration-only C# source. Bodies are ignored and no syntax
    /// references survive.
    pub fn from_source(name: &str, source: &str) -> Result<Self> {
        let tree = parse_csharp(source)?;
        let name: Arc<str> = Arc::from(name);
        let types = extract_declarations(tree.root_node(), source, &name, None);
        Ok(Self { name, types })
    }
}

pub const COMMERCE_RUNTIME_ASSEMBLY: &str = "Microsoft.Dynamics.Commerce.Runtime";

const COMMERCE_RUNTIME_SOURCE: &str = r#"
namespace Microsoft.Dynamics.Commerce.Runtime.Messages
{
    public abstract class Request
    {
        public RequestContext RequestContext { get; set; }
    }

    public abstract class Response
    {
    }

    public sealed class NullResponse : Response
    {
    }
}

namespace Microsoft.Dynamics.Commerce.Runtime
{
    using System;
    using System.Collections.Generic;
    using System.Threading.Tasks;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public interface IRequestHandler
    {
        IEnumerable<Type> SupportedRequestTypes { get; }

        Response Execute(Request request);
    }

    public interface IRequestHandlerAsync
    {
        IEnumerable<Type> SupportedRequestTypes { get; }

        Task<Response> Execute(Request request);
    }

    public sealed class CommerceRuntime
    {
        public TResponse Execute<TResponse>(Request request, RequestContext context);

        public Task<TResponse> ExecuteAsync<TResponse>(Request request, RequestContext context);
    }

    public sealed class RequestContext
    {
        public CommerceRuntime Runtime { get; }

        public TResponse Execute<TResponse>(Request request);

        public Task<TResponse> ExecuteAsync<TResponse>(Request request);
    }

    public abstract class SingleRequestHandler<TRequest, TResponse> : IRequestHandler
    {
        public IEnumerable<Type> SupportedRequestTypes { get; }

        public Response Execute(Request request);

        protected abstract TResponse Process(TRequest request);
    }

    public abstract class SingleAsyncRequestHandler<TRequest> : IRequestHandlerAsync
    {
        public IEnumerable<Type> SupportedRequestTypes { get; }

        public Task<Response> Execute(Request request);

        protected abstract Task<Response> Process(TRequest request);
    }

    public abstract class SingleAsyncRequestHandler<TRequest, TResponse> : IRequestHandlerAsync
    {
        public IEnumerable<Type> SupportedRequestTypes { get; }

        public Task<Response> Execute(Request request);

        protected abstract Task<TResponse> Process(TRequest request);
    }
}
"#;

static COMMERCE_RUNTIME: OnceLock<Arc<MetadataAssembly>> = OnceLock::new();

/// The framework assembly, parsed once per process.
pub fn commerce_runtime() -> Result<Arc<MetadataAssembly>> {
    if let Some(assembly) = COMMERCE_RUNTIME.get() {
        return Ok(assembly.clone());
    }
    let assembly = Arc::new(MetadataAssembly::from_source(
        COMMERCE_RUNTIME_ASSEMBLY,
        COMMERCE_RUNTIME_SOURCE,
    )?);
    Ok(COMMERCE_RUNTIME.get_or_init(|| assembly).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_types_have_no_source() {
        let assembly = commerce_runtime().expect("framework");
        let names: Vec<&str> = assembly
            .types
            .iter()
            .map(|part| &*part.decl.identity.metadata_name)
            .collect();
        assert!(names.contains(&"Microsoft.Dynamics.Commerce.Runtime.Messages.Request"));
        assert!(names.contains(&"Microsoft.Dynamics.Commerce.Runtime.SingleAsyncRequestHandler`2"));
        assert!(assembly.types.iter().all(|part| part.decl.is_metadata()));
    }
}
