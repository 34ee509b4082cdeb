use reqtrace::analysis::{ContextFactory, HandlerDefinition, HandlerResolver, SupportedTypesShape};
use reqtrace::config::Config;
use reqtrace::workspace::metadata::MetadataAssembly;
use reqtrace::workspace::syntax::TextSpan;
use reqtrace::workspace::{Solution, SolutionBuilder};
use reqtrace::{CancellationToken, Error};
use std::sync::Arc;

const CONTRACTS: &str = r#"
namespace Contoso.Orders
{
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    /// <summary>Reads one order.</summary>
    public sealed class GetOrderRequest : Request
    {
        public GetOrderRequest(string orderId)
        {
            this.OrderId = orderId;
        }

        /// <summary>The order id.</summary>
        public string OrderId { get; private set; }

        public int Version { get; }
    }

    public sealed class GetOrderResponse : Response
    {
        public string Status { get; set; }
    }

    public sealed class GetCustomerRequest : Request
    {
        public GetCustomerRequest(string customerId)
        {
            this.CustomerId = customerId;
        }

        public string CustomerId { get; set; }
    }

    public sealed class GetCustomerResponse : Response
    {
    }

    public sealed class OrderLine
    {
        public string ItemId { get; set; }
    }
}
"#;

const HANDLERS: &str = r#"
namespace Contoso.Orders
{
    using System;
    using System.Collections.Generic;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class OrderFormatter
    {
        public string Format(GetOrderResponse response)
        {
            return response.Status;
        }
    }

    public sealed class OrderHandler : IRequestHandler
    {
        public IEnumerable<Type> SupportedRequestTypes
        {
            get { return new[] { typeof(GetOrderRequest) }; }
        }

        public Response Execute(Request request)
        {
            var getOrder = (GetOrderRequest)request;
            var customer = request.RequestContext.Execute<GetCustomerResponse>(new GetCustomerRequest(getOrder.OrderId));
            var again = request.RequestContext.Execute<GetCustomerResponse>(new GetCustomerRequest("42"));
            return new GetOrderResponse();
        }
    }

    public sealed class SecondHandler : IRequestHandler
    {
        public IEnumerable<Type> SupportedRequestTypes => new[] { typeof(GetCustomerRequest) };

        public Response Execute(Request request)
        {
            return new GetCustomerResponse();
        }
    }
}
"#;

const INDIRECT: &str = r#"
namespace Contoso.Orders
{
    using System;
    using System.Collections.Generic;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class IndirectHandler : IRequestHandler
    {
        private static readonly Type[] Supported = new[] { typeof(GetOrderRequest), typeof(GetCustomerRequest) };

        public IEnumerable<Type> SupportedRequestTypes
        {
            get { return Supported; }
        }

        public Response Execute(Request request)
        {
            return null;
        }
    }
}
"#;

const METADATA_BASE: &str = r#"
namespace Contoso.Orders
{
    using Microsoft.Dynamics.Commerce.Runtime;

    public sealed class CustomerHandler : SingleRequestHandler<GetCustomerRequest, GetCustomerResponse>
    {
        protected override GetCustomerResponse Process(GetCustomerRequest request)
        {
            var order = request.RequestContext.Execute<GetOrderResponse>(new GetOrderRequest(request.CustomerId));
            return new GetCustomerResponse();
        }
    }
}
"#;

const PARTIAL_EXECUTE: &str = r#"
namespace Contoso.Orders
{
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed partial class SplitHandler : IRequestHandler
    {
        public Response Execute(Request request)
        {
            return request.RequestContext.Execute<GetOrderResponse>(new GetOrderRequest("1"));
        }
    }
}
"#;

const PARTIAL_SUPPORTED: &str = r#"
namespace Contoso.Orders
{
    using System;
    using System.Collections.Generic;

    public sealed partial class SplitHandler
    {
        public IEnumerable<Type> SupportedRequestTypes => new[] { typeof(GetOrderRequest) };
    }
}
"#;

const FIELD_EXECUTE: &str = r#"
namespace Contoso.Orders
{
    using System;
    using System.Collections.Generic;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class OddHandler : IRequestHandler
    {
        public IEnumerable<Type> SupportedRequestTypes => new[] { typeof(GetOrderRequest) };

        public Func<Request, Response> Execute = request => null;
    }
}
"#;

const HANDCRAFTED: &str = r#"
namespace Contoso.Orders
{
    using Microsoft.Dynamics.Commerce.Runtime;

    public sealed partial class ArchiveHandler : SingleRequestHandler<GetOrderRequest, GetOrderResponse>
    {
        protected override GetOrderResponse Process(GetOrderRequest request)
        {
            return new GetOrderResponse();
        }
    }
}
"#;

const HANDCRAFTED_SUPPORTED: &str = r#"
namespace Contoso.Orders
{
    using System;
    using System.Collections.Generic;

    public sealed partial class ArchiveHandler
    {
        public new IEnumerable<Type> SupportedRequestTypes => new[] { typeof(GetCustomerRequest) };
    }
}
"#;

const LEGACY_ASSEMBLY: &str = r#"
namespace Contoso.Legacy
{
    using System;
    using System.Collections.Generic;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public abstract class LegacyHandler : IRequestHandler
    {
        public IEnumerable<Type> SupportedRequestTypes { get; }

        public Response Execute(Request request);
    }
}
"#;

const LEGACY_DERIVED: &str = r#"
namespace Contoso.Orders
{
    using Contoso.Legacy;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class AuditHandler : LegacyHandler
    {
        public Response Audit(Request request)
        {
            return request.RequestContext.Execute<GetOrderResponse>(new GetOrderRequest("1"));
        }
    }
}
"#;

const CYCLIC: &str = r#"
namespace Contoso.Orders
{
    using System;
    using System.Collections.Generic;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class LoopHandler : IRequestHandler
    {
        private IEnumerable<Type> First
        {
            get { return Second; }
        }

        private IEnumerable<Type> Second => First;

        public IEnumerable<Type> SupportedRequestTypes => First;

        public Response Execute(Request request)
        {
            return null;
        }
    }
}
"#;

fn solution() -> Arc<Solution> {
    SolutionBuilder::new()
        .project("Contoso.Orders", |p| {
            p.framework()
                .expect("framework")
                .document("Contracts.cs", CONTRACTS)
                .document("Handlers.cs", HANDLERS)
                .document("IndirectHandler.cs", INDIRECT)
                .document("CustomerHandler.cs", METADATA_BASE)
                .document("SplitHandler.cs", PARTIAL_EXECUTE)
                .document("SplitHandler.Supported.cs", PARTIAL_SUPPORTED)
                .document("OddHandler.cs", FIELD_EXECUTE)
        })
        .build()
        .expect("solution")
}

fn shapes_factory(config: Config) -> (Arc<Solution>, ContextFactory) {
    let legacy = Arc::new(MetadataAssembly::from_source("Contoso.Legacy", LEGACY_ASSEMBLY).expect("legacy"));
    let solution = SolutionBuilder::new()
        .project("Contoso.Orders", |p| {
            p.framework()
                .expect("framework")
                .metadata(legacy)
                .document("Contracts.cs", CONTRACTS)
                .document("ArchiveHandler.cs", HANDCRAFTED)
                .document("ArchiveHandler.Supported.cs", HANDCRAFTED_SUPPORTED)
                .document("AuditHandler.cs", LEGACY_DERIVED)
                .document("LoopHandler.cs", CYCLIC)
        })
        .build()
        .expect("solution");
    let factory = ContextFactory::with_config(solution.clone(), config);
    (solution, factory)
}

fn handler_in(solution: &Solution, factory: &ContextFactory, document: &str) -> Arc<HandlerDefinition> {
    let cancel = CancellationToken::new();
    let id = solution.document_by_name(document).expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler")
}

fn factory() -> (Arc<Solution>, ContextFactory) {
    let solution = solution();
    let factory = ContextFactory::with_config(solution.clone(), Config::default());
    (solution, factory)
}

#[test]
fn first_handler_in_document_order_wins() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("Handlers.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");

    let handler = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");
    assert_eq!(handler.class_type.name(), "OrderHandler");
    assert_eq!(handler.handler_interface.name(), "IRequestHandler");
    assert_eq!(handler.document, id);
    assert!(matches!(handler.shape, SupportedTypesShape::SameTree { .. }));

    let supported: Vec<&str> = handler
        .declared_supported_request_types
        .iter()
        .map(|request| request.name())
        .collect();
    assert_eq!(supported, vec!["GetOrderRequest"]);
    assert!(handler.execute_method.is_some());
}

#[test]
fn executions_are_listed_per_call_site() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("Handlers.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let handler = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");

    let executions = handler.request_executions.as_ref().expect("executions");
    assert_eq!(executions.len(), 2);
    assert!(executions.iter().all(|execution| execution.request.name() == "GetCustomerRequest"));
    assert!(executions[0].call_site.start_line < executions[1].call_site.start_line);
    assert_eq!(executions[0].call_site.to_string(), "Handlers.cs:27");
}

#[test]
fn resolving_twice_reuses_cached_definition() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("Handlers.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let resolver = HandlerResolver::new(&context, &cancel);

    let first = resolver.try_get_request_handler_from_syntax_tree().expect("first").expect("handler");
    let resolutions = context.type_cache().stats().handler_resolutions;
    let second = resolver.try_get_request_handler_from_syntax_tree().expect("second").expect("handler");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(context.type_cache().stats().handler_resolutions, resolutions);
}

#[test]
fn non_handlers_are_cached_negatives() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("Handlers.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let resolver = HandlerResolver::new(&context, &cancel);
    let offset = HANDLERS.find("OrderFormatter").expect("class");

    assert!(resolver.try_get_request_handler_at(TextSpan::at(offset)).expect("first").is_none());
    let after_first = context.type_cache().stats().handler_resolutions;
    assert!(resolver.try_get_request_handler_at(TextSpan::at(offset)).expect("second").is_none());
    assert_eq!(context.type_cache().stats().handler_resolutions, after_first);
}

#[test]
fn position_resolves_enclosing_class_only() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("Handlers.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let resolver = HandlerResolver::new(&context, &cancel);

    let inside_second = HANDLERS.find("return new GetCustomerResponse").expect("body");
    let handler = resolver
        .try_get_request_handler_at(TextSpan::at(inside_second))
        .expect("resolve")
        .expect("handler");
    assert_eq!(handler.class_type.name(), "SecondHandler");
    assert_eq!(handler.declared_supported_request_types[0].name(), "GetCustomerRequest");
    assert_eq!(handler.request_executions.as_ref().map(Vec::len), Some(0));

    let outside = HANDLERS.find("using System;").expect("using");
    assert!(resolver.try_get_request_handler_at(TextSpan::at(outside)).expect("resolve").is_none());
}

#[test]
fn returned_field_is_followed() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("IndirectHandler.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let handler = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");

    let supported: Vec<&str> = handler
        .declared_supported_request_types
        .iter()
        .map(|request| request.name())
        .collect();
    assert_eq!(supported, vec!["GetOrderRequest", "GetCustomerRequest"]);
}

#[test]
fn chase_respects_depth_limit() {
    let solution = solution();
    let config = Config {
        max_chase_depth: 0,
        ..Config::default()
    };
    let factory = ContextFactory::with_config(solution.clone(), config);
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("IndirectHandler.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let handler = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");
    assert!(handler.declared_supported_request_types.is_empty());
}

#[test]
fn metadata_base_uses_process_method() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("CustomerHandler.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let handler = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");

    assert!(matches!(handler.shape, SupportedTypesShape::MetadataBase { .. }));
    assert_eq!(handler.shape.execute_method_name(), Some("Process"));
    assert_eq!(handler.declared_supported_request_types[0].name(), "GetCustomerRequest");
    let executions = handler.request_executions.as_ref().expect("executions");
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].request.name(), "GetOrderRequest");
}

#[test]
fn partial_class_declares_nothing() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("SplitHandler.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let handler = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");

    assert_eq!(handler.shape, SupportedTypesShape::Unsupported);
    assert!(handler.declared_supported_request_types.is_empty());
    assert!(handler.execute_method.is_some());
    assert_eq!(handler.request_executions.as_ref().map(Vec::len), Some(1));
}

#[test]
fn handcrafted_base_takes_requests_from_generic_argument() {
    let (solution, factory) = shapes_factory(Config::default());
    let handler = handler_in(&solution, &factory, "ArchiveHandler.cs");

    match &handler.shape {
        SupportedTypesShape::HandcraftedBase { base } => assert_eq!(base.name(), "SingleRequestHandler"),
        other => panic!("unexpected shape {other:?}"),
    }
    let supported: Vec<&str> = handler
        .declared_supported_request_types
        .iter()
        .map(|request| request.name())
        .collect();
    assert_eq!(supported, vec!["GetOrderRequest"]);
    assert_eq!(handler.shape.execute_method_name(), Some("Execute"));
    assert!(handler.execute_method.is_none());
    assert!(handler.request_executions.is_none());
}

#[test]
fn unrecognized_metadata_base_has_no_execute_method() {
    let (solution, factory) = shapes_factory(Config::default());
    let handler = handler_in(&solution, &factory, "AuditHandler.cs");

    assert_eq!(handler.class_type.name(), "AuditHandler");
    assert_eq!(handler.shape, SupportedTypesShape::Unrecognized);
    assert_eq!(handler.shape.execute_method_name(), None);
    assert!(handler.declared_supported_request_types.is_empty());
    assert!(handler.execute_method.is_none());
    assert!(handler.request_executions.is_none());
}

#[test]
fn cyclic_returns_stop_at_revisited_declaration() {
    let config = Config {
        max_chase_depth: 1000,
        ..Config::default()
    };
    let (solution, factory) = shapes_factory(config);
    let handler = handler_in(&solution, &factory, "LoopHandler.cs");

    assert!(matches!(handler.shape, SupportedTypesShape::SameTree { .. }));
    assert!(handler.declared_supported_request_types.is_empty());
    assert_eq!(handler.request_executions.as_ref().map(Vec::len), Some(0));
}

#[test]
fn zero_chase_depth_still_reads_the_declaration() {
    let solution = solution();
    let config = Config {
        max_chase_depth: 0,
        ..Config::default()
    };
    let factory = ContextFactory::with_config(solution.clone(), config);
    let handler = handler_in(&solution, &factory, "Handlers.cs");

    let supported: Vec<&str> = handler
        .declared_supported_request_types
        .iter()
        .map(|request| request.name())
        .collect();
    assert_eq!(supported, vec!["GetOrderRequest"]);
}

#[test]
fn execute_member_must_be_a_method() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("OddHandler.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let err = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect_err("field execute");
    match err {
        Error::UnexpectedExecuteMethodImplementation { handler, method } => {
            assert_eq!(handler, "OddHandler");
            assert_eq!(method, "Execute");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn request_members_and_documentation() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("Handlers.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    let handler = HandlerResolver::new(&context, &cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");

    let request = &handler.declared_supported_request_types[0];
    assert_eq!(request.shape.namespace, "Contoso.Orders");
    assert_eq!(request.shape.documentation, "Reads one order.");
    assert_eq!(
        request.shape.base_class_name,
        "Microsoft.Dynamics.Commerce.Runtime.Messages.Request"
    );
    let members: Vec<(&str, &str, bool)> = request
        .shape
        .members
        .iter()
        .map(|member| (member.name.as_str(), member.type_name.as_str(), member.can_write))
        .collect();
    assert_eq!(
        members,
        vec![("OrderId", "string", true), ("Version", "int", false)]
    );
    assert_eq!(request.shape.members[0].documentation, "The order id.");
}

#[test]
fn cancelled_resolution_stops() {
    let (solution, factory) = factory();
    let cancel = CancellationToken::new();
    let id = solution.document_by_name("Handlers.cs").expect("doc").id;
    let context = factory.create_context_for(id, &cancel).expect("context");
    cancel.cancel();
    let result = HandlerResolver::new(&context, &cancel).try_get_request_handler_from_syntax_tree();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(context.type_cache().cached_handlers(), 0);
}
