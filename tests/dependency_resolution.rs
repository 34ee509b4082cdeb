use reqtrace::analysis::{ContextFactory, DependencyResolver, HandlerResolver, RequestTypeResolver};
use reqtrace::config::Config;
use reqtrace::workspace::symbols::TypeRef;
use reqtrace::workspace::{Solution, SolutionBuilder};
use reqtrace::{CancellationToken, Error};
use std::sync::Arc;

const CONTRACTS: &str = r#"
namespace Contoso.Contracts
{
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class GetOrderRequest : Request
    {
        public GetOrderRequest(string orderId)
        {
            this.OrderId = orderId;
        }

        public string OrderId { get; set; }
    }

    public sealed class GetOrderResponse : Response
    {
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

    public sealed class PingRequest : Request
    {
    }

    public sealed class Customer
    {
        public string Name { get; set; }
    }
}
"#;

const ORDER_HANDLER: &str = r#"
namespace Contoso.Orders
{
    using System;
    using System.Collections.Generic;
    using Contoso.Contracts;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

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
            var pong = request.RequestContext.Execute<NullResponse>(new PingRequest());
            return new GetOrderResponse();
        }
    }
}
"#;

const CUSTOMER_HANDLER: &str = r#"
namespace Contoso.Customers
{
    using System;
    using System.Collections.Generic;
    using Contoso.Contracts;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class CustomerHandler : IRequestHandler
    {
        public IEnumerable<Type> SupportedRequestTypes => new[] { typeof(GetCustomerRequest) };

        public Response Execute(Request request)
        {
            var getCustomer = (GetCustomerRequest)request;
            return new GetCustomerResponse();
        }
    }
}
"#;

const CUSTOMER_AUDIT: &str = r#"
namespace Contoso.Customers
{
    using Contoso.Contracts;

    public sealed class CustomerAudit
    {
        public void Record(GetCustomerRequest request)
        {
        }
    }
}
"#;

const CLIENT: &str = r#"
namespace Contoso.Client
{
    using Contoso.Contracts;
    using Microsoft.Dynamics.Commerce.Runtime;

    public sealed class Storefront
    {
        private RequestContext context;

        public GetOrderResponse Show(string id)
        {
            var request = new GetOrderRequest(id);
            var customer = new Customer();
            return this.context.Execute<GetOrderResponse>(request);
        }
    }
}
"#;

const ARCHIVED_CUSTOMER_HANDLER: &str = r#"
namespace Contoso.Archive
{
    using System;
    using System.Collections.Generic;
    using Contoso.Contracts;
    using Microsoft.Dynamics.Commerce.Runtime;
    using Microsoft.Dynamics.Commerce.Runtime.Messages;

    public sealed class ArchivedCustomerHandler : IRequestHandler
    {
        public IEnumerable<Type> SupportedRequestTypes => new[] { typeof(GetCustomerRequest) };

        public Response Execute(Request request)
        {
            return new GetCustomerResponse();
        }
    }
}
"#;

fn solution() -> Arc<Solution> {
    SolutionBuilder::new()
        .project("Contoso.Contracts", |p| {
            p.framework().expect("framework").document("Contracts/Contracts.cs", CONTRACTS)
        })
        .project("Contoso.Orders", |p| {
            p.project_reference("Contoso.Contracts")
                .document("Orders/OrderHandler.cs", ORDER_HANDLER)
        })
        .project("Contoso.Customers", |p| {
            p.project_reference("Contoso.Contracts")
                .document("Customers/CustomerAudit.cs", CUSTOMER_AUDIT)
                .document("Customers/CustomerHandler.cs", CUSTOMER_HANDLER)
        })
        .project("Contoso.Client", |p| {
            p.project_reference("Contoso.Contracts")
                .document("Client/Storefront.cs", CLIENT)
        })
        .build()
        .expect("solution")
}

struct Fixture {
    solution: Arc<Solution>,
    factory: ContextFactory,
    resolver: DependencyResolver,
    cancel: CancellationToken,
}

fn fixture() -> Fixture {
    let solution = solution();
    let config = Config {
        fanout_threads: 2,
        ..Config::default()
    };
    Fixture {
        factory: ContextFactory::with_config(solution.clone(), config),
        resolver: DependencyResolver::new(&config).expect("pool"),
        solution,
        cancel: CancellationToken::new(),
    }
}

fn offset_of(source: &str, needle: &str) -> usize {
    source.find(needle).expect("needle")
}

#[test]
fn request_at_position_resolves_to_its_handler() {
    let fx = fixture();
    let storefront = fx.solution.document_by_name("Storefront.cs").expect("doc").id;
    let offset = offset_of(CLIENT, "GetOrderRequest(id)");

    let found = fx
        .resolver
        .find_request_implementation_at(&fx.factory, storefront, offset, &fx.cancel)
        .expect("resolve")
        .expect("implementation");
    assert_eq!(found.container.class_type.name(), "OrderHandler");
    assert_eq!(found.location.to_string(), "OrderHandler.cs:19");
    assert_eq!(
        found.type_symbol.as_ref().map(ToString::to_string).as_deref(),
        Some("Contoso.Contracts.GetOrderRequest")
    );
}

#[test]
fn dependency_graph_round_trips() {
    let fx = fixture();
    let orders = fx.solution.document_by_name("OrderHandler.cs").expect("doc").id;
    let context = fx.factory.create_context_for(orders, &fx.cancel).expect("context");
    let handler = HandlerResolver::new(&context, &fx.cancel)
        .try_get_request_handler_from_syntax_tree()
        .expect("resolve")
        .expect("handler");

    let edges = fx
        .resolver
        .dependency_graph(&fx.factory, &handler, &fx.cancel)
        .expect("graph");
    assert_eq!(edges.len(), 2);

    assert_eq!(edges[0].execution.request.name(), "GetCustomerRequest");
    let customer = edges[0].implementation.as_ref().expect("customer handler");
    assert_eq!(customer.container.class_type.name(), "CustomerHandler");
    assert_eq!(customer.location.to_string(), "CustomerHandler.cs:16");

    assert_eq!(edges[1].execution.request.name(), "PingRequest");
    assert!(edges[1].implementation.is_none());
}

#[test]
fn unimplemented_request_is_not_an_error() {
    let fx = fixture();
    let contracts = fx.solution.document_by_name("Contracts.cs").expect("doc").id;
    let context = fx.factory.create_context_for(contracts, &fx.cancel).expect("context");
    let ping = context
        .compilation()
        .type_by_metadata_name("Contoso.Contracts.PingRequest")
        .expect("ping")
        .as_type();
    let request = RequestTypeResolver::new(&context)
        .resolve_request_from_declaring_type(&TypeRef::Named(ping))
        .expect("resolve")
        .expect("request");

    let found = fx
        .resolver
        .find_request_implementation(&fx.factory, &request, &fx.cancel)
        .expect("search");
    assert!(found.is_none());
}

#[test]
fn position_outside_a_type_fails() {
    let fx = fixture();
    let storefront = fx.solution.document_by_name("Storefront.cs").expect("doc").id;
    let offset = offset_of(CLIENT, "namespace");
    let err = fx
        .resolver
        .find_request_implementation_at(&fx.factory, storefront, offset, &fx.cancel)
        .expect_err("not a type");
    assert!(matches!(err, Error::NotAType));
}

#[test]
fn non_request_type_fails() {
    let fx = fixture();
    let storefront = fx.solution.document_by_name("Storefront.cs").expect("doc").id;
    let offset = offset_of(CLIENT, "Customer()");
    let err = fx
        .resolver
        .find_request_implementation_at(&fx.factory, storefront, offset, &fx.cancel)
        .expect_err("not a request");
    match err {
        Error::NotARequestType(name) => assert_eq!(name, "Customer"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn repeated_searches_reuse_contexts() {
    let fx = fixture();
    let storefront = fx.solution.document_by_name("Storefront.cs").expect("doc").id;
    let offset = offset_of(CLIENT, "GetOrderRequest(id)");

    fx.resolver
        .find_request_implementation_at(&fx.factory, storefront, offset, &fx.cancel)
        .expect("first");
    let after_first = fx.factory.stats();
    fx.resolver
        .find_request_implementation_at(&fx.factory, storefront, offset, &fx.cancel)
        .expect("second");
    let after_second = fx.factory.stats();
    assert_eq!(after_first, after_second);
    assert!(after_second.documents_built > 0);
    assert!(after_second.compilations_built <= fx.solution.projects().len());
}

#[test]
fn cancelled_search_stops() {
    let fx = fixture();
    let storefront = fx.solution.document_by_name("Storefront.cs").expect("doc").id;
    let offset = offset_of(CLIENT, "GetOrderRequest(id)");
    fx.cancel.cancel();
    let result = fx
        .resolver
        .find_request_implementation_at(&fx.factory, storefront, offset, &fx.cancel);
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn competing_handlers_resolve_by_source_order() {
    // registered after the customers project, but sorts first by path
    let solution = SolutionBuilder::new()
        .project("Contoso.Contracts", |p| {
            p.framework().expect("framework").document("Contracts/Contracts.cs", CONTRACTS)
        })
        .project("Contoso.Customers", |p| {
            p.project_reference("Contoso.Contracts")
                .document("Customers/CustomerHandler.cs", CUSTOMER_HANDLER)
        })
        .project("Contoso.Archive", |p| {
            p.project_reference("Contoso.Contracts")
                .document("Archive/ArchivedCustomerHandler.cs", ARCHIVED_CUSTOMER_HANDLER)
        })
        .build()
        .expect("solution");
    let contracts = solution.document_by_name("Contracts.cs").expect("doc").id;
    let cancel = CancellationToken::new();

    for threads in [1, 4] {
        let config = Config {
            fanout_threads: threads,
            ..Config::default()
        };
        let factory = ContextFactory::with_config(solution.clone(), config);
        let resolver = DependencyResolver::new(&config).expect("pool");
        let context = factory.create_context_for(contracts, &cancel).expect("context");
        let customer = context
            .compilation()
            .type_by_metadata_name("Contoso.Contracts.GetCustomerRequest")
            .expect("request")
            .as_type();
        let request = RequestTypeResolver::new(&context)
            .resolve_request_from_declaring_type(&TypeRef::Named(customer))
            .expect("resolve")
            .expect("request");

        for _ in 0..3 {
            let found = resolver
                .find_request_implementation(&factory, &request, &cancel)
                .expect("search")
                .expect("implementation");
            assert_eq!(found.container.class_type.name(), "ArchivedCustomerHandler");
            assert_eq!(found.location.to_string(), "ArchivedCustomerHandler.cs:10");
            assert!(found.type_symbol.is_none());
        }
    }
}
