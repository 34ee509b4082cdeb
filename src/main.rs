use anyhow::{Context, Result, anyhow};
use clap::Parser;
use reqtrace::analysis::{ContextFactory, DependencyResolver, HandlerResolver};
use reqtrace::cli;
use reqtrace::model::{AnalyzeReport, DocumentReport, ErrorReport, HandlerReport, ImplementationReport};
use reqtrace::workspace::scan::ScanOptions;
use reqtrace::workspace::syntax::TextSpan;
use reqtrace::workspace::{DocumentId, Solution};
use reqtrace::{CancellationToken, config::Config};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("REQTRACE_LOG").or_else(|_| EnvFilter::try_from_default_env());
    if let Ok(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }
}

fn load(solution: &Path, no_ignore: bool) -> Result<Arc<Solution>> {
    Solution::load_with_options(solution, ScanOptions::new(no_ignore))
        .with_context(|| format!("load solution {}", solution.display()))
}

fn document_named(solution: &Solution, name: &str) -> Result<DocumentId> {
    solution
        .document_by_name(name)
        .map(|document| document.id)
        .ok_or_else(|| anyhow!("no document named {name}"))
}

fn main() -> Result<()> {
    init_tracing();
    let args = cli::Args::parse();
    let config = *Config::get();
    let cancel = CancellationToken::new();

    match args.command {
        cli::Command::Analyze {
            solution,
            document,
            dependencies,
            no_ignore,
        } => {
            let loaded = load(&solution, no_ignore)?;
            let factory = ContextFactory::with_config(loaded.clone(), config);
            let resolver = if dependencies {
                Some(DependencyResolver::new(&config)?)
            } else {
                None
            };
            let mut reports = Vec::new();
            for doc in loaded.documents() {
                if document.as_deref().is_some_and(|name| doc.name != name) {
                    continue;
                }
                let project = loaded
                    .project(doc.project)
                    .map(|project| project.name.to_string())
                    .unwrap_or_default();
                let outcome = factory
                    .try_create_context_for(doc.id, &cancel)
                    .and_then(|context| match context {
                        Some(context) => HandlerResolver::new(&context, &cancel)
                            .try_get_request_handler_from_syntax_tree(),
                        None => Ok(None),
                    })
                    .and_then(|handler| {
                        let Some(handler) = handler else {
                            return Ok(None);
                        };
                        let report = HandlerReport::new(&handler);
                        match &resolver {
                            Some(resolver) => {
                                let edges = resolver.dependency_graph(&factory, &handler, &cancel)?;
                                Ok(Some(report.with_dependencies(&edges)))
                            }
                            None => Ok(Some(report)),
                        }
                    });
                let (handler, error) = match outcome {
                    Ok(handler) => (handler, None),
                    Err(err) => (None, Some(ErrorReport::from(&err))),
                };
                reports.push(DocumentReport {
                    document: doc.path.to_string(),
                    project,
                    is_handler: handler.is_some(),
                    handler,
                    error,
                });
            }
            let report = AnalyzeReport {
                solution: solution.display().to_string(),
                projects: loaded.projects().len(),
                documents: reports,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        cli::Command::Implementation {
            solution,
            document,
            position,
            no_ignore,
        } => {
            let loaded = load(&solution, no_ignore)?;
            let id = document_named(&loaded, &document)?;
            let factory = ContextFactory::with_config(loaded, config);
            let resolver = DependencyResolver::new(&config)?;
            let found = resolver.find_request_implementation_at(&factory, id, position, &cancel)?;
            let report = found.as_ref().map(ImplementationReport::from);
            println!("{}", serde_json::to_string_pretty(&json!({ "implementation": report }))?);
            Ok(())
        }
        cli::Command::Method {
            solution,
            document,
            position,
            namespace,
            no_ignore,
        } => {
            let loaded = load(&solution, no_ignore)?;
            let id = document_named(&loaded, &document)?;
            let factory = ContextFactory::with_config(loaded, config);
            let context = factory.create_context_for(id, &cancel)?;
            let mut definition = HandlerResolver::new(&context, &cancel)
                .try_get_handler_method_definition(TextSpan::at(position))?;
            if let (Some(definition), Some(namespace)) = (definition.as_mut(), namespace.as_deref()) {
                definition.set_containing_namespace(namespace)?;
            }
            println!("{}", serde_json::to_string_pretty(&json!({ "method": definition }))?);
            Ok(())
        }
    }
}
