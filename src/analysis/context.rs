use super::framework::FrameworkReference;
use super::type_cache::TypeCache;
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::workspace::compilation::Compilation;
use crate::workspace::semantic::SemanticModel;
use crate::workspace::{Document, DocumentId, ProjectId, Solution};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tree_sitter::Node;

/// Everything resolution needs for one document. Immutable once built.
pub struct AnalysisContext {
    semantic: SemanticModel,
    framework: Arc<FrameworkReference>,
    type_cache: Arc<TypeCache>,
    config: Config,
}

impl AnalysisContext {
    pub fn document(&self) -> &Arc<Document> {
        self.semantic.document()
    }

    pub fn root(&self) -> Node<'_> {
        self.semantic.root()
    }

    pub fn semantic(&self) -> &SemanticModel {
        &self.semantic
    }

    pub fn compilation(&self) -> &Arc<Compilation> {
        self.semantic.compilation()
    }

    pub fn framework(&self) -> &FrameworkReference {
        &self.framework
    }

    pub fn type_cache(&self) -> &TypeCache {
        &self.type_cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Per-project state shared by every document context of the project.
#[derive(Debug)]
pub struct ProjectCache {
    pub compilation: Arc<Compilation>,
    pub framework: Arc<FrameworkReference>,
    pub type_cache: Arc<TypeCache>,
}

#[derive(Debug, Clone)]
enum ProjectEntry {
    Ready(Arc<ProjectCache>),
    /// Framework resolution failed. Cached so the project is not retried.
    Unavailable(Arc<Error>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FactoryStats {
    pub projects_built: usize,
    pub documents_built: usize,
    pub compilations_built: usize,
}

/// An analysis session over one solution snapshot.
///
/// Project caches and document contexts are built lazily and kept for the factory's lifetime.
/// Concurrent requests for the same key may build twice; the first stored value wins. A changed
/// solution needs a new factory.
pub struct ContextFactory {
    solution: Arc<Solution>,
    config: Config,
    projects: DashMap<ProjectId, ProjectEntry>,
    documents: DashMap<DocumentId, Arc<AnalysisContext>>,
    projects_built: AtomicUsize,
    documents_built: AtomicUsize,
}

impl ContextFactory {
    pub fn new(solution: Arc<Solution>) -> Self {
        Self::with_config(solution, *Config::get())
    }

    pub fn with_config(solution: Arc<Solution>, config: Config) -> Self {
        Self {
            solution,
            config,
            projects: DashMap::new(),
            documents: DashMap::new(),
            projects_built: AtomicUsize::new(0),
            documents_built: AtomicUsize::new(0),
        }
    }

    pub fn solution(&self) -> &Arc<Solution> {
        &self.solution
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Context for `document`, failing when its project has no usable framework reference.
    pub fn create_context_for(
        &self,
        document: DocumentId,
        cancel: &CancellationToken,
    ) -> Result<Arc<AnalysisContext>> {
        match self.context_for(document, cancel)? {
            Ok(context) => Ok(context),
            Err((project, cause)) => Err(Error::CannotCreateAnalysisContext { project, cause }),
        }
    }

    /// Like [`Self::create_context_for`], but a project without a framework reference yields
    /// `None`.
    pub fn try_create_context_for(
        &self,
        document: DocumentId,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<AnalysisContext>>> {
        Ok(self.context_for(document, cancel)?.ok())
    }

    pub fn stats(&self) -> FactoryStats {
        FactoryStats {
            projects_built: self.projects_built.load(Ordering::Relaxed),
            documents_built: self.documents_built.load(Ordering::Relaxed),
            compilations_built: self.solution.compilations_built(),
        }
    }

    #[allow(clippy::type_complexity)]
    fn context_for(
        &self,
        id: DocumentId,
        cancel: &CancellationToken,
    ) -> Result<std::result::Result<Arc<AnalysisContext>, (String, Arc<Error>)>> {
        if let Some(context) = self.documents.get(&id) {
            return Ok(Ok(context.value().clone()));
        }
        cancel.check()?;
        let document = self
            .solution
            .document(id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown document {id}")))?;
        let project = match self.project_entry(document.project, cancel)? {
            ProjectEntry::Ready(project) => project,
            ProjectEntry::Unavailable(cause) => {
                let name = self
                    .solution
                    .project(document.project)
                    .map(|project| project.name.to_string())
                    .unwrap_or_default();
                return Ok(Err((name, cause)));
            }
        };

        let semantic = SemanticModel::new(project.compilation.clone(), document.clone())?;
        let context = Arc::new(AnalysisContext {
            semantic,
            framework: project.framework.clone(),
            type_cache: project.type_cache.clone(),
            config: self.config,
        });
        self.documents_built.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(document = %document.path, "analysis context built");
        Ok(Ok(self.documents.entry(id).or_insert(context).value().clone()))
    }

    fn project_entry(&self, id: ProjectId, cancel: &CancellationToken) -> Result<ProjectEntry> {
        if let Some(entry) = self.projects.get(&id) {
            return Ok(entry.value().clone());
        }
        cancel.check()?;
        let project = self
            .solution
            .project(id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown project {id:?}")))?;
        let compilation = self.solution.compilation(id)?;
        let entry = match FrameworkReference::resolve(&compilation, &project.name) {
            Ok(framework) => ProjectEntry::Ready(Arc::new(ProjectCache {
                compilation,
                framework: Arc::new(framework),
                type_cache: Arc::new(TypeCache::new()),
            })),
            Err(err) => {
                tracing::warn!(project = %project.name, code = err.code(), "{err}");
                ProjectEntry::Unavailable(Arc::new(err))
            }
        };
        self.projects_built.fetch_add(1, Ordering::Relaxed);
        Ok(self.projects.entry(id).or_insert(entry).value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::SolutionBuilder;

    fn solution() -> Arc<Solution> {
        SolutionBuilder::new()
            .project("Handlers", |p| {
                p.framework()
                    .expect("framework")
                    .document("A.cs", "namespace Contoso { class A { } }")
                    .document("B.cs", "namespace Contoso { class B { } }")
            })
            .project("Tools", |p| p.document("C.cs", "class C { }"))
            .build()
            .expect("solution")
    }

    #[test]
    fn contexts_are_memoized() {
        let solution = solution();
        let factory = ContextFactory::with_config(solution.clone(), Config::default());
        let cancel = CancellationToken::new();
        let a = solution.document_by_name("A.cs").expect("A").id;
        let b = solution.document_by_name("B.cs").expect("B").id;

        let first = factory.create_context_for(a, &cancel).expect("context");
        let second = factory.create_context_for(a, &cancel).expect("context");
        assert!(Arc::ptr_eq(&first, &second));
        let other = factory.create_context_for(b, &cancel).expect("context");
        assert!(std::ptr::eq(first.type_cache(), other.type_cache()));

        let stats = factory.stats();
        assert_eq!(stats.projects_built, 1);
        assert_eq!(stats.documents_built, 2);
    }

    #[test]
    fn missing_framework_is_tolerated_or_fatal() {
        let solution = solution();
        let factory = ContextFactory::with_config(solution.clone(), Config::default());
        let cancel = CancellationToken::new();
        let c = solution.document_by_name("C.cs").expect("C").id;

        assert!(factory.try_create_context_for(c, &cancel).expect("tolerant").is_none());
        match factory.create_context_for(c, &cancel) {
            Err(Error::CannotCreateAnalysisContext { project, cause }) => {
                assert_eq!(project, "Tools");
                assert_eq!(cause.code(), "CannotResolveFrameworkReference");
            }
            _ => panic!("expected CannotCreateAnalysisContext"),
        }
        assert_eq!(factory.stats().projects_built, 1);
    }

    #[test]
    fn cancelled_token_stops_building() {
        let solution = solution();
        let factory = ContextFactory::with_config(solution.clone(), Config::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let a = solution.document_by_name("A.cs").expect("A").id;
        assert!(matches!(factory.create_context_for(a, &cancel), Err(Error::Cancelled)));
        assert_eq!(factory.stats().documents_built, 0);
    }
}
