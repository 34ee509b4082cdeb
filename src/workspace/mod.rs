//! C# workspace: solution, projects and documents, plus the declaration-level semantic layer the
//! resolution engine queries.

pub mod compilation;
pub mod declarations;
pub mod metadata;
pub mod references;
pub mod scan;
pub mod semantic;
pub mod symbols;
pub mod syntax;

use crate::error::{Error, Result};
use anyhow::Context as _;
use compilation::Compilation;
use declarations::{DeclPart, extract_declarations};
use metadata::MetadataAssembly;
use semantic::SemanticModel;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tree_sitter::{Parser, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocumentId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProjectId(pub u32);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

pub(crate) fn parse_csharp(text: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|err| Error::Workspace(format!("load C# grammar: {err}")))?;
    parser
        .parse(text, None)
        .ok_or_else(|| Error::Workspace("C# parser produced no tree".to_string()))
}

/// A source file. Parsed at most once, on first use.
pub struct Document {
    pub id: DocumentId,
    pub project: ProjectId,
    pub assembly: Arc<str>,
    pub name: String,
    pub path: Arc<str>,
    text: Arc<str>,
    hash: String,
    tree: OnceLock<Tree>,
    declarations: OnceLock<Vec<DeclPart>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("project", &self.project)
            .field("path", &self.path)
            .finish()
    }
}

impl Document {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn tree(&self) -> Result<&Tree> {
        if let Some(tree) = self.tree.get() {
            return Ok(tree);
        }
        let tree = parse_csharp(&self.text)?;
        Ok(self.tree.get_or_init(|| tree))
    }

    pub fn declarations(&self) -> Result<&[DeclPart]> {
        if let Some(parts) = self.declarations.get() {
            return Ok(parts);
        }
        let tree = self.tree()?;
        let parts = extract_declarations(tree.root_node(), &self.text, &self.assembly, Some(self.id));
        Ok(self.declarations.get_or_init(|| parts))
    }

    /// File name without extension, compared case-insensitively by lookups.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

pub struct Project {
    pub id: ProjectId,
    pub name: Arc<str>,
    pub documents: Vec<DocumentId>,
    pub project_references: Vec<ProjectId>,
    /// Metadata references, including those inherited through project references.
    pub metadata: Vec<Arc<MetadataAssembly>>,
    compilation: OnceLock<Arc<Compilation>>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("documents", &self.documents.len())
            .finish()
    }
}

/// An immutable snapshot of projects and documents.
#[derive(Debug)]
pub struct Solution {
    projects: Vec<Arc<Project>>,
    documents: Vec<Arc<Document>>,
    compilations_built: AtomicUsize,
}

impl Solution {
    /// Load every project under `dir`, honoring `.gitignore`.
    pub fn load(dir: &Path) -> anyhow::Result<Arc<Solution>> {
        Self::load_with_options(dir, scan::ScanOptions::default())
    }

    pub fn load_with_options(dir: &Path, options: scan::ScanOptions) -> anyhow::Result<Arc<Solution>> {
        let root = crate::util::lexical_normalize(
            &dir.canonicalize()
                .with_context(|| format!("open solution {}", dir.display()))?,
        );
        let scanned = scan::scan_solution(&root, options)?;
        let mut builder = SolutionBuilder::new();

        if scanned.projects.is_empty() {
            // loose sources form one implicit project
            let name = root
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("Solution")
                .to_string();
            let mut project = ProjectBuilder::new(&name).framework()?;
            for file in &scanned.files {
                project.add_document(&file.rel_path, crate::util::read_to_string(&file.abs_path)?);
            }
            builder.projects.push(project);
            return Ok(builder.build()?);
        }

        let by_file: HashMap<&Path, &str> = scanned
            .projects
            .iter()
            .map(|project| (project.project_file.as_path(), project.name.as_str()))
            .collect();
        let mut projects = Vec::with_capacity(scanned.projects.len());
        for project in &scanned.projects {
            let mut entry = ProjectBuilder::new(&project.name);
            if project.uses_framework {
                entry = entry.framework()?;
            }
            for reference in &project.references {
                match by_file.get(reference.as_path()) {
                    Some(name) => entry = entry.project_reference(name),
                    None => tracing::warn!(
                        project = %project.name,
                        reference = %reference.display(),
                        "project reference outside the solution"
                    ),
                }
            }
            projects.push(entry);
        }
        for file in &scanned.files {
            // nearest enclosing project directory owns the file
            let owner = scanned
                .projects
                .iter()
                .enumerate()
                .filter(|(_, project)| file.abs_path.starts_with(&project.dir))
                .max_by_key(|(_, project)| project.dir.components().count());
            let Some((index, _)) = owner else {
                tracing::debug!(file = %file.rel_path, "source file outside any project");
                continue;
            };
            let text = crate::util::read_to_string(&file.abs_path)?;
            projects[index].add_document(&file.rel_path, text);
        }
        builder.projects = projects;
        let solution = builder.build()?;
        tracing::debug!(
            projects = solution.projects.len(),
            documents = solution.documents.len(),
            "solution loaded"
        );
        Ok(solution)
    }

    pub fn projects(&self) -> &[Arc<Project>] {
        &self.projects
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn project(&self, id: ProjectId) -> Option<&Arc<Project>> {
        self.projects.get(id.0 as usize)
    }

    pub fn document(&self, id: DocumentId) -> Option<&Arc<Document>> {
        self.documents.get(id.0 as usize)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&Arc<Project>> {
        self.projects.iter().find(|project| &*project.name == name)
    }

    /// Documents matching a file name, with or without extension, ignoring case.
    pub fn documents_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Arc<Document>> + use<'a> {
        let name = name.to_string();
        self.documents.iter().filter(move |document| {
            document.stem().eq_ignore_ascii_case(&name) || document.name.eq_ignore_ascii_case(&name)
        })
    }

    pub fn document_by_name(&self, name: &str) -> Option<&Arc<Document>> {
        self.documents_named(name).next()
    }

    /// The project's compilation, built once per snapshot.
    pub fn compilation(&self, id: ProjectId) -> Result<Arc<Compilation>> {
        let project = self
            .project(id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown project {id:?}")))?;
        if let Some(compilation) = project.compilation.get() {
            return Ok(compilation.clone());
        }
        let compilation = Arc::new(Compilation::build(self, project)?);
        self.compilations_built.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(project = %project.name, types = compilation.type_count(), "compilation built");
        Ok(project.compilation.get_or_init(|| compilation).clone())
    }

    pub fn semantic_model(&self, id: DocumentId) -> Result<SemanticModel> {
        let document = self
            .document(id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown document {id}")))?;
        let compilation = self.compilation(document.project)?;
        SemanticModel::new(compilation, document.clone())
    }

    pub fn compilations_built(&self) -> usize {
        self.compilations_built.load(Ordering::Relaxed)
    }

    /// Projects reachable through project references, excluding `id` itself, in id order.
    pub fn referenced_projects(&self, id: ProjectId) -> Vec<ProjectId> {
        let edges: Vec<Vec<ProjectId>> = self
            .projects
            .iter()
            .map(|project| project.project_references.clone())
            .collect();
        reference_closure(&edges, id)
    }
}

fn reference_closure(edges: &[Vec<ProjectId>], id: ProjectId) -> Vec<ProjectId> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        let Some(references) = edges.get(current.0 as usize) else {
            continue;
        };
        for reference in references {
            if *reference != id && seen.insert(*reference) {
                stack.push(*reference);
            }
        }
    }
    seen.into_iter().collect()
}

/// In-memory project description.
pub struct ProjectBuilder {
    name: String,
    documents: Vec<(String, String)>,
    project_references: Vec<String>,
    metadata: Vec<Arc<MetadataAssembly>>,
}

impl ProjectBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents: Vec::new(),
            project_references: Vec::new(),
            metadata: Vec::new(),
        }
    }

    pub fn document(mut self, path: &str, text: impl Into<String>) -> Self {
        self.add_document(path, text);
        self
    }

    fn add_document(&mut self, path: &str, text: impl Into<String>) {
        self.documents.push((path.to_string(), text.into()));
    }

    pub fn project_reference(mut self, name: &str) -> Self {
        self.project_references.push(name.to_string());
        self
    }

    pub fn metadata(mut self, assembly: Arc<MetadataAssembly>) -> Self {
        self.metadata.push(assembly);
        self
    }

    /// Reference the bundled framework assembly.
    pub fn framework(self) -> Result<Self> {
        Ok(self.metadata(metadata::commerce_runtime()?))
    }
}

/// Builds a `Solution` from in-memory sources.
#[derive(Default)]
pub struct SolutionBuilder {
    projects: Vec<ProjectBuilder>,
}

impl SolutionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, name: &str, configure: impl FnOnce(ProjectBuilder) -> ProjectBuilder) -> Self {
        self.projects.push(configure(ProjectBuilder::new(name)));
        self
    }

    pub fn build(self) -> Result<Arc<Solution>> {
        let ids: HashMap<String, ProjectId> = self
            .projects
            .iter()
            .enumerate()
            .map(|(index, project)| (project.name.clone(), ProjectId(index as u32)))
            .collect();

        let mut documents = Vec::new();
        let mut projects = Vec::with_capacity(self.projects.len());
        for (index, described) in self.projects.iter().enumerate() {
            let project_id = ProjectId(index as u32);
            let assembly: Arc<str> = Arc::from(described.name.as_str());
            let mut document_ids = Vec::with_capacity(described.documents.len());
            for (path, text) in &described.documents {
                let id = DocumentId(documents.len() as u32);
                let name = Path::new(path)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(path)
                    .to_string();
                documents.push(Arc::new(Document {
                    id,
                    project: project_id,
                    assembly: assembly.clone(),
                    name,
                    path: Arc::from(path.as_str()),
                    hash: crate::util::content_hash(text),
                    text: Arc::from(text.as_str()),
                    tree: OnceLock::new(),
                    declarations: OnceLock::new(),
                }));
                document_ids.push(id);
            }
            let mut references = Vec::new();
            for name in &described.project_references {
                let id = ids.get(name).copied().ok_or_else(|| {
                    Error::Workspace(format!("project {} references unknown project {name}", described.name))
                })?;
                references.push(id);
            }
            projects.push(Project {
                id: project_id,
                name: assembly,
                documents: document_ids,
                project_references: references,
                metadata: described.metadata.clone(),
                compilation: OnceLock::new(),
            });
        }

        // metadata flows through project references
        let edges: Vec<Vec<ProjectId>> = projects
            .iter()
            .map(|project| project.project_references.clone())
            .collect();
        let direct: Vec<Vec<Arc<MetadataAssembly>>> =
            projects.iter().map(|project| project.metadata.clone()).collect();
        for project in &mut projects {
            for reference in reference_closure(&edges, project.id) {
                for assembly in &direct[reference.0 as usize] {
                    if !project.metadata.iter().any(|known| known.name == assembly.name) {
                        project.metadata.push(assembly.clone());
                    }
                }
            }
        }
        let solution = Solution {
            projects: projects.into_iter().map(Arc::new).collect(),
            documents,
            compilations_built: AtomicUsize::new(0),
        };
        Ok(Arc::new(solution))
    }
}
