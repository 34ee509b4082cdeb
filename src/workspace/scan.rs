use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ScannedProject {
    pub name: String,
    pub dir: PathBuf,
    pub project_file: PathBuf,
    /// Absolute, normalized paths of referenced project files.
    pub references: Vec<PathBuf>,
    pub uses_framework: bool,
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ScannedSolution {
    pub projects: Vec<ScannedProject>,
    pub files: Vec<ScannedFile>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub no_ignore: bool,
}

impl ScanOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

pub const FRAMEWORK_PACKAGE: &str = "Microsoft.Dynamics.Commerce.Runtime";

pub fn scan_solution(root: &Path, options: ScanOptions) -> Result<ScannedSolution> {
    let mut scanned = ScannedSolution::default();
    let mut builder = WalkBuilder::new(root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    let walker = builder
        .hidden(false)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("csproj") => scanned.projects.push(scan_project(path)?),
            Some("cs") => scanned.files.push(ScannedFile {
                rel_path: crate::util::normalize_rel_path(root, path)?,
                abs_path: path.to_path_buf(),
            }),
            _ => {}
        }
    }
    scanned.projects.sort_by(|a, b| a.project_file.cmp(&b.project_file));
    scanned.files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(scanned)
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    let name = entry.file_name();
    name == OsStr::new(".git") || name == OsStr::new("bin") || name == OsStr::new("obj")
}

fn scan_project(path: &Path) -> Result<ScannedProject> {
    let content = crate::util::read_to_string(path)?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("project file without directory: {}", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Project")
        .to_string();
    let name = element_text(&content, "AssemblyName").unwrap_or(stem);
    let references = attribute_values(&content, "ProjectReference", "Include")
        .into_iter()
        .map(|include| crate::util::msbuild_path(&dir, &include))
        .collect();
    Ok(ScannedProject {
        name,
        project_file: crate::util::lexical_normalize(path),
        dir: crate::util::lexical_normalize(&dir),
        references,
        uses_framework: content.contains(FRAMEWORK_PACKAGE),
    })
}

fn element_text(content: &str, element: &str) -> Option<String> {
    let open = format!("<{element}>");
    let close = format!("</{element}>");
    let start = content.find(&open)? + open.len();
    let end = content[start..].find(&close)? + start;
    let value = content[start..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn attribute_values(content: &str, element: &str, attribute: &str) -> Vec<String> {
    let open = format!("<{element}");
    let marker = format!("{attribute}=\"");
    let mut out = Vec::new();
    let mut rest = content;
    while let Some(index) = rest.find(&open) {
        rest = &rest[index + open.len()..];
        let tag_end = rest.find('>').unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if let Some(start) = tag.find(&marker) {
            let value = &tag[start + marker.len()..];
            if let Some(end) = value.find('"') {
                out.push(value[..end].to_string());
            }
        }
    }
    out
}
