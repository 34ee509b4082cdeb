use super::declarations::DeclPart;
use super::symbols::{
    DeclScope, MemberDecl, MemberKind, NamedType, NameSegment, RefKind, TypeDecl, TypeIdentity,
    TypeKind, TypeName, TypeRef, substitution_map,
};
use super::syntax::{SyntaxRef, TextSpan, descendants_and_self};
use super::{DocumentId, Project, ProjectId, Solution};
use crate::error::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub document: DocumentId,
    pub span: TextSpan,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
struct TypeHeader {
    base: Option<TypeRef>,
    interfaces: Vec<TypeRef>,
}

/// A member found on a (possibly constructed) type.
#[derive(Debug, Clone)]
pub struct MemberRef {
    pub containing: NamedType,
    pub decl: Arc<TypeDecl>,
    pub index: usize,
}

impl MemberRef {
    pub fn member(&self) -> &MemberDecl {
        &self.decl.members[self.index]
    }

    pub fn name(&self) -> &str {
        &self.member().name
    }

    pub fn declaring(&self) -> Option<SyntaxRef> {
        self.member().declaring
    }

    fn substitutions(&self) -> HashMap<Arc<str>, TypeRef> {
        substitution_map(&self.decl.type_params, &self.containing.args)
    }
}

/// The bound view of one project: its own types plus everything it references.
#[derive(Debug)]
pub struct Compilation {
    pub project: ProjectId,
    pub assembly: Arc<str>,
    types: HashMap<TypeIdentity, Arc<TypeDecl>>,
    /// Preference order: own project, referenced projects, metadata.
    by_metadata_name: HashMap<Arc<str>, Vec<TypeIdentity>>,
    parts: HashMap<SyntaxRef, (TypeIdentity, Arc<DeclScope>)>,
    headers: HashMap<TypeIdentity, TypeHeader>,
    diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub(crate) fn build(solution: &Solution, project: &Project) -> Result<Self> {
        let mut order: Vec<TypeIdentity> = Vec::new();
        let mut merged: HashMap<TypeIdentity, TypeDecl> = HashMap::new();
        let mut parts = HashMap::new();
        let mut diagnostics = Vec::new();

        let mut add = |part: &DeclPart| {
            let identity = part.decl.identity.clone();
            for declaring in &part.decl.declaring {
                parts.insert(*declaring, (identity.clone(), part.body_scope.clone()));
            }
            match merged.get_mut(&identity) {
                Some(existing) => existing.merge(part.decl.clone()),
                None => {
                    order.push(identity.clone());
                    merged.insert(identity, part.decl.clone());
                }
            }
        };

        for id in &project.documents {
            let Some(document) = solution.document(*id) else {
                continue;
            };
            let tree = document.tree()?;
            if tree.root_node().has_error() {
                for node in descendants_and_self(tree.root_node()) {
                    if node.is_error() || node.is_missing() {
                        diagnostics.push(Diagnostic {
                            document: document.id,
                            span: TextSpan::of(node),
                            severity: Severity::Error,
                            message: format!("syntax error near '{}'", node.kind()),
                        });
                    }
                }
            }
            for part in document.declarations()? {
                add(part);
            }
        }
        for reference in solution.referenced_projects(project.id) {
            let Some(referenced) = solution.project(reference) else {
                continue;
            };
            for id in &referenced.documents {
                if let Some(document) = solution.document(*id) {
                    for part in document.declarations()? {
                        add(part);
                    }
                }
            }
        }
        for assembly in &project.metadata {
            for part in &assembly.types {
                add(part);
            }
        }

        let mut by_metadata_name: HashMap<Arc<str>, Vec<TypeIdentity>> = HashMap::new();
        for identity in &order {
            by_metadata_name
                .entry(identity.metadata_name.clone())
                .or_default()
                .push(identity.clone());
        }
        let types = merged
            .into_iter()
            .map(|(identity, decl)| (identity, Arc::new(decl)))
            .collect();

        let mut compilation = Compilation {
            project: project.id,
            assembly: project.name.clone(),
            types,
            by_metadata_name,
            parts,
            headers: HashMap::new(),
            diagnostics,
        };
        compilation.bind_headers();
        Ok(compilation)
    }

    fn bind_headers(&mut self) {
        let mut headers = HashMap::with_capacity(self.types.len());
        let mut diagnostics = Vec::new();
        for decl in self.types.values() {
            let mut header = TypeHeader::default();
            for (position, (name, scope)) in decl.bases.iter().enumerate() {
                let bound = self.resolve_type_name(name, scope, &[]);
                let is_interface = match bound.identity().and_then(|id| self.types.get(id)) {
                    Some(base) => base.kind == TypeKind::Interface,
                    None => {
                        if decl.identity.assembly == self.assembly {
                            if let Some(declaring) = decl.declaring.first() {
                                diagnostics.push(Diagnostic {
                                    document: declaring.document,
                                    span: declaring.span,
                                    severity: Severity::Warning,
                                    message: format!(
                                        "base type '{bound}' of {} could not be resolved",
                                        decl.identity
                                    ),
                                });
                            }
                        }
                        position > 0 || looks_like_interface(&bound.simple_name())
                    }
                };
                if is_interface || decl.kind == TypeKind::Interface || header.base.is_some() {
                    header.interfaces.push(bound);
                } else {
                    header.base = Some(bound);
                }
            }
            headers.insert(decl.identity.clone(), header);
        }
        self.headers = headers;
        self.diagnostics.extend(diagnostics);
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Error)
            .count()
    }

    pub fn type_decl(&self, identity: &TypeIdentity) -> Option<&Arc<TypeDecl>> {
        self.types.get(identity)
    }

    /// Look up a type by `Namespace.Name`N` metadata name.
    pub fn type_by_metadata_name(&self, metadata_name: &str) -> Option<&Arc<TypeDecl>> {
        self.by_metadata_name
            .get(metadata_name)
            .and_then(|ids| ids.first())
            .and_then(|id| self.types.get(id))
    }

    /// The type declared at a type declaration's syntax, with its body scope.
    pub fn declared_at(&self, syntax: &SyntaxRef) -> Option<(&TypeIdentity, &Arc<DeclScope>)> {
        self.parts.get(syntax).map(|(identity, scope)| (identity, scope))
    }

    pub fn base_type(&self, ty: &NamedType) -> Option<TypeRef> {
        let decl = self.types.get(&ty.identity)?;
        let header = self.headers.get(&ty.identity)?;
        let map = substitution_map(&decl.type_params, &ty.args);
        header.base.as_ref().map(|base| base.substitute(&map))
    }

    pub fn direct_interfaces(&self, ty: &NamedType) -> Vec<TypeRef> {
        let (Some(decl), Some(header)) = (self.types.get(&ty.identity), self.headers.get(&ty.identity))
        else {
            return Vec::new();
        };
        let map = substitution_map(&decl.type_params, &ty.args);
        header
            .interfaces
            .iter()
            .map(|interface| interface.substitute(&map))
            .collect()
    }

    /// Base classes from the direct base upwards. Stops at unresolved bases and cycles.
    pub fn base_chain(&self, ty: &NamedType) -> Vec<NamedType> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([ty.identity.clone()]);
        let mut current = self.base_type(ty);
        while let Some(TypeRef::Named(base)) = current {
            if !seen.insert(base.identity.clone()) {
                break;
            }
            current = self.base_type(&base);
            chain.push(base);
        }
        chain
    }

    /// Strict derivation: the type itself does not count.
    pub fn is_derived_from(&self, ty: &TypeRef, base: &TypeIdentity) -> bool {
        match ty {
            TypeRef::Named(named) => self
                .base_chain(named)
                .iter()
                .any(|ancestor| &ancestor.identity == base),
            _ => false,
        }
    }

    /// Every interface the type implements, directly or through bases and interface inheritance.
    pub fn all_interfaces(&self, ty: &NamedType) -> Vec<NamedType> {
        let mut out: Vec<NamedType> = Vec::new();
        let mut pending: Vec<NamedType> = Vec::new();
        for owner in std::iter::once(ty.clone()).chain(self.base_chain(ty)) {
            for interface in self.direct_interfaces(&owner) {
                if let TypeRef::Named(named) = interface {
                    pending.push(named);
                }
            }
        }
        pending.reverse();
        while let Some(interface) = pending.pop() {
            if out.contains(&interface) {
                continue;
            }
            let mut inherited: Vec<NamedType> = self
                .direct_interfaces(&interface)
                .into_iter()
                .filter_map(|inner| match inner {
                    TypeRef::Named(named) => Some(named),
                    _ => None,
                })
                .collect();
            out.push(interface);
            inherited.reverse();
            pending.extend(inherited);
        }
        out
    }

    /// Members declared directly on a type, in declaration order.
    pub fn own_members(&self, ty: &NamedType, name: &str) -> Vec<MemberRef> {
        let Some(decl) = self.types.get(&ty.identity) else {
            return Vec::new();
        };
        decl.members
            .iter()
            .enumerate()
            .filter(|(_, member)| member.name == name)
            .map(|(index, _)| MemberRef {
                containing: ty.clone(),
                decl: decl.clone(),
                index,
            })
            .collect()
    }

    /// Members named `name` on the type, then its bases, then (for interfaces) inherited interfaces.
    pub fn lookup_members(&self, ty: &NamedType, name: &str) -> Vec<MemberRef> {
        let mut owners = vec![ty.clone()];
        owners.extend(self.base_chain(ty));
        if self
            .types
            .get(&ty.identity)
            .is_some_and(|decl| decl.kind == TypeKind::Interface)
        {
            owners.extend(self.all_interfaces(ty));
        }
        let mut found = Vec::new();
        for owner in owners {
            let members = self.own_members(&owner, name);
            if !members.is_empty() {
                if members.iter().all(|member| !member.member().is_method()) {
                    return members;
                }
                found.extend(members);
            }
        }
        found
    }

    /// Member of `class` (or its bases) that implements `member_name` of `interface`.
    pub fn find_implementation_for_interface_member(
        &self,
        class: &NamedType,
        interface: &TypeIdentity,
        member_name: &str,
    ) -> Option<MemberRef> {
        if !self
            .all_interfaces(class)
            .iter()
            .any(|implemented| &implemented.identity == interface)
        {
            return None;
        }
        std::iter::once(class.clone())
            .chain(self.base_chain(class))
            .find_map(|owner| {
                self.own_members(&owner, member_name)
                    .into_iter()
                    .find(|member| !member.member().is_method())
            })
    }

    /// Type of a property or field, or the return type of a method, on the constructed owner.
    pub fn member_type(&self, member: &MemberRef) -> TypeRef {
        let decl = member.member();
        let written = match &decl.kind {
            MemberKind::Property { ty, .. } | MemberKind::Field { ty } => ty,
            MemberKind::Method { returns, .. } => returns,
        };
        let extra = method_type_params(decl);
        self.resolve_type_name(written, &decl.scope, extra)
            .substitute(&member.substitutions())
    }

    /// Parameters of a method member, bound and substituted on the constructed owner.
    pub fn member_parameters(&self, member: &MemberRef) -> Vec<(String, TypeRef, RefKind)> {
        let decl = member.member();
        let MemberKind::Method { params, .. } = &decl.kind else {
            return Vec::new();
        };
        let map = member.substitutions();
        let extra = method_type_params(decl);
        params
            .iter()
            .map(|param| {
                let ty = self
                    .resolve_type_name(&param.ty, &decl.scope, extra)
                    .substitute(&map);
                (param.name.clone(), ty, param.ref_kind)
            })
            .collect()
    }

    /// Bind a written type name in `scope`. Names that bind to nothing become `External`.
    pub fn resolve_type_name(&self, name: &TypeName, scope: &DeclScope, extra_type_params: &[String]) -> TypeRef {
        match name {
            TypeName::Void => TypeRef::Void,
            TypeName::Implicit => TypeRef::External {
                name: Arc::from("var"),
                args: Vec::new(),
            },
            TypeName::Predefined(name) => TypeRef::Predefined(Arc::from(name.as_str())),
            TypeName::Unknown(text) => TypeRef::External {
                name: Arc::from(text.as_str()),
                args: Vec::new(),
            },
            TypeName::Array(element) => {
                TypeRef::Array(Box::new(self.resolve_type_name(element, scope, extra_type_params)))
            }
            TypeName::Path(segments) => self.resolve_path(segments, scope, extra_type_params),
        }
    }

    fn resolve_path(&self, segments: &[NameSegment], scope: &DeclScope, extra: &[String]) -> TypeRef {
        let args: Vec<TypeRef> = segments
            .iter()
            .flat_map(|segment| &segment.args)
            .map(|arg| self.resolve_type_name(arg, scope, extra))
            .collect();
        if let [single] = segments {
            if single.args.is_empty()
                && (extra.contains(&single.name) || scope.type_params.contains(&single.name))
            {
                return TypeRef::TypeParameter(Arc::from(single.name.as_str()));
            }
        }
        for relative in relative_names(segments) {
            if let Some(identity) = self.lookup_in_scope(&relative, scope, segments.len() == 1) {
                return TypeRef::Named(NamedType { identity, args });
            }
        }
        let written: Vec<&str> = segments.iter().map(|segment| segment.name.as_str()).collect();
        TypeRef::External {
            name: Arc::from(written.join(".")),
            args,
        }
    }

    fn lookup_in_scope(&self, relative: &str, scope: &DeclScope, simple: bool) -> Option<TypeIdentity> {
        let find = |candidate: &str| {
            self.by_metadata_name
                .get(candidate)
                .and_then(|ids| ids.first())
                .cloned()
        };
        for outer in scope.enclosing_types.iter().rev() {
            if let Some(found) = find(&format!("{outer}+{relative}")) {
                return Some(found);
            }
        }
        let mut namespace = scope.namespace.as_str();
        loop {
            let candidate = if namespace.is_empty() {
                relative.to_string()
            } else {
                format!("{namespace}.{relative}")
            };
            if let Some(found) = find(&candidate) {
                return Some(found);
            }
            if namespace.is_empty() {
                break;
            }
            namespace = namespace.rsplit_once('.').map(|(head, _)| head).unwrap_or("");
        }
        if simple {
            for using in scope.usings.iter() {
                if let Some(found) = find(&format!("{using}.{relative}")) {
                    return Some(found);
                }
            }
        }
        None
    }
}

fn method_type_params(decl: &MemberDecl) -> &[String] {
    match &decl.kind {
        MemberKind::Method { type_params, .. } => type_params,
        _ => &[],
    }
}

/// Metadata-name spellings of a written path: fully dotted first, then with trailing segments
/// read as nested types.
fn relative_names(segments: &[NameSegment]) -> Vec<String> {
    let render = |segment: &NameSegment| {
        if segment.args.is_empty() {
            segment.name.clone()
        } else {
            format!("{}`{}", segment.name, segment.args.len())
        }
    };
    (1..=segments.len())
        .rev()
        .map(|split| {
            let head: Vec<String> = segments[..split].iter().map(render).collect();
            let mut name = head.join(".");
            for nested in &segments[split..] {
                name.push('+');
                name.push_str(&render(nested));
            }
            name
        })
        .collect()
}

fn looks_like_interface(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some('I'), Some(second)) if second.is_ascii_uppercase())
}
