use super::DocumentId;
use super::symbols::{
    DeclScope, MemberDecl, MemberKind, NameSegment, ParamDecl, RefKind, TypeDecl, TypeIdentity,
    TypeKind, TypeName,
};
use super::syntax::{SyntaxRef, first_child_of_kind, modifiers, named_children, node_text};
use std::sync::Arc;
use tree_sitter::Node;

/// One syntactic declaration of a type, before partial parts are merged.
#[derive(Debug, Clone)]
pub struct DeclPart {
    pub decl: TypeDecl,
    /// Scope of the type's body: its own type parameters and itself as the innermost enclosing type.
    pub body_scope: Arc<DeclScope>,
}

pub const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "record_declaration",
    "record_struct_declaration",
];

const TYPE_NODE_KINDS: &[&str] = &[
    "identifier",
    "generic_name",
    "qualified_name",
    "alias_qualified_name",
    "predefined_type",
    "array_type",
    "nullable_type",
    "implicit_type",
    "pointer_type",
    "ref_type",
    "tuple_type",
];

struct Extractor<'a> {
    source: &'a str,
    assembly: Arc<str>,
    document: Option<DocumentId>,
    parts: Vec<DeclPart>,
}

/// Collect every type declaration in a syntax tree.
///
/// `document` is `None` for metadata sources: the resulting declarations carry no syntax
/// references, like types loaded from a compiled assembly.
pub fn extract_declarations(
    root: Node<'_>,
    source: &str,
    assembly: &Arc<str>,
    document: Option<DocumentId>,
) -> Vec<DeclPart> {
    let mut extractor = Extractor {
        source,
        assembly: assembly.clone(),
        document,
        parts: Vec::new(),
    };
    let scope = DeclScope {
        usings: Arc::new(collect_usings(root, source, &[])),
        ..DeclScope::default()
    };
    extractor.walk_container(root, &scope);
    extractor.parts
}

impl Extractor<'_> {
    fn walk_container(&mut self, node: Node<'_>, scope: &DeclScope) {
        let mut current = scope.clone();
        for child in named_children(node) {
            match child.kind() {
                "namespace_declaration" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let inner = self.namespace_scope(&current, node_text(name, self.source), child);
                    if let Some(body) = child.child_by_field_name("body") {
                        self.walk_container(body, &inner);
                    }
                }
                "file_scoped_namespace_declaration" => {
                    let Some(name) = child.child_by_field_name("name") else {
                        continue;
                    };
                    current = self.namespace_scope(&current, node_text(name, self.source), child);
                    self.walk_container(child, &current);
                }
                "declaration_list" => self.walk_container(child, &current),
                kind if TYPE_DECLARATION_KINDS.contains(&kind) => self.handle_type(child, &current),
                _ => {}
            }
        }
    }

    fn namespace_scope(&self, outer: &DeclScope, name: &str, node: Node<'_>) -> DeclScope {
        let namespace = if outer.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", outer.namespace, name)
        };
        let body = node.child_by_field_name("body").unwrap_or(node);
        DeclScope {
            namespace,
            usings: Arc::new(collect_usings(body, self.source, &outer.usings)),
            enclosing_types: Vec::new(),
            type_params: Vec::new(),
        }
    }

    fn handle_type(&mut self, node: Node<'_>, scope: &DeclScope) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        if name.is_empty() {
            return;
        }
        let kind = match node.kind() {
            "interface_declaration" => TypeKind::Interface,
            "struct_declaration" | "record_struct_declaration" => TypeKind::Struct,
            "record_declaration" => TypeKind::Record,
            _ => TypeKind::Class,
        };
        let type_params = type_parameters(node, self.source);
        let metadata_name = metadata_name(scope, &name, type_params.len());

        let base_scope = Arc::new(DeclScope {
            type_params: scope
                .type_params
                .iter()
                .chain(&type_params)
                .cloned()
                .collect(),
            ..scope.clone()
        });
        let mut body_scope = (*base_scope).clone();
        body_scope.enclosing_types.push(metadata_name.clone());
        let body_scope = Arc::new(body_scope);

        let bases = first_child_of_kind(node, &["base_list"])
            .map(|list| base_list_types(list, self.source))
            .unwrap_or_default()
            .into_iter()
            .map(|base| (base, base_scope.clone()))
            .collect();

        let mut members = Vec::new();
        let mut nested = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            for member in named_children(body) {
                if TYPE_DECLARATION_KINDS.contains(&member.kind()) {
                    nested.push(member);
                    continue;
                }
                self.handle_member(member, kind, &body_scope, &mut members);
            }
        }

        let decl = TypeDecl {
            identity: TypeIdentity::new(self.assembly.clone(), metadata_name),
            name,
            namespace: scope.namespace.clone(),
            kind,
            type_params,
            bases,
            members,
            declaring: self
                .document
                .map(|document| vec![SyntaxRef::new(document, node)])
                .unwrap_or_default(),
            documentation: doc_comment(node, self.source),
        };
        self.parts.push(DeclPart {
            decl,
            body_scope: body_scope.clone(),
        });
        for child in nested {
            self.handle_type(child, &body_scope);
        }
    }

    fn handle_member(
        &self,
        node: Node<'_>,
        owner: TypeKind,
        scope: &Arc<DeclScope>,
        out: &mut Vec<MemberDecl>,
    ) {
        let mods = modifiers(node, self.source);
        let is_public = owner == TypeKind::Interface || mods.iter().any(|m| m == "public");
        let is_static = mods.iter().any(|m| m == "static" || m == "const");
        let documentation = doc_comment(node, self.source);
        match node.kind() {
            "property_declaration" => {
                let (Some(name), Some(ty)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("type"),
                ) else {
                    return;
                };
                out.push(MemberDecl {
                    name: node_text(name, self.source).to_string(),
                    kind: MemberKind::Property {
                        ty: type_name_from_node(ty, self.source),
                        writable: has_setter(node, self.source),
                    },
                    is_public,
                    is_static,
                    documentation,
                    declaring: self.syntax_ref(node),
                    scope: scope.clone(),
                });
            }
            "field_declaration" => {
                let Some(declaration) = first_child_of_kind(node, &["variable_declaration"]) else {
                    return;
                };
                let Some(ty) = declaration.child_by_field_name("type") else {
                    return;
                };
                let ty = type_name_from_node(ty, self.source);
                for declarator in named_children(declaration) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name) = declarator_name(declarator) else {
                        continue;
                    };
                    out.push(MemberDecl {
                        name: node_text(name, self.source).to_string(),
                        kind: MemberKind::Field { ty: ty.clone() },
                        is_public,
                        is_static,
                        documentation: documentation.clone(),
                        declaring: self.syntax_ref(declarator),
                        scope: scope.clone(),
                    });
                }
            }
            "method_declaration" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return;
                };
                let returns = node
                    .child_by_field_name("returns")
                    .or_else(|| node.child_by_field_name("type"))
                    .map(|ty| type_name_from_node(ty, self.source))
                    .unwrap_or(TypeName::Void);
                let type_params = type_parameters(node, self.source);
                let params = node
                    .child_by_field_name("parameters")
                    .map(|list| parameters(list, self.source))
                    .unwrap_or_default();
                out.push(MemberDecl {
                    name: node_text(name, self.source).to_string(),
                    kind: MemberKind::Method {
                        returns,
                        type_params,
                        params,
                    },
                    is_public,
                    is_static,
                    documentation,
                    declaring: self.syntax_ref(node),
                    scope: scope.clone(),
                });
            }
            _ => {}
        }
    }

    fn syntax_ref(&self, node: Node<'_>) -> Option<SyntaxRef> {
        self.document.map(|document| SyntaxRef::new(document, node))
    }
}

fn metadata_name(scope: &DeclScope, name: &str, arity: usize) -> String {
    let mut out = match scope.enclosing_types.last() {
        Some(outer) => format!("{outer}+{name}"),
        None if scope.namespace.is_empty() => name.to_string(),
        None => format!("{}.{}", scope.namespace, name),
    };
    if arity > 0 {
        out.push('`');
        out.push_str(&arity.to_string());
    }
    out
}

fn collect_usings(node: Node<'_>, source: &str, inherited: &[String]) -> Vec<String> {
    let mut usings = inherited.to_vec();
    for child in named_children(node) {
        if child.kind() != "using_directive" {
            continue;
        }
        // aliases and `using static` do not import namespaces
        let text = node_text(child, source);
        if text.contains('=') || text.starts_with("using static") {
            continue;
        }
        let target = named_children(child)
            .into_iter()
            .rev()
            .find(|part| matches!(part.kind(), "qualified_name" | "identifier" | "alias_qualified_name"));
        if let Some(target) = target {
            let name = node_text(target, source).replace("global::", "");
            if !name.is_empty() && !usings.contains(&name) {
                usings.push(name);
            }
        }
    }
    usings
}

fn type_parameters(node: Node<'_>, source: &str) -> Vec<String> {
    let Some(list) = node
        .child_by_field_name("type_parameters")
        .or_else(|| first_child_of_kind(node, &["type_parameter_list"]))
    else {
        return Vec::new();
    };
    named_children(list)
        .into_iter()
        .filter(|param| param.kind() == "type_parameter")
        .filter_map(|param| {
            param
                .child_by_field_name("name")
                .or_else(|| first_child_of_kind(param, &["identifier"]))
        })
        .map(|name| node_text(name, source).to_string())
        .collect()
}

fn base_list_types(node: Node<'_>, source: &str) -> Vec<TypeName> {
    let mut out = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "argument_list" => {}
            "primary_constructor_base_type" => {
                let ty = child
                    .child_by_field_name("type")
                    .or_else(|| first_child_of_kind(child, TYPE_NODE_KINDS));
                if let Some(ty) = ty {
                    out.push(type_name_from_node(ty, source));
                }
            }
            kind if TYPE_NODE_KINDS.contains(&kind) => out.push(type_name_from_node(child, source)),
            _ => {}
        }
    }
    out
}

fn parameters(list: Node<'_>, source: &str) -> Vec<ParamDecl> {
    named_children(list)
        .into_iter()
        .filter(|param| param.kind() == "parameter")
        .filter_map(|param| {
            let name = param.child_by_field_name("name")?;
            let ty = param
                .child_by_field_name("type")
                .map(|ty| type_name_from_node(ty, source))
                .unwrap_or(TypeName::Implicit);
            Some(ParamDecl {
                name: node_text(name, source).to_string(),
                ty,
                ref_kind: parameter_ref_kind(param, source),
            })
        })
        .collect()
}

/// `out`/`ref`/`in` keywords precede the parameter's type.
pub fn parameter_ref_kind(param: Node<'_>, source: &str) -> RefKind {
    let type_start = param
        .child_by_field_name("type")
        .or_else(|| param.child_by_field_name("name"))
        .map(|node| node.start_byte())
        .unwrap_or(param.end_byte());
    let mut cursor = param.walk();
    for child in param.children(&mut cursor) {
        if child.start_byte() >= type_start {
            break;
        }
        for word in node_text(child, source).split_whitespace() {
            match word {
                "out" => return RefKind::Out,
                "ref" => return RefKind::Ref,
                "in" => return RefKind::In,
                _ => {}
            }
        }
    }
    RefKind::None
}

fn has_setter(property: Node<'_>, source: &str) -> bool {
    let Some(accessors) = property
        .child_by_field_name("accessors")
        .or_else(|| first_child_of_kind(property, &["accessor_list"]))
    else {
        return false;
    };
    named_children(accessors)
        .into_iter()
        .filter(|accessor| accessor.kind() == "accessor_declaration")
        .any(|accessor| {
            let mut cursor = accessor.walk();
            let keyword = accessor
                .children(&mut cursor)
                .any(|child| matches!(child.kind(), "set" | "init"));
            keyword
                || accessor
                    .child_by_field_name("name")
                    .map(|name| matches!(node_text(name, source), "set" | "init"))
                    .unwrap_or(false)
        })
}

pub fn declarator_name(declarator: Node<'_>) -> Option<Node<'_>> {
    declarator
        .child_by_field_name("name")
        .or_else(|| first_child_of_kind(declarator, &["identifier"]))
}

/// Initializer expression of a variable declarator, if any.
pub fn declarator_initializer(declarator: Node<'_>) -> Option<Node<'_>> {
    let name = declarator_name(declarator)?;
    let value = named_children(declarator)
        .into_iter()
        .rev()
        .find(|child| child.id() != name.id() && child.kind() != "bracketed_argument_list")?;
    if value.kind() == "equals_value_clause" {
        return value.named_child(0);
    }
    Some(value)
}

/// Parse a type syntax node into an unbound `TypeName`.
pub fn type_name_from_node(node: Node<'_>, source: &str) -> TypeName {
    match node.kind() {
        "identifier" => match node_text(node, source) {
            "var" => TypeName::Implicit,
            name => TypeName::simple(name),
        },
        "generic_name" => TypeName::Path(vec![generic_segment(node, source)]),
        "qualified_name" => {
            let mut segments = Vec::new();
            flatten_qualified(node, source, &mut segments);
            TypeName::Path(segments)
        }
        "alias_qualified_name" => match node.child_by_field_name("name").or_else(|| {
            named_children(node).into_iter().last()
        }) {
            Some(name) => type_name_from_node(name, source),
            None => TypeName::Unknown(node_text(node, source).to_string()),
        },
        "predefined_type" | "void_keyword" => match node_text(node, source) {
            "void" => TypeName::Void,
            name => TypeName::Predefined(name.to_string()),
        },
        "implicit_type" => TypeName::Implicit,
        "array_type" => match inner_type(node) {
            Some(element) => TypeName::Array(Box::new(type_name_from_node(element, source))),
            None => TypeName::Unknown(node_text(node, source).to_string()),
        },
        "nullable_type" | "ref_type" | "pointer_type" | "scoped_type" => match inner_type(node) {
            Some(inner) => type_name_from_node(inner, source),
            None => TypeName::Unknown(node_text(node, source).to_string()),
        },
        _ => TypeName::Unknown(node_text(node, source).to_string()),
    }
}

fn inner_type(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("type")
        .or_else(|| first_child_of_kind(node, TYPE_NODE_KINDS))
}

fn generic_segment(node: Node<'_>, source: &str) -> NameSegment {
    let name = node
        .child_by_field_name("name")
        .or_else(|| first_child_of_kind(node, &["identifier"]))
        .map(|name| node_text(name, source).to_string())
        .unwrap_or_default();
    let args = first_child_of_kind(node, &["type_argument_list"])
        .map(|list| {
            named_children(list)
                .into_iter()
                .map(|arg| type_name_from_node(arg, source))
                .collect()
        })
        .unwrap_or_default();
    NameSegment { name, args }
}

fn flatten_qualified(node: Node<'_>, source: &str, out: &mut Vec<NameSegment>) {
    match node.kind() {
        "qualified_name" => {
            let children = named_children(node);
            let qualifier = node
                .child_by_field_name("qualifier")
                .or_else(|| children.first().copied());
            let name = node
                .child_by_field_name("name")
                .or_else(|| children.last().copied());
            if let Some(qualifier) = qualifier {
                flatten_qualified(qualifier, source, out);
            }
            if let Some(name) = name {
                flatten_qualified(name, source, out);
            }
        }
        "generic_name" => out.push(generic_segment(node, source)),
        "alias_qualified_name" => {
            if let Some(name) = named_children(node).into_iter().last() {
                flatten_qualified(name, source, out);
            }
        }
        _ => out.push(NameSegment {
            name: node_text(node, source).to_string(),
            args: Vec::new(),
        }),
    }
}

/// Contiguous `///` comment lines directly above a declaration, markers stripped.
pub fn doc_comment(node: Node<'_>, source: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(comment) = current {
        if comment.kind() != "comment" {
            break;
        }
        let text = node_text(comment, source);
        let Some(body) = text.strip_prefix("///") else {
            break;
        };
        lines.push(body.strip_prefix(' ').unwrap_or(body).to_string());
        current = comment.prev_sibling();
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}
