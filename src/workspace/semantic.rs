use super::Document;
use super::compilation::{Compilation, MemberRef};
use super::declarations::{
    TYPE_DECLARATION_KINDS, declarator_initializer, declarator_name, type_name_from_node,
};
use super::symbols::{DeclScope, MemberKind, NamedType, RefKind, TypeRef, substitution_map};
use super::syntax::{
    Location, SyntaxRef, ancestors_and_self, descendants, first_child_of_kind, named_children,
    node_text,
};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tree_sitter::{Node, Tree};

const MAX_TYPE_DEPTH: usize = 64;

/// Declarations that own a local scope.
const SCOPE_OWNER_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "operator_declaration",
    "conversion_operator_declaration",
    "property_declaration",
    "indexer_declaration",
    "event_declaration",
    "field_declaration",
    "global_statement",
];

/// Nodes whose `name` field declares rather than references.
const DECLARING_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "struct_declaration",
    "record_declaration",
    "record_struct_declaration",
    "enum_declaration",
    "enum_member_declaration",
    "delegate_declaration",
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "property_declaration",
    "event_declaration",
    "variable_declarator",
    "parameter",
    "type_parameter",
    "local_function_statement",
    "namespace_declaration",
    "file_scoped_namespace_declaration",
    "catch_declaration",
    "foreach_statement",
    "single_variable_designation",
    "accessor_declaration",
];

/// A local variable or parameter visible at some point in a body.
#[derive(Debug, Clone)]
pub struct LocalSymbol {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub declaration: SyntaxRef,
}

#[derive(Debug, Clone)]
pub struct ParameterSymbol {
    pub name: String,
    pub ty: TypeRef,
    pub ref_kind: RefKind,
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub member: MemberRef,
    pub parameters: Vec<ParameterSymbol>,
    pub returns: TypeRef,
}

impl MethodSymbol {
    pub fn name(&self) -> &str {
        self.member.name()
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Type(TypeRef),
    Local(LocalSymbol),
    Parameter(LocalSymbol),
    /// Field or property.
    Member(MemberRef, TypeRef),
    Method(MethodSymbol),
}

impl Symbol {
    /// Source declaration of the symbol, when it has one.
    pub fn declaring(&self) -> Option<SyntaxRef> {
        match self {
            Symbol::Type(_) => None,
            Symbol::Local(local) | Symbol::Parameter(local) => Some(local.declaration),
            Symbol::Member(member, _) => member.declaring(),
            Symbol::Method(method) => method.member.declaring(),
        }
    }

    pub fn ty(&self) -> Option<TypeRef> {
        match self {
            Symbol::Type(ty) => Some(ty.clone()),
            Symbol::Local(local) | Symbol::Parameter(local) => local.ty.clone(),
            Symbol::Member(_, ty) => Some(ty.clone()),
            Symbol::Method(_) => None,
        }
    }
}

/// Semantic queries over one document, bound against its project's compilation.
pub struct SemanticModel {
    compilation: Arc<Compilation>,
    document: Arc<Document>,
    tree: Tree,
}

impl SemanticModel {
    pub fn new(compilation: Arc<Compilation>, document: Arc<Document>) -> Result<Self> {
        let tree = document.tree()?.clone();
        Ok(Self {
            compilation,
            document,
            tree,
        })
    }

    pub fn compilation(&self) -> &Arc<Compilation> {
        &self.compilation
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        self.document.text()
    }

    pub fn syntax_ref(&self, node: Node<'_>) -> SyntaxRef {
        SyntaxRef::new(self.document.id, node)
    }

    pub fn location(&self, node: Node<'_>) -> Location {
        Location::from_node(self.document.id, self.document.path.clone(), node)
    }

    fn text<'a>(&'a self, node: Node<'_>) -> &'a str {
        node_text(node, self.source())
    }

    /// The type a type declaration node declares.
    pub fn declared_type(&self, node: Node<'_>) -> Option<NamedType> {
        let (identity, _) = self.compilation.declared_at(&self.syntax_ref(node))?;
        self.compilation.type_decl(identity).map(|decl| decl.as_type())
    }

    /// The member a method (or property) declaration node declares.
    pub fn declared_member(&self, node: Node<'_>) -> Option<MemberRef> {
        let owner_node = node
            .parent()
            .and_then(|parent| ancestors_and_self(parent).find(|n| TYPE_DECLARATION_KINDS.contains(&n.kind())))?;
        let owner = self.declared_type(owner_node)?;
        let decl = self.compilation.type_decl(&owner.identity)?.clone();
        let target = self.syntax_ref(node);
        let index = decl
            .members
            .iter()
            .position(|member| member.declaring == Some(target))?;
        Some(MemberRef {
            containing: owner,
            decl,
            index,
        })
    }

    pub fn method_symbol(&self, member: MemberRef) -> Option<MethodSymbol> {
        if !member.member().is_method() {
            return None;
        }
        let parameters = self
            .compilation
            .member_parameters(&member)
            .into_iter()
            .map(|(name, ty, ref_kind)| ParameterSymbol { name, ty, ref_kind })
            .collect();
        let returns = self.compilation.member_type(&member);
        Some(MethodSymbol {
            member,
            parameters,
            returns,
        })
    }

    /// Innermost enclosing type, self-constructed.
    pub fn enclosing_type(&self, node: Node<'_>) -> Option<NamedType> {
        ancestors_and_self(node)
            .filter(|n| TYPE_DECLARATION_KINDS.contains(&n.kind()))
            .find_map(|n| self.declared_type(n))
    }

    fn scope_at(&self, node: Node<'_>) -> (Arc<DeclScope>, Vec<String>) {
        let mut method_type_params = Vec::new();
        for ancestor in ancestors_and_self(node) {
            if matches!(ancestor.kind(), "method_declaration" | "local_function_statement") {
                if let Some(list) = ancestor
                    .child_by_field_name("type_parameters")
                    .or_else(|| first_child_of_kind(ancestor, &["type_parameter_list"]))
                {
                    for param in named_children(list) {
                        if let Some(name) = param
                            .child_by_field_name("name")
                            .or_else(|| first_child_of_kind(param, &["identifier"]))
                        {
                            method_type_params.push(self.text(name).to_string());
                        }
                    }
                }
            }
            if TYPE_DECLARATION_KINDS.contains(&ancestor.kind()) {
                if let Some((_, scope)) = self.compilation.declared_at(&self.syntax_ref(ancestor)) {
                    return (scope.clone(), method_type_params);
                }
            }
        }
        (Arc::new(DeclScope::default()), method_type_params)
    }

    /// Bind a type syntax node in the scope it appears in.
    pub fn bind_type_syntax(&self, node: Node<'_>) -> TypeRef {
        let (scope, extra) = self.scope_at(node);
        let name = type_name_from_node(node, self.source());
        self.compilation.resolve_type_name(&name, &scope, &extra)
    }

    /// Compile-time type of an expression, identifier or type syntax.
    pub fn type_of(&self, node: Node<'_>) -> Option<TypeRef> {
        self.type_of_depth(node, 0)
    }

    fn type_of_depth(&self, node: Node<'_>, depth: usize) -> Option<TypeRef> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        let next = depth + 1;
        match node.kind() {
            "identifier" | "generic_name" | "member_access_expression" | "qualified_name" => {
                self.symbol_of_depth(node, next).and_then(|symbol| symbol.ty())
            }
            "predefined_type" | "array_type" | "nullable_type" => Some(self.bind_type_syntax(node)),
            "object_creation_expression" | "array_creation_expression" | "cast_expression"
            | "default_expression" => node
                .child_by_field_name("type")
                .map(|ty| self.bind_type_syntax(ty)),
            "implicit_array_creation_expression" => {
                let initializer = first_child_of_kind(node, &["initializer_expression"])?;
                let first = initializer.named_child(0)?;
                let element = self.type_of_depth(first, next)?;
                Some(TypeRef::Array(Box::new(element)))
            }
            "typeof_expression" => Some(TypeRef::External {
                name: Arc::from("System.Type"),
                args: Vec::new(),
            }),
            "as_expression" => node
                .child_by_field_name("right")
                .or_else(|| named_children(node).into_iter().last())
                .map(|ty| self.bind_type_syntax(ty)),
            "await_expression" => {
                let awaited = self.type_of_depth(node.named_child(0)?, next)?;
                match awaited.simple_name().as_str() {
                    "Task" | "ValueTask" => awaited.args().first().cloned(),
                    _ => None,
                }
            }
            "parenthesized_expression" | "checked_expression" | "argument" | "equals_value_clause" => {
                let inner = named_children(node).into_iter().last()?;
                self.type_of_depth(inner, next)
            }
            "conditional_expression" => node
                .child_by_field_name("consequence")
                .and_then(|branch| self.type_of_depth(branch, next)),
            "assignment_expression" => node
                .child_by_field_name("left")
                .and_then(|left| self.type_of_depth(left, next)),
            "element_access_expression" => {
                let target = node.child_by_field_name("expression")?;
                match self.type_of_depth(target, next)? {
                    TypeRef::Array(element) => Some(*element),
                    _ => None,
                }
            }
            "this_expression" | "this" => self.enclosing_type(node).map(TypeRef::Named),
            "base_expression" | "base" => {
                let current = self.enclosing_type(node)?;
                self.compilation.base_type(&current)
            }
            "invocation_expression" => self.invoked_method(node).map(|method| method.returns),
            "string_literal" | "verbatim_string_literal" | "raw_string_literal"
            | "interpolated_string_expression" => Some(predefined("string")),
            "integer_literal" => Some(predefined("int")),
            "real_literal" => Some(predefined("double")),
            "boolean_literal" => Some(predefined("bool")),
            "character_literal" => Some(predefined("char")),
            _ => None,
        }
    }

    /// The symbol a name, member access or invocation refers to.
    pub fn symbol_of(&self, node: Node<'_>) -> Option<Symbol> {
        self.symbol_of_depth(node, 0)
    }

    fn symbol_of_depth(&self, node: Node<'_>, depth: usize) -> Option<Symbol> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        let next = depth + 1;
        match node.kind() {
            "identifier" => {
                if is_declaration_name(node) {
                    return None;
                }
                let parent = node.parent()?;
                match parent.kind() {
                    "generic_name" => return self.symbol_of_depth(parent, next),
                    "qualified_name" => {
                        let is_last = named_children(parent).last().map(|last| last.id()) == Some(node.id());
                        return if is_last {
                            self.symbol_of_depth(outermost_qualified(parent), next)
                        } else {
                            None
                        };
                    }
                    "member_access_expression"
                        if parent.child_by_field_name("name").map(|n| n.id()) == Some(node.id()) =>
                    {
                        return self.symbol_of_depth(parent, next);
                    }
                    _ => {}
                }
                if is_type_position(node) {
                    return Some(Symbol::Type(self.bind_type_syntax(node)));
                }
                self.bind_simple_name(node, next)
            }
            "generic_name" => {
                if is_type_position(node) {
                    return Some(Symbol::Type(self.bind_type_syntax(node)));
                }
                let parent = node.parent()?;
                let invocation = match parent.kind() {
                    "invocation_expression" => Some(parent),
                    "member_access_expression" => parent
                        .parent()
                        .filter(|grand| grand.kind() == "invocation_expression"),
                    _ => None,
                };
                invocation
                    .and_then(|call| self.invoked_method(call))
                    .map(Symbol::Method)
            }
            "qualified_name" | "predefined_type" | "array_type" | "nullable_type" => {
                Some(Symbol::Type(self.bind_type_syntax(node)))
            }
            "member_access_expression" => self.bind_member_access(node, next),
            "invocation_expression" => self.invoked_method(node).map(Symbol::Method),
            _ => None,
        }
    }

    fn bind_simple_name(&self, node: Node<'_>, depth: usize) -> Option<Symbol> {
        let name = self.text(node);
        if let Some(local) = self.lookup_local(node, name, depth) {
            return Some(local);
        }
        if let Some(current) = self.enclosing_type(node) {
            let mut owners = vec![current.clone()];
            owners.extend(self.outer_types(node));
            for owner in owners {
                if let Some(symbol) = self.member_symbol(&owner, name, node) {
                    return Some(symbol);
                }
            }
        }
        match self.bind_type_syntax(node) {
            ty @ TypeRef::Named(_) => Some(Symbol::Type(ty)),
            _ => None,
        }
    }

    fn outer_types(&self, node: Node<'_>) -> Vec<NamedType> {
        ancestors_and_self(node)
            .filter(|n| TYPE_DECLARATION_KINDS.contains(&n.kind()))
            .skip(1)
            .filter_map(|n| self.declared_type(n))
            .collect()
    }

    fn member_symbol(&self, owner: &NamedType, name: &str, usage: Node<'_>) -> Option<Symbol> {
        let members = self.compilation.lookup_members(owner, name);
        let first = members.first()?.clone();
        if first.member().is_method() {
            let call = usage
                .parent()
                .filter(|parent| parent.kind() == "invocation_expression");
            return match call {
                Some(call) => self.invoked_method(call).map(Symbol::Method),
                None => self.method_symbol(first).map(Symbol::Method),
            };
        }
        let ty = self.compilation.member_type(&first);
        Some(Symbol::Member(first, ty))
    }

    fn bind_member_access(&self, node: Node<'_>, depth: usize) -> Option<Symbol> {
        let receiver = node.child_by_field_name("expression")?;
        let name_node = node.child_by_field_name("name")?;
        let name = match name_node.kind() {
            "generic_name" => name_node
                .child_by_field_name("name")
                .or_else(|| first_child_of_kind(name_node, &["identifier"]))
                .map(|n| self.text(n))?,
            _ => self.text(name_node),
        };
        let receiver_type = match self.symbol_of_depth(receiver, depth + 1) {
            Some(Symbol::Type(ty)) => Some(ty),
            Some(symbol) => symbol.ty(),
            None => self.type_of_depth(receiver, depth + 1),
        };
        match receiver_type {
            Some(TypeRef::Named(owner)) => {
                if let Some(symbol) = self.member_symbol(&owner, name, node) {
                    return Some(symbol);
                }
                // nested type accessed through its container
                let nested = format!("{}+{}", owner.identity.metadata_name, name);
                self.compilation
                    .type_by_metadata_name(&nested)
                    .map(|decl| Symbol::Type(TypeRef::Named(decl.as_type())))
            }
            Some(_) => None,
            None => {
                // `Namespace.Type` written as an expression
                let dotted = self.text(node).replace(char::is_whitespace, "");
                self.compilation
                    .type_by_metadata_name(&dotted)
                    .map(|decl| Symbol::Type(TypeRef::Named(decl.as_type())))
            }
        }
    }

    /// Resolve the method an invocation calls, matching on name and argument count.
    pub fn invoked_method(&self, invocation: Node<'_>) -> Option<MethodSymbol> {
        let function = invocation.child_by_field_name("function")?;
        let arguments = invocation_arguments(invocation);
        let (owners, name_node) = match function.kind() {
            "member_access_expression" => {
                let receiver = function.child_by_field_name("expression")?;
                let receiver_type = match self.symbol_of(receiver) {
                    Some(Symbol::Type(ty)) => Some(ty),
                    Some(symbol) => symbol.ty(),
                    None => self.type_of(receiver),
                };
                let Some(TypeRef::Named(owner)) = receiver_type else {
                    return None;
                };
                (vec![owner], function.child_by_field_name("name")?)
            }
            "identifier" | "generic_name" => {
                let mut owners: Vec<NamedType> = self.enclosing_type(invocation).into_iter().collect();
                owners.extend(self.outer_types(invocation));
                (owners, function)
            }
            _ => return None,
        };
        let (name, explicit_args) = match name_node.kind() {
            "generic_name" => {
                let name = name_node
                    .child_by_field_name("name")
                    .or_else(|| first_child_of_kind(name_node, &["identifier"]))
                    .map(|n| self.text(n))?;
                let args: Vec<TypeRef> = first_child_of_kind(name_node, &["type_argument_list"])
                    .map(|list| {
                        named_children(list)
                            .into_iter()
                            .map(|arg| self.bind_type_syntax(arg))
                            .collect()
                    })
                    .unwrap_or_default();
                (name, args)
            }
            _ => (self.text(name_node), Vec::new()),
        };

        let candidates: Vec<MemberRef> = owners
            .iter()
            .flat_map(|owner| self.compilation.lookup_members(owner, name))
            .filter(|member| member.member().is_method())
            .collect();
        let arity = |member: &MemberRef| match &member.member().kind {
            MemberKind::Method { params, .. } => params.len(),
            _ => 0,
        };
        let chosen = candidates
            .iter()
            .find(|member| arity(member) == arguments.len())
            .or_else(|| candidates.iter().find(|member| arity(member) > arguments.len()))
            .or_else(|| candidates.first())?
            .clone();

        let mut method = self.method_symbol(chosen)?;
        let type_params = match &method.member.member().kind {
            MemberKind::Method { type_params, .. } => type_params.clone(),
            _ => Vec::new(),
        };
        if !type_params.is_empty() {
            let mut map: HashMap<Arc<str>, TypeRef> = substitution_map(&type_params, &explicit_args);
            if explicit_args.is_empty() {
                // infer from arguments passed directly to type-parameter parameters
                for (parameter, argument) in method.parameters.iter().zip(&arguments) {
                    if let TypeRef::TypeParameter(param) = &parameter.ty {
                        if type_params.iter().any(|tp| tp.as_str() == &**param) {
                            if let Some(ty) = self.type_of(*argument) {
                                map.entry(param.clone()).or_insert(ty);
                            }
                        }
                    }
                }
            }
            for parameter in &mut method.parameters {
                parameter.ty = parameter.ty.substitute(&map);
            }
            method.returns = method.returns.substitute(&map);
        }
        Some(method)
    }

    /// Innermost visible local or parameter named `name` declared before `usage`.
    fn lookup_local<'t>(&self, usage: Node<'t>, name: &str, depth: usize) -> Option<Symbol> {
        let owner = ancestors_and_self(usage)
            .take_while(|n| !TYPE_DECLARATION_KINDS.contains(&n.kind()))
            .filter(|n| SCOPE_OWNER_KINDS.contains(&n.kind()))
            .last()?;
        let position = usage.start_byte();
        let mut best: Option<(usize, Node<'t>, bool)> = None;
        let mut consider = |declaration: Node<'t>, scope: Node<'t>, is_parameter: bool| {
            let contains = scope.start_byte() <= position && position < scope.end_byte();
            if !contains || declaration.start_byte() > position {
                return;
            }
            if best.is_none_or(|(start, _, _)| declaration.start_byte() >= start) {
                best = Some((declaration.start_byte(), declaration, is_parameter));
            }
        };
        for candidate in std::iter::once(owner).chain(descendants(owner)) {
            match candidate.kind() {
                "parameter" => {
                    let matches = candidate
                        .child_by_field_name("name")
                        .is_some_and(|n| self.text(n) == name);
                    if matches {
                        let scope = candidate
                            .parent()
                            .and_then(|list| list.parent())
                            .unwrap_or(owner);
                        consider(candidate, scope, true);
                    }
                }
                "lambda_expression" | "simple_lambda_expression" => {
                    let implicit = candidate
                        .child_by_field_name("parameters")
                        .or_else(|| candidate.child_by_field_name("parameter"))
                        .filter(|param| param.kind() == "identifier" && self.text(*param) == name);
                    if let Some(param) = implicit {
                        consider(param, candidate, true);
                    }
                }
                "variable_declarator" => {
                    if declarator_name(candidate).is_some_and(|n| self.text(n) == name) {
                        let scope = enclosing_block(candidate).unwrap_or(owner);
                        consider(candidate, scope, false);
                    }
                }
                "foreach_statement" | "catch_declaration" | "declaration_expression"
                | "declaration_pattern" | "recursive_pattern" => {
                    let declared = candidate
                        .child_by_field_name("left")
                        .or_else(|| candidate.child_by_field_name("name"))
                        .or_else(|| {
                            first_child_of_kind(candidate, &["single_variable_designation"])
                                .or_else(|| candidate.child_by_field_name("designation"))
                        });
                    if declared.is_some_and(|n| self.text(n) == name) {
                        let scope = match candidate.kind() {
                            "foreach_statement" => candidate,
                            "catch_declaration" => candidate.parent().unwrap_or(owner),
                            _ => enclosing_block(candidate).unwrap_or(owner),
                        };
                        consider(candidate, scope, false);
                    }
                }
                _ => {}
            }
        }
        let (_, declaration, is_parameter) = best?;
        let local = LocalSymbol {
            name: name.to_string(),
            ty: self.local_type(declaration, depth),
            declaration: self.syntax_ref(declaration),
        };
        Some(if is_parameter {
            Symbol::Parameter(local)
        } else {
            Symbol::Local(local)
        })
    }

    fn local_type(&self, declaration: Node<'_>, depth: usize) -> Option<TypeRef> {
        match declaration.kind() {
            "parameter" => declaration
                .child_by_field_name("type")
                .map(|ty| self.bind_type_syntax(ty)),
            "variable_declarator" => {
                let ty = declaration.parent()?.child_by_field_name("type")?;
                if ty.kind() == "implicit_type" || self.text(ty) == "var" {
                    let value = declarator_initializer(declaration)?;
                    return self.type_of_depth(value, depth + 1);
                }
                Some(self.bind_type_syntax(ty))
            }
            "foreach_statement" => {
                let ty = declaration.child_by_field_name("type")?;
                if ty.kind() != "implicit_type" && self.text(ty) != "var" {
                    return Some(self.bind_type_syntax(ty));
                }
                let source = declaration.child_by_field_name("right")?;
                match self.type_of_depth(source, depth + 1)? {
                    TypeRef::Array(element) => Some(*element),
                    other => other.args().first().cloned(),
                }
            }
            _ => {
                let ty = declaration.child_by_field_name("type")?;
                if ty.kind() == "implicit_type" || self.text(ty) == "var" {
                    return None;
                }
                Some(self.bind_type_syntax(ty))
            }
        }
    }
}

fn predefined(name: &str) -> TypeRef {
    TypeRef::Predefined(Arc::from(name))
}

fn outermost_qualified(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.kind() != "qualified_name" {
            break;
        }
        current = parent;
    }
    current
}

fn enclosing_block(node: Node<'_>) -> Option<Node<'_>> {
    node.parent().and_then(|parent| {
        ancestors_and_self(parent).find(|n| {
            matches!(
                n.kind(),
                "block" | "switch_section" | "for_statement" | "using_statement" | "arrow_expression_clause"
            )
        })
    })
}

/// Argument expressions of an invocation or object creation, in order.
pub fn invocation_arguments(node: Node<'_>) -> Vec<Node<'_>> {
    let Some(list) = node
        .child_by_field_name("arguments")
        .or_else(|| first_child_of_kind(node, &["argument_list"]))
    else {
        return Vec::new();
    };
    named_children(list)
        .into_iter()
        .filter(|argument| argument.kind() == "argument")
        .filter_map(|argument| named_children(argument).into_iter().last())
        .collect()
}

/// Name of a declaration rather than a use of a name.
pub fn is_declaration_name(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if !DECLARING_KINDS.contains(&parent.kind()) {
        return false;
    }
    let declared = parent
        .child_by_field_name("name")
        .or_else(|| parent.child_by_field_name("left"));
    match declared {
        Some(declared) => declared.id() == node.id(),
        None => matches!(parent.kind(), "single_variable_designation" | "variable_declarator"),
    }
}

/// Whether a name appears where only a type may be written.
pub fn is_type_position(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "type_argument_list" | "base_list" | "array_type" | "nullable_type" | "pointer_type"
        | "ref_type" | "type_parameter_constraint" | "type_constraint" | "typeof_expression"
        | "default_expression" | "sizeof_expression" | "primary_constructor_base_type"
        | "explicit_interface_specifier" => true,
        "qualified_name" => {
            named_children(parent).last().map(|last| last.id()) == Some(node.id())
                && is_type_position(outermost_qualified(parent))
        }
        "as_expression" | "is_expression" => {
            parent.child_by_field_name("right").map(|n| n.id()) == Some(node.id())
        }
        _ => {
            parent.child_by_field_name("type").map(|n| n.id()) == Some(node.id())
                || parent.child_by_field_name("returns").map(|n| n.id()) == Some(node.id())
        }
    }
}
