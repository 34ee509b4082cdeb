use super::syntax::SyntaxRef;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Structural identity of a declared type: the assembly that declares it and its metadata name
/// (`Ns.Outer+Inner`1`). Equal across compilations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeIdentity {
    pub assembly: Arc<str>,
    pub metadata_name: Arc<str>,
}

impl TypeIdentity {
    pub fn new(assembly: impl Into<Arc<str>>, metadata_name: impl Into<Arc<str>>) -> Self {
        Self {
            assembly: assembly.into(),
            metadata_name: metadata_name.into(),
        }
    }

    /// Simple name without namespace, containing types or arity.
    pub fn name(&self) -> &str {
        let last = self
            .metadata_name
            .rsplit(['.', '+'])
            .next()
            .unwrap_or(&self.metadata_name);
        last.split('`').next().unwrap_or(last)
    }

    /// Dotted, arity-free name as written in source.
    pub fn display_name(&self) -> String {
        self.metadata_name
            .split(['.', '+'])
            .map(|segment| segment.split('`').next().unwrap_or(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// A declared type, possibly constructed with type arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedType {
    pub identity: TypeIdentity,
    pub args: Vec<TypeRef>,
}

impl NamedType {
    pub fn name(&self) -> &str {
        self.identity.name()
    }
}

/// A resolved reference to a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(NamedType),
    /// A name the compilation could not bind, kept by its written form.
    External {
        name: Arc<str>,
        args: Vec<TypeRef>,
    },
    TypeParameter(Arc<str>),
    Array(Box<TypeRef>),
    Predefined(Arc<str>),
    Void,
}

impl TypeRef {
    pub fn named(&self) -> Option<&NamedType> {
        match self {
            TypeRef::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&TypeIdentity> {
        self.named().map(|named| &named.identity)
    }

    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named(named) => &named.args,
            TypeRef::External { args, .. } => args,
            _ => &[],
        }
    }

    pub fn simple_name(&self) -> String {
        match self {
            TypeRef::Named(named) => named.name().to_string(),
            TypeRef::External { name, .. } => name.rsplit('.').next().unwrap_or(name).to_string(),
            TypeRef::TypeParameter(name) | TypeRef::Predefined(name) => name.to_string(),
            TypeRef::Array(element) => format!("{}[]", element.simple_name()),
            TypeRef::Void => "void".to_string(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    /// Replace type parameters using `map`, leaving unknown parameters untouched.
    pub fn substitute(&self, map: &HashMap<Arc<str>, TypeRef>) -> TypeRef {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            TypeRef::TypeParameter(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Named(named) => TypeRef::Named(NamedType {
                identity: named.identity.clone(),
                args: named.args.iter().map(|arg| arg.substitute(map)).collect(),
            }),
            TypeRef::External { name, args } => TypeRef::External {
                name: name.clone(),
                args: args.iter().map(|arg| arg.substitute(map)).collect(),
            },
            TypeRef::Array(element) => TypeRef::Array(Box::new(element.substitute(map))),
            TypeRef::Predefined(_) | TypeRef::Void => self.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, args) = match self {
            TypeRef::Named(named) => (named.identity.display_name(), &named.args),
            TypeRef::External { name, args } => (name.to_string(), args),
            TypeRef::TypeParameter(name) | TypeRef::Predefined(name) => return f.write_str(name),
            TypeRef::Array(element) => return write!(f, "{element}[]"),
            TypeRef::Void => return f.write_str("void"),
        };
        f.write_str(&head)?;
        if !args.is_empty() {
            let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
            write!(f, "<{}>", rendered.join(", "))?;
        }
        Ok(())
    }
}

/// A type as written in source, before binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Path(Vec<NameSegment>),
    Predefined(String),
    Array(Box<TypeName>),
    Void,
    /// `var`
    Implicit,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSegment {
    pub name: String,
    pub args: Vec<TypeName>,
}

impl TypeName {
    pub fn simple(name: &str) -> Self {
        TypeName::Path(vec![NameSegment {
            name: name.to_string(),
            args: Vec::new(),
        }])
    }
}

/// Lexical scope a declaration's type names are bound in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclScope {
    pub namespace: String,
    pub usings: Arc<Vec<String>>,
    /// Metadata names of enclosing types, outermost first.
    pub enclosing_types: Vec<String>,
    pub type_params: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    None,
    Ref,
    Out,
    In,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeName,
    pub ref_kind: RefKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Property {
        ty: TypeName,
        writable: bool,
    },
    Field {
        ty: TypeName,
    },
    Method {
        returns: TypeName,
        type_params: Vec<String>,
        params: Vec<ParamDecl>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    pub name: String,
    pub kind: MemberKind,
    pub is_public: bool,
    pub is_static: bool,
    /// Raw `///` comment text preceding the member.
    pub documentation: Option<String>,
    /// `None` for members that only exist in metadata.
    pub declaring: Option<SyntaxRef>,
    pub scope: Arc<DeclScope>,
}

impl MemberDecl {
    pub fn is_method(&self) -> bool {
        matches!(self.kind, MemberKind::Method { .. })
    }
}

/// Every declaration of a type across the compilation, partial parts merged.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub identity: TypeIdentity,
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    pub type_params: Vec<String>,
    pub bases: Vec<(TypeName, Arc<DeclScope>)>,
    pub members: Vec<MemberDecl>,
    /// Empty for metadata types.
    pub declaring: Vec<SyntaxRef>,
    pub documentation: Option<String>,
}

impl TypeDecl {
    pub fn is_metadata(&self) -> bool {
        self.declaring.is_empty()
    }

    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MemberDecl> + 'a {
        self.members.iter().filter(move |member| member.name == name)
    }

    /// Self-referencing constructed form, type parameters as arguments.
    pub fn as_type(&self) -> NamedType {
        NamedType {
            identity: self.identity.clone(),
            args: self
                .type_params
                .iter()
                .map(|param| TypeRef::TypeParameter(Arc::from(param.as_str())))
                .collect(),
        }
    }

    pub(crate) fn merge(&mut self, other: TypeDecl) {
        self.bases.extend(other.bases);
        self.members.extend(other.members);
        self.declaring.extend(other.declaring);
        if self.documentation.is_none() {
            self.documentation = other.documentation;
        }
    }
}

/// Map from a declaration's type parameters to the arguments of a constructed type.
pub fn substitution_map(type_params: &[String], args: &[TypeRef]) -> HashMap<Arc<str>, TypeRef> {
    type_params
        .iter()
        .zip(args)
        .map(|(param, arg)| (Arc::from(param.as_str()), arg.clone()))
        .collect()
}
