use crate::workspace::DocumentId;
use crate::workspace::symbols::{NamedType, TypeRef};
use crate::workspace::syntax::{Location, SyntaxRef};
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::shape::SupportedTypesShape;

/// A request or response member.
#[derive(Debug, Clone, Serialize)]
pub struct Member {
    pub name: String,
    /// Display form of the member's type.
    pub type_name: String,
    #[serde(skip)]
    pub ty: TypeRef,
    pub documentation: String,
    pub can_write: bool,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: TypeRef, documentation: impl Into<String>, can_write: bool) -> Self {
        Self {
            name: name.into(),
            type_name: ty.to_string(),
            ty,
            documentation: documentation.into(),
            can_write,
        }
    }
}

/// Descriptive shape shared by request and response types.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemberedType {
    pub name: String,
    pub namespace: String,
    pub base_class_name: String,
    pub members: Vec<Member>,
    pub documentation: String,
}

/// A type deriving from the framework's request base. Equality follows the declaring type.
#[derive(Debug, Clone, Serialize)]
pub struct RequestType {
    #[serde(skip)]
    declaring_type: TypeRef,
    #[serde(flatten)]
    pub shape: MemberedType,
}

impl RequestType {
    pub fn new(declaring_type: TypeRef, shape: MemberedType) -> Self {
        Self {
            declaring_type,
            shape,
        }
    }

    pub fn declaring_type(&self) -> &TypeRef {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.shape.name
    }
}

impl PartialEq for RequestType {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type
    }
}

impl Eq for RequestType {}

impl Hash for RequestType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shape.name)
    }
}

/// A response type. Synthesized responses (including the void response) have no declaring type
/// and only equal themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseType {
    #[serde(skip)]
    declaring_type: Option<TypeRef>,
    #[serde(flatten)]
    pub shape: MemberedType,
    pub is_void: bool,
}

impl ResponseType {
    pub fn new(declaring_type: Option<TypeRef>, shape: MemberedType) -> Self {
        Self {
            declaring_type,
            shape,
            is_void: false,
        }
    }

    pub(crate) fn void(shape: MemberedType) -> Self {
        Self {
            declaring_type: None,
            shape,
            is_void: true,
        }
    }

    pub fn declaring_type(&self) -> Option<&TypeRef> {
        self.declaring_type.as_ref()
    }
}

impl PartialEq for ResponseType {
    fn eq(&self, other: &Self) -> bool {
        match (&self.declaring_type, &other.declaring_type) {
            (Some(a), Some(b)) => a == b,
            _ => std::ptr::eq(self, other),
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shape.name)
    }
}

/// A class implementing one of the framework's handler interfaces.
#[derive(Debug, Clone)]
pub struct HandlerDefinition {
    pub class_type: NamedType,
    pub handler_interface: NamedType,
    pub document: DocumentId,
    pub declaration: Location,
    pub shape: SupportedTypesShape,
    pub declared_supported_request_types: Vec<Arc<RequestType>>,
    /// `None` when the execute method is not in this document.
    pub execute_method: Option<SyntaxRef>,
    /// `None` when the execute method was not resolved, as opposed to resolved with no calls.
    pub request_executions: Option<Vec<RequestExecution>>,
}

impl HandlerDefinition {
    pub fn supports(&self, request: &RequestType) -> bool {
        self.declared_supported_request_types
            .iter()
            .any(|supported| supported.as_ref() == request)
    }
}

/// One call site dispatching a request.
#[derive(Debug, Clone)]
pub struct RequestExecution {
    pub request: Arc<RequestType>,
    pub call_site: Location,
    pub invocation: SyntaxRef,
}

impl fmt::Display for RequestExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> Execute<?>({})", self.call_site, self.request)
    }
}

/// Where a type is used, and by whom.
#[derive(Debug, Clone)]
pub struct TypeLocation<C> {
    pub container: C,
    pub type_symbol: Option<TypeRef>,
    pub location: Location,
    pub syntax: Option<SyntaxRef>,
}

impl<C> fmt::Display for TypeLocation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.location, f)
    }
}
