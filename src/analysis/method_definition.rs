use super::docs::DocComment;
use super::framework::FrameworkReference;
use super::types::{Member, MemberedType, ResponseType};
use crate::error::{Error, Result};
use crate::workspace::semantic::{MethodSymbol, ParameterSymbol};
use crate::workspace::symbols::{RefKind, TypeRef};
use serde::Serialize;
use std::sync::Arc;

const PRIMITIVE_TYPES: &[&str] = &[
    "bool", "sbyte", "short", "int", "long", "byte", "ushort", "uint", "ulong", "float", "double",
    "char", "string", "object",
];

/// A request/response pair synthesized from an ordinary method.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerMethodDefinition {
    pub method_name: String,
    pub request: MemberedType,
    pub response: Arc<ResponseType>,
}

impl HandlerMethodDefinition {
    /// By-value parameters become request members. The return value (unwrapped from `Task<T>`)
    /// followed by `out` parameters become response members; with neither, the response is the
    /// framework's void response.
    pub fn from_method(method: &MethodSymbol, framework: &FrameworkReference) -> Self {
        let doc = DocComment::parse(method.member.member().documentation.as_deref());
        let name = method.name().to_string();

        let request = MemberedType {
            name: format!("{name}Request"),
            namespace: String::new(),
            base_class_name: framework.request_base_class_fqn(),
            members: method
                .parameters
                .iter()
                .filter(|parameter| parameter.ref_kind == RefKind::None)
                .map(|parameter| parameter_member(parameter, &doc))
                .collect(),
            documentation: doc.summary.clone(),
        };

        let mut response_members = Vec::new();
        let returns = unwrap_task(&method.returns);
        if !returns.is_void() {
            let member_name = match &returns {
                TypeRef::Predefined(predefined) if PRIMITIVE_TYPES.contains(&&**predefined) => {
                    "Result".to_string()
                }
                other => other.simple_name(),
            };
            response_members.push(Member::new(member_name, returns, doc.returns.clone(), true));
        }
        response_members.extend(
            method
                .parameters
                .iter()
                .filter(|parameter| parameter.ref_kind == RefKind::Out)
                .map(|parameter| parameter_member(parameter, &doc)),
        );

        let response = if response_members.is_empty() {
            framework.void_response().clone()
        } else {
            Arc::new(ResponseType::new(
                None,
                MemberedType {
                    name: format!("{name}Response"),
                    namespace: String::new(),
                    base_class_name: framework.response_base_class_fqn(),
                    members: response_members,
                    documentation: format!("The response for <see cref=\"{}\" />.", request.name),
                },
            ))
        };

        Self {
            method_name: name,
            request,
            response,
        }
    }

    /// Place the synthesized types in `namespace`. The shared void response is left alone.
    pub fn set_containing_namespace(&mut self, namespace: &str) -> Result<()> {
        if namespace.trim().is_empty() {
            return Err(Error::InvalidArgument("namespace must not be blank".to_string()));
        }
        self.request.namespace = namespace.to_string();
        if !self.response.is_void {
            let mut response = (*self.response).clone();
            response.shape.namespace = namespace.to_string();
            self.response = Arc::new(response);
        }
        Ok(())
    }
}

fn parameter_member(parameter: &ParameterSymbol, doc: &DocComment) -> Member {
    Member::new(
        parameter.name.clone(),
        unwrap_task(&parameter.ty),
        doc.parameter(&parameter.name),
        true,
    )
}

/// `Task<T>` and `ValueTask<T>` become `T`. A bare `Task` carries no value.
fn unwrap_task(ty: &TypeRef) -> TypeRef {
    let name = ty.simple_name();
    match ty.args() {
        [inner] if name == "Task" || name == "ValueTask" => inner.clone(),
        [] if name == "Task" || name == "ValueTask" => TypeRef::Void,
        _ => ty.clone(),
    }
}
