use super::context::AnalysisContext;
use crate::workspace::compilation::MemberRef;
use crate::workspace::symbols::{NamedType, TypeRef};
use crate::workspace::syntax::SyntaxRef;

/// Where a handler's `SupportedRequestTypes` implementation lives, which decides how its request
/// types can be discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportedTypesShape {
    /// Declared in the document being analyzed; its body is scanned.
    SameTree { declaration: SyntaxRef },
    /// Declared in another document, on a class whose direct base is a single-request handler.
    HandcraftedBase { base: NamedType },
    /// Declared in another document in a way that cannot be followed, e.g. a partial class.
    Unsupported,
    /// Declared only in metadata, by one of the generic single-request handler bases.
    MetadataBase { base: NamedType },
    /// Declared only in metadata by something else.
    Unrecognized,
}

impl SupportedTypesShape {
    pub fn classify(context: &AnalysisContext, class: &NamedType, member: Option<&MemberRef>) -> Self {
        let framework = context.framework();
        let Some(member) = member else {
            return SupportedTypesShape::Unsupported;
        };
        match member.declaring() {
            Some(declaration) if declaration.document == context.document().id => {
                SupportedTypesShape::SameTree { declaration }
            }
            Some(_) => match context.compilation().base_type(class) {
                Some(TypeRef::Named(base)) if framework.is_single_handler_shape(&base.identity) => {
                    SupportedTypesShape::HandcraftedBase { base }
                }
                _ => SupportedTypesShape::Unsupported,
            },
            None if framework.is_single_handler_shape(&member.containing.identity) => {
                SupportedTypesShape::MetadataBase {
                    base: member.containing.clone(),
                }
            }
            None => SupportedTypesShape::Unrecognized,
        }
    }

    /// Name of the method that processes requests, when the shape implies one.
    pub fn execute_method_name(&self) -> Option<&'static str> {
        match self {
            SupportedTypesShape::MetadataBase { .. } => Some("Process"),
            SupportedTypesShape::Unrecognized => None,
            _ => Some("Execute"),
        }
    }

    /// Request candidates carried by the base type's first type argument.
    pub fn base_request_argument(&self) -> Option<&TypeRef> {
        match self {
            SupportedTypesShape::HandcraftedBase { base } | SupportedTypesShape::MetadataBase { base } => {
                base.args.first()
            }
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SupportedTypesShape::SameTree { .. } => "same-tree",
            SupportedTypesShape::HandcraftedBase { .. } => "handcrafted-base",
            SupportedTypesShape::Unsupported => "unsupported",
            SupportedTypesShape::MetadataBase { .. } => "metadata-base",
            SupportedTypesShape::Unrecognized => "unrecognized",
        }
    }
}
