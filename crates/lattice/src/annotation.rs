use crate::declare::ClassRef;
use crate::error::SchemaError;
use crate::type_spec::{TypeSpec, SCALAR_BOOLEAN, SCALAR_FLOAT, SCALAR_ID, SCALAR_INT, SCALAR_STRING};
use crate::value::Id;
use crate::TypeDefinition;

/// A host-neutral description of one GraphQL type position.
///
/// Annotations are small trees built from the constructors below; the
/// analyzer normalizes them into a canonical [`TypeSpec`] once, when the
/// owning declaration is compiled.
#[derive(Clone)]
pub struct Annotation {
    pub(crate) node: AnnotationNode,
}

#[derive(Clone)]
pub(crate) enum AnnotationNode {
    Scalar(&'static str),
    Class(ClassRef),
    Optional(Box<Annotation>),
    List(Box<Annotation>),
    Stream(Box<Annotation>),
    Union(UnionAnnotation),
    Described {
        description: String,
        inner: Box<Annotation>,
    },
    Hidden(Box<Annotation>),
}

#[derive(Clone)]
pub(crate) struct UnionAnnotation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub members: Vec<ClassRef>,
}

impl Annotation {
    pub fn string() -> Self {
        Self::scalar(SCALAR_STRING)
    }

    pub fn int() -> Self {
        Self::scalar(SCALAR_INT)
    }

    pub fn float() -> Self {
        Self::scalar(SCALAR_FLOAT)
    }

    pub fn boolean() -> Self {
        Self::scalar(SCALAR_BOOLEAN)
    }

    pub fn id() -> Self {
        Self::scalar(SCALAR_ID)
    }

    fn scalar(name: &'static str) -> Self {
        Annotation {
            node: AnnotationNode::Scalar(name),
        }
    }

    /// Annotation sugar driven by the [`Shape`] impls for host types.
    pub fn of<T: Shape>() -> Self {
        T::annotation()
    }

    /// References a declared class (object, input, enum or custom scalar).
    pub fn class<T: TypeDefinition>() -> Self {
        Annotation {
            node: AnnotationNode::Class(ClassRef::of::<T>()),
        }
    }

    /// References a declared interface, usually a trait object type.
    pub fn interface<I: TypeDefinition + ?Sized + 'static>() -> Self {
        Annotation {
            node: AnnotationNode::Class(ClassRef::interface::<I>()),
        }
    }

    /// Marks this position nullable.
    pub fn optional(inner: Annotation) -> Self {
        Annotation {
            node: AnnotationNode::Optional(Box::new(inner)),
        }
    }

    pub fn list(element: Annotation) -> Self {
        Annotation {
            node: AnnotationNode::List(Box::new(element)),
        }
    }

    /// An async stream of `element` items; only legal as a subscription
    /// field's return annotation.
    pub fn stream(element: Annotation) -> Self {
        Annotation {
            node: AnnotationNode::Stream(Box::new(element)),
        }
    }

    /// An anonymous union; the GraphQL name is the concatenation of the
    /// member names in declaration order.
    pub fn union(members: impl IntoIterator<Item = ClassRef>) -> Self {
        Annotation {
            node: AnnotationNode::Union(UnionAnnotation {
                name: None,
                description: None,
                members: members.into_iter().collect(),
            }),
        }
    }

    /// A union registered under an explicit name.
    pub fn named_union(name: impl Into<String>, members: impl IntoIterator<Item = ClassRef>) -> Self {
        Annotation {
            node: AnnotationNode::Union(UnionAnnotation {
                name: Some(name.into()),
                description: None,
                members: members.into_iter().collect(),
            }),
        }
    }

    /// Attaches a description to the enclosing field without a resolver.
    pub fn described(self, description: impl Into<String>) -> Self {
        Annotation {
            node: AnnotationNode::Described {
                description: description.into(),
                inner: Box::new(self),
            },
        }
    }

    /// Attaches a description to a union annotation (no-op otherwise).
    pub fn union_described(mut self, description: impl Into<String>) -> Self {
        if let AnnotationNode::Union(union) = &mut self.node {
            union.description = Some(description.into());
        }
        self
    }

    /// Excludes the enclosing data field from the schema while keeping it in
    /// the host model.
    pub fn hidden(self) -> Self {
        Annotation {
            node: AnnotationNode::Hidden(Box::new(self)),
        }
    }
}

/// Host types with a canonical annotation.
pub trait Shape {
    fn annotation() -> Annotation;
}

impl Shape for String {
    fn annotation() -> Annotation {
        Annotation::string()
    }
}

impl Shape for i64 {
    fn annotation() -> Annotation {
        Annotation::int()
    }
}

impl Shape for i32 {
    fn annotation() -> Annotation {
        Annotation::int()
    }
}

impl Shape for f64 {
    fn annotation() -> Annotation {
        Annotation::float()
    }
}

impl Shape for bool {
    fn annotation() -> Annotation {
        Annotation::boolean()
    }
}

impl Shape for Id {
    fn annotation() -> Annotation {
        Annotation::id()
    }
}

impl<T: Shape> Shape for Option<T> {
    fn annotation() -> Annotation {
        Annotation::optional(T::annotation())
    }
}

impl<T: Shape> Shape for Vec<T> {
    fn annotation() -> Annotation {
        Annotation::list(T::annotation())
    }
}

/// Which schema position an annotation is being analyzed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Output,
    Input,
    SubscriptionOutput,
}

/// The analyzer's view of one annotation.
#[derive(Debug)]
pub(crate) struct Analyzed {
    pub type_spec: TypeSpec,
    pub refs: Vec<ClassRef>,
    pub description: Option<String>,
    pub hidden: bool,
    pub is_stream: bool,
}

/// Normalizes an annotation into a `TypeSpec` plus the set of class
/// references it mentions. Shapes are recognized in a fixed order, first
/// match wins; see the declaration docs for the catalogue.
pub(crate) fn analyze(annotation: &Annotation, position: Position, force_nullable: bool) -> Result<Analyzed, SchemaError> {
    // Hidden and stream markers are only meaningful at the outermost
    // position; a described wrapper may sit above either.
    let mut description = None;
    let mut node = &annotation.node;
    if let AnnotationNode::Described { description: d, inner } = node {
        description = Some(d.clone());
        node = &inner.node;
    }
    if let AnnotationNode::Hidden(_) = node {
        return Ok(Analyzed {
            type_spec: TypeSpec::Named {
                name: SCALAR_STRING.to_owned(),
                nullable: true,
            },
            refs: Vec::new(),
            description,
            hidden: true,
            is_stream: false,
        });
    }

    let mut is_stream = false;
    let mut outer_nullable = force_nullable;
    if let AnnotationNode::Optional(inner) = node {
        outer_nullable = true;
        node = &inner.node;
    }
    if let AnnotationNode::Stream(inner) = node {
        if position != Position::SubscriptionOutput {
            return Err(SchemaError::StreamOutsideSubscription);
        }
        is_stream = true;
        node = &inner.node;
        if let AnnotationNode::Optional(inner) = node {
            outer_nullable = true;
            node = &inner.node;
        }
    }

    let mut refs = Vec::new();
    let mut type_spec = analyze_node(node, position, &mut refs)?;
    if outer_nullable {
        type_spec.set_nullable(true);
    }

    Ok(Analyzed {
        type_spec,
        refs,
        description,
        hidden: false,
        is_stream,
    })
}

fn analyze_node(node: &AnnotationNode, position: Position, refs: &mut Vec<ClassRef>) -> Result<TypeSpec, SchemaError> {
    match node {
        AnnotationNode::Hidden(_) => Err(SchemaError::HiddenNotAllowed),
        AnnotationNode::Stream(_) => Err(SchemaError::StreamOutsideSubscription),
        AnnotationNode::Described { inner, .. } => analyze_node(&inner.node, position, refs),
        AnnotationNode::Optional(inner) => {
            let mut spec = analyze_node(&inner.node, position, refs)?;
            spec.set_nullable(true);
            Ok(spec)
        }
        AnnotationNode::List(element) => {
            let element = analyze_node(&element.node, position, refs)?;
            Ok(TypeSpec::List {
                element: Box::new(element),
                nullable: false,
            })
        }
        AnnotationNode::Union(union) => {
            if position == Position::Input {
                return Err(SchemaError::UnionInInput);
            }
            if union.members.is_empty() {
                return Err(SchemaError::EmptyUnion);
            }
            let members: Vec<String> = union.members.iter().map(|member| member.name()).collect();
            refs.extend(union.members.iter().copied());
            let name = union.name.clone().unwrap_or_else(|| members.concat());
            Ok(TypeSpec::Union {
                name,
                members,
                description: union.description.clone(),
                nullable: false,
            })
        }
        AnnotationNode::Scalar(name) => Ok(TypeSpec::Named {
            name: (*name).to_owned(),
            nullable: false,
        }),
        AnnotationNode::Class(class) => {
            refs.push(*class);
            Ok(TypeSpec::Named {
                name: class.name(),
                nullable: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_annotations_are_non_null_by_default() {
        let analyzed = analyze(&Annotation::string(), Position::Output, false).unwrap();
        assert_eq!(analyzed.type_spec.render(), "String!");
        assert!(analyzed.refs.is_empty());
        assert!(!analyzed.hidden);
    }

    #[test]
    fn optional_wrapper_sets_outer_nullability() {
        let analyzed = analyze(&Annotation::of::<Option<Vec<i64>>>(), Position::Output, false).unwrap();
        assert_eq!(analyzed.type_spec.render(), "[Int!]");
    }

    #[test]
    fn input_defaults_imply_nullability() {
        let analyzed = analyze(&Annotation::string(), Position::Input, true).unwrap();
        assert_eq!(analyzed.type_spec.render(), "String");
    }

    #[test]
    fn hidden_marker_yields_sentinel() {
        let analyzed = analyze(&Annotation::string().hidden(), Position::Output, false).unwrap();
        assert!(analyzed.hidden);
    }

    #[test]
    fn stream_rejected_outside_subscription_position() {
        let err = analyze(&Annotation::stream(Annotation::int()), Position::Output, false).unwrap_err();
        assert!(matches!(err, SchemaError::StreamOutsideSubscription));
    }

    #[test]
    fn stream_unwraps_in_subscription_position() {
        let analyzed = analyze(&Annotation::stream(Annotation::int()), Position::SubscriptionOutput, false).unwrap();
        assert!(analyzed.is_stream);
        assert_eq!(analyzed.type_spec.render(), "Int!");
    }

    #[test]
    fn described_wrapper_extracts_description() {
        let analyzed = analyze(&Annotation::string().described("a greeting"), Position::Output, false).unwrap();
        assert_eq!(analyzed.description.as_deref(), Some("a greeting"));
        assert_eq!(analyzed.type_spec.render(), "String!");
    }
}
