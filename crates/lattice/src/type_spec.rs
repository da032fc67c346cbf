use async_graphql::dynamic::TypeRef;
use async_graphql::Value;

pub(crate) const SCALAR_STRING: &str = "String";
pub(crate) const SCALAR_INT: &str = "Int";
pub(crate) const SCALAR_FLOAT: &str = "Float";
pub(crate) const SCALAR_BOOLEAN: &str = "Boolean";
pub(crate) const SCALAR_ID: &str = "ID";

pub(crate) fn is_builtin_scalar(name: &str) -> bool {
    matches!(name, SCALAR_STRING | SCALAR_INT | SCALAR_FLOAT | SCALAR_BOOLEAN | SCALAR_ID)
}

/// Canonical representation of one GraphQL type position.
///
/// The `nullable` flag is the outer nullability of that position: a
/// `List { element: Named { "T", nullable: false }, nullable: true }` is
/// `[T!]`, a nullable list of non-null items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Named {
        name: String,
        nullable: bool,
    },
    List {
        element: Box<TypeSpec>,
        nullable: bool,
    },
    Union {
        name: String,
        members: Vec<String>,
        description: Option<String>,
        nullable: bool,
    },
}

impl TypeSpec {
    pub(crate) fn nullable(&self) -> bool {
        match self {
            TypeSpec::Named { nullable, .. } | TypeSpec::List { nullable, .. } | TypeSpec::Union { nullable, .. } => {
                *nullable
            }
        }
    }

    pub(crate) fn set_nullable(&mut self, value: bool) {
        match self {
            TypeSpec::Named { nullable, .. } | TypeSpec::List { nullable, .. } | TypeSpec::Union { nullable, .. } => {
                *nullable = value;
            }
        }
    }

    /// The named type this position resolves to, unwrapping lists.
    pub(crate) fn innermost_name(&self) -> &str {
        match self {
            TypeSpec::Named { name, .. } | TypeSpec::Union { name, .. } => name,
            TypeSpec::List { element, .. } => element.innermost_name(),
        }
    }

    /// GraphQL notation for this position, e.g. `[T!]!`.
    pub(crate) fn render(&self) -> String {
        let rendered = match self {
            TypeSpec::Named { name, .. } | TypeSpec::Union { name, .. } => name.clone(),
            TypeSpec::List { element, .. } => format!("[{}]", element.render()),
        };
        if self.nullable() {
            rendered
        } else {
            format!("{rendered}!")
        }
    }

    pub(crate) fn to_type_ref(&self) -> TypeRef {
        let inner = match self {
            TypeSpec::Named { name, .. } | TypeSpec::Union { name, .. } => TypeRef::named(name.clone()),
            TypeSpec::List { element, .. } => TypeRef::List(Box::new(element.to_type_ref())),
        };
        if self.nullable() {
            inner
        } else {
            TypeRef::NonNull(Box::new(inner))
        }
    }

    /// Visits this spec and every nested spec, outermost first.
    pub(crate) fn for_each(&self, visit: &mut impl FnMut(&TypeSpec)) {
        visit(self);
        if let TypeSpec::List { element, .. } = self {
            element.for_each(visit);
        }
    }
}

/// One declared GraphQL argument of a resolver field.
#[derive(Debug, Clone)]
pub(crate) struct ArgSpec {
    pub name: String,
    pub type_spec: TypeSpec,
    pub description: Option<String>,
    pub has_default: bool,
    pub default_value: Option<Value>,
}
