use std::collections::HashMap;

use async_graphql::dynamic::ResolverContext;
use async_graphql::SelectionField;

// Bounds worst-case copying of adversarially deep selections.
const MAX_DEPTH: u32 = 32;

/// An owned snapshot of the selection set beneath the current field.
///
/// Built eagerly at resolver dispatch, never borrowing engine state, so
/// resolvers can answer "is field X requested?" at any point of their
/// execution, including after awaiting.
#[derive(Debug, Clone)]
pub struct Lookahead {
    exists: bool,
    children: HashMap<String, Lookahead>,
}

impl Lookahead {
    /// Whether the field this graph points at appears in the query.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Descends into a subfield; missing names return an empty graph.
    pub fn field(&self, name: &str) -> Lookahead {
        self.children.get(name).cloned().unwrap_or_else(Lookahead::empty)
    }

    fn empty() -> Self {
        Lookahead {
            exists: false,
            children: HashMap::new(),
        }
    }
}

pub(crate) fn snapshot(ctx: &ResolverContext<'_>) -> Lookahead {
    build_from_selection(ctx.ctx.field().selection_set(), 0)
}

fn build_from_selection<'a>(fields: impl Iterator<Item = SelectionField<'a>>, depth: u32) -> Lookahead {
    if depth >= MAX_DEPTH {
        return Lookahead::empty();
    }
    let mut children = HashMap::new();
    for field in fields {
        let child = build_from_selection(field.selection_set(), depth + 1);
        children.insert(
            field.name().to_owned(),
            Lookahead {
                exists: true,
                children: child.children,
            },
        );
    }
    Lookahead {
        exists: true,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_read_as_empty() {
        let graph = Lookahead {
            exists: true,
            children: HashMap::from([(
                "a".to_owned(),
                Lookahead {
                    exists: true,
                    children: HashMap::new(),
                },
            )]),
        };
        assert!(graph.field("a").exists());
        assert!(!graph.field("b").exists());
        assert!(!graph.field("b").field("c").exists());
    }
}
