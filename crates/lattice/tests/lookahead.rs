use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lattice::{Annotation, DataField, Resolved, ResolverField, Schema, TypeDeclaration, TypeDefinition};
use serde_json::json;

struct Inner;

impl TypeDefinition for Inner {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Inner")
            .data_field(DataField::reader::<Inner, _, _>("b", Annotation::string(), |_| "foo"))
    }
}

struct Outer;

impl TypeDefinition for Outer {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Outer")
            .data_field(DataField::reader::<Outer, _, _>("a", Annotation::int(), |_| 1i64))
            .resolver(ResolverField::new("sub", Annotation::class::<Inner>(), |_req| {
                Ok(Resolved::object(Inner))
            }))
    }
}

#[derive(Default)]
struct Seen {
    requests_a: AtomicBool,
    requests_sub_b: AtomicBool,
}

struct Query;

impl TypeDefinition for Query {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Query").resolver(
            ResolverField::new("obj", Annotation::class::<Outer>(), |req| {
                let context = req.context().expect("declared with_context");
                if let Some(seen) = req.state::<Arc<Seen>>() {
                    seen.requests_a
                        .store(context.field("a").exists(), Ordering::SeqCst);
                    seen.requests_sub_b.store(
                        context.look_ahead().field("sub").field("b").exists(),
                        Ordering::SeqCst,
                    );
                }
                Ok(Resolved::object(Outer))
            })
            .with_context(),
        )
    }
}

fn schema() -> Schema {
    Schema::builder().query::<Query>().finish().expect("schema builds")
}

#[tokio::test]
async fn lookahead_sees_direct_subfields() {
    let seen = Arc::new(Seen::default());
    let result = schema()
        .execute(lattice::Request::new("{ obj { a } }").state(seen.clone()))
        .await
        .into_response()
        .unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"obj": {"a": 1}}));
    assert!(seen.requests_a.load(Ordering::SeqCst));
    assert!(!seen.requests_sub_b.load(Ordering::SeqCst));
}

#[tokio::test]
async fn lookahead_descends_into_nested_selections() {
    let seen = Arc::new(Seen::default());
    let result = schema()
        .execute(lattice::Request::new("{ obj { sub { b } } }").state(seen.clone()))
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"obj": {"sub": {"b": "foo"}}}));
    assert!(!seen.requests_a.load(Ordering::SeqCst));
    assert!(seen.requests_sub_b.load(Ordering::SeqCst));
}
