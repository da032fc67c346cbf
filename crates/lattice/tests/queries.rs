use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lattice::{
    Annotation, Argument, DataField, Request, Resolved, ResolverField, Schema, TypeDeclaration, TypeDefinition,
};
use serde_json::json;

struct Query;

impl TypeDefinition for Query {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Query")
            .data_field(
                DataField::reader::<Query, _, _>("greeting", Annotation::string(), |_| "Hello world!")
                    .default("Hello world!"),
            )
            .resolver(
                ResolverField::new("hello", Annotation::string(), |req| {
                    let name: String = req.arg("name")?;
                    let title: Option<String> = req.arg("title")?;
                    Ok(match title {
                        Some(title) => format!("Hello {title} {name}!"),
                        None => format!("Hello {name}!"),
                    }
                    .into())
                })
                .argument(Argument::new("name", Annotation::string()))
                .argument(Argument::new("title", Annotation::of::<Option<String>>())),
            )
            .resolver(ResolverField::new_future("eager", Annotation::int(), |_req| async move {
                Ok(Resolved::Int(42))
            }))
            .resolver(ResolverField::new_future(
                "delayed",
                Annotation::int(),
                |_req| async move {
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    Ok(Resolved::Int(7))
                },
            ))
            .resolver(
                ResolverField::new("counted", Annotation::int(), |req| {
                    let counter = req
                        .state::<Arc<AtomicUsize>>()
                        .expect("state is attached for this test");
                    Ok(Resolved::Int(counter.fetch_add(1, Ordering::SeqCst) as i64))
                })
                .with_context(),
            )
    }
}

fn schema() -> Schema {
    Schema::builder().query::<Query>().finish().expect("schema builds")
}

#[tokio::test]
async fn resolves_plain_data_fields_from_defaults() {
    let result = schema()
        .execute("{ greeting }")
        .await
        .into_response()
        .expect("queries return a single result");
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"greeting": "Hello world!"}));
}

#[tokio::test]
async fn resolves_arguments_and_optionals() {
    let schema = schema();

    let result = schema
        .execute(r#"{ hello(name: "Gromit") }"#)
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"hello": "Hello Gromit!"}));

    let result = schema
        .execute(r#"{ hello(name: "Gromit", title: "Mr.") }"#)
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"hello": "Hello Mr. Gromit!"}));
}

#[tokio::test]
async fn future_resolvers_complete_with_and_without_suspending() {
    let schema = schema();

    let result = schema.execute("{ eager }").await.into_response().unwrap();
    assert_eq!(result.data, json!({"eager": 42}));

    let result = schema.execute("{ delayed }").await.into_response().unwrap();
    assert_eq!(result.data, json!({"delayed": 7}));
}

#[tokio::test]
async fn request_state_reaches_context_resolvers() {
    let schema = schema();
    let counter = Arc::new(AtomicUsize::new(0));

    let result = schema
        .execute(Request::new("{ counted }").state(counter.clone()))
        .await
        .into_response()
        .unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"counted": 0}));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pure_resolvers_are_deterministic_across_requests() {
    let schema = schema();
    let first = schema
        .execute(r#"{ hello(name: "Wallace") }"#)
        .await
        .into_response()
        .unwrap();
    let second = schema
        .execute(r#"{ hello(name: "Wallace") }"#)
        .await
        .into_response()
        .unwrap();
    assert_eq!(first.data, second.data);
}

#[tokio::test]
async fn variables_flow_through_engine_validation() {
    let schema = schema();
    let result = schema
        .execute(
            Request::new("query Hello($name: String!) { hello(name: $name) }")
                .variables(json!({"name": "Gromit"})),
        )
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"hello": "Hello Gromit!"}));
}

#[tokio::test]
async fn unknown_fields_are_request_preparation_errors() {
    let result = schema().execute("{ nope }").await.into_response().unwrap();
    assert_eq!(result.data, serde_json::Value::Null);
    assert!(!result.errors.is_empty());
}
