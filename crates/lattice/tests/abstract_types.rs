use lattice::{
    Annotation, Argument, ClassRef, DataField, Resolved, ResolverField, Schema, TypeDeclaration, TypeDefinition,
};
use serde_json::json;

// --- union fixtures -------------------------------------------------------

struct Alpha;

impl TypeDefinition for Alpha {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Alpha")
            .data_field(DataField::reader::<Alpha, _, _>("a", Annotation::int(), |_| 1i64))
    }
}

struct Beta;

impl TypeDefinition for Beta {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Beta")
            .data_field(DataField::reader::<Beta, _, _>("b", Annotation::int(), |_| 2i64))
    }
}

// --- interface fixtures ---------------------------------------------------

trait Letter: Send + Sync {
    fn letter(&self) -> String;
}

impl TypeDefinition for dyn Letter {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::interface("Letter")
            .data_field(DataField::interface_reader::<dyn Letter, _, _>(
                "letter",
                Annotation::string(),
                |parent| parent.letter(),
            ))
            .resolver(ResolverField::new("shout", Annotation::string(), |req| {
                let parent = req.parent_interface::<dyn Letter>()?;
                Ok(format!("{}!", parent.letter()).into())
            }))
    }
}

struct A;

impl Letter for A {
    fn letter(&self) -> String {
        "A".to_owned()
    }
}

fn upcast_a(parent: &A) -> &(dyn Letter + 'static) {
    parent
}

impl TypeDefinition for A {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("A").implements(upcast_a)
    }
}

struct B;

impl Letter for B {
    fn letter(&self) -> String {
        "B".to_owned()
    }
}

fn upcast_b(parent: &B) -> &(dyn Letter + 'static) {
    parent
}

impl TypeDefinition for B {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("B")
            .implements(upcast_b)
            // Overrides the interface's declared resolver.
            .resolver(ResolverField::new("shout", Annotation::string(), |_req| {
                Ok("B!!".into())
            }))
    }
}

// --- roots ----------------------------------------------------------------

struct Query;

impl TypeDefinition for Query {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Query")
            .resolver(
                ResolverField::new(
                    "named",
                    Annotation::named_union("NamedAB", [ClassRef::of::<Alpha>(), ClassRef::of::<Beta>()]),
                    |req| {
                        let which: String = req.arg("type")?;
                        Ok(if which == "Alpha" {
                            Resolved::object(Alpha)
                        } else {
                            Resolved::object(Beta)
                        })
                    },
                )
                .argument(Argument::new("type", Annotation::string())),
            )
            .resolver(
                ResolverField::new("common", Annotation::interface::<dyn Letter>(), |req| {
                    let which: String = req.arg("type")?;
                    Ok(if which == "A" {
                        Resolved::object(A)
                    } else {
                        Resolved::object(B)
                    })
                })
                .argument(Argument::new("type", Annotation::string())),
            )
    }
}

fn schema() -> Schema {
    Schema::builder()
        .query::<Query>()
        .register::<A>()
        .register::<B>()
        .finish()
        .expect("schema builds")
}

#[tokio::test]
async fn union_selection_routes_to_the_concrete_member() {
    let schema = schema();

    let result = schema
        .execute(r#"{ named(type: "Alpha") { ... on Alpha { a } ... on Beta { b } } }"#)
        .await
        .into_response()
        .unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"named": {"a": 1}}));

    let result = schema
        .execute(r#"{ named(type: "Beta") { ... on Alpha { a } ... on Beta { b } } }"#)
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"named": {"b": 2}}));
}

#[tokio::test]
async fn interface_dispatch_reaches_the_implementer() {
    let schema = schema();

    let result = schema
        .execute(r#"{ common(type: "A") { letter } }"#)
        .await
        .into_response()
        .unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"common": {"letter": "A"}}));

    let result = schema
        .execute(r#"{ common(type: "B") { letter } }"#)
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"common": {"letter": "B"}}));
}

#[tokio::test]
async fn interface_resolvers_are_inherited_unless_overridden() {
    let schema = schema();

    let result = schema
        .execute(r#"{ common(type: "A") { shout } }"#)
        .await
        .into_response()
        .unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"common": {"shout": "A!"}}));

    let result = schema
        .execute(r#"{ common(type: "B") { shout } }"#)
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"common": {"shout": "B!!"}}));
}

#[tokio::test]
async fn sdl_declares_implementers_and_union_members() {
    let schema = schema();
    let sdl = schema.sdl();
    assert!(sdl.contains("type A implements Letter"), "{sdl}");
    assert!(sdl.contains("type B implements Letter"), "{sdl}");
    assert!(sdl.contains("union NamedAB"), "{sdl}");
}

#[tokio::test]
async fn typename_reflects_the_concrete_type() {
    let result = schema()
        .execute(r#"{ common(type: "A") { __typename } }"#)
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, json!({"common": {"__typename": "A"}}));
}
