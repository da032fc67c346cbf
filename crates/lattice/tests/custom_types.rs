use lattice::{
    Annotation, Argument, FieldError, Resolved, ResolverField, Schema, TypeDeclaration, TypeDefinition,
};
use serde_json::json;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Green,
    Blue,
}

impl TypeDefinition for Color {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::enumeration("Color")
            .value("RED")
            .value("GREEN")
            .value("BLUE")
            .bind_enum(
                |color: &Color| match color {
                    Color::Red => "RED",
                    Color::Green => "GREEN",
                    Color::Blue => "BLUE",
                },
                |name| match name {
                    "RED" => Some(Color::Red),
                    "GREEN" => Some(Color::Green),
                    "BLUE" => Some(Color::Blue),
                    _ => None,
                },
            )
    }
}

/// Seconds since the epoch, carried as a string over the wire.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Epoch(i64);

impl TypeDefinition for Epoch {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::scalar("Epoch")
            .description("Seconds since the Unix epoch.")
            .bind_scalar(
                |epoch: &Epoch| Ok(json!(epoch.0.to_string())),
                |value| {
                    value
                        .as_str()
                        .and_then(|s| s.parse().ok())
                        .map(Epoch)
                        .ok_or_else(|| FieldError::new("Epoch expects a stringified integer"))
                },
            )
    }
}

struct Query;

impl TypeDefinition for Query {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Query")
            .resolver(
                ResolverField::new("complement", Annotation::class::<Color>(), |req| {
                    let color = req.input::<Color>("of")?;
                    Ok(Resolved::object(match *color {
                        Color::Red => Color::Green,
                        Color::Green => Color::Red,
                        Color::Blue => Color::Blue,
                    }))
                })
                .argument(Argument::new("of", Annotation::class::<Color>())),
            )
            .resolver(
                ResolverField::new("later", Annotation::class::<Epoch>(), |req| {
                    let epoch = req.input::<Epoch>("after")?;
                    Ok(Resolved::object(Epoch(epoch.0 + 60)))
                })
                .argument(Argument::new("after", Annotation::class::<Epoch>())),
            )
    }
}

fn schema() -> Schema {
    Schema::builder().query::<Query>().finish().expect("schema builds")
}

#[tokio::test]
async fn enums_round_trip_through_their_binding() {
    let schema = schema();

    let result = schema
        .execute("{ complement(of: RED) }")
        .await
        .into_response()
        .unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"complement": "GREEN"}));
}

#[tokio::test]
async fn invalid_enum_values_fail_validation() {
    let result = schema()
        .execute("{ complement(of: MAGENTA) }")
        .await
        .into_response()
        .unwrap();
    assert_eq!(result.data, serde_json::Value::Null);
    assert!(!result.errors.is_empty());
}

#[tokio::test]
async fn custom_scalars_serialize_and_parse() {
    let result = schema()
        .execute(r#"{ later(after: "100") }"#)
        .await
        .into_response()
        .unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.data, json!({"later": "160"}));
}

#[tokio::test]
async fn scalar_parse_failures_are_coercion_errors() {
    let result = schema()
        .execute(r#"{ later(after: "not a number") }"#)
        .await
        .into_response()
        .unwrap();
    assert!(!result.errors.is_empty());
}

#[test]
fn enum_and_scalar_declarations_render_in_sdl() {
    let schema = schema();
    let sdl = schema.sdl();
    assert!(sdl.contains("enum Color"), "{sdl}");
    assert!(sdl.contains("RED"), "{sdl}");
    assert!(sdl.contains("scalar Epoch"), "{sdl}");
}
