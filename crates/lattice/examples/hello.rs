//! Minimal end-to-end run: declare a schema, print its SDL, execute a query.

use lattice::{Annotation, Argument, ResolverField, Schema, TypeDeclaration, TypeDefinition};

struct Query;

impl TypeDefinition for Query {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Query").resolver(
            ResolverField::new("hello", Annotation::string(), |req| {
                let name: String = req.arg("name")?;
                Ok(format!("Hello, {name}!").into())
            })
            .argument(Argument::new("name", Annotation::string())),
        )
    }
}

#[tokio::main]
async fn main() {
    let schema = Schema::builder().query::<Query>().finish().expect("schema builds");
    println!("{}", schema.sdl());

    let result = schema
        .execute(r#"{ hello(name: "world") }"#)
        .await
        .into_response()
        .expect("queries yield a single result");
    println!("{}", serde_json::to_string_pretty(&result).expect("results serialize"));
}
