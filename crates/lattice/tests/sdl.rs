use lattice::{
    Annotation, Argument, ClassRef, DataField, InputField, Resolved, ResolverField, Schema, TypeDeclaration,
    TypeDefinition,
};

struct Post;

impl TypeDefinition for Post {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Post")
            .description("A published post.")
            .data_field(DataField::reader::<Post, _, _>("title", Annotation::string(), |_| "t"))
            .data_field(
                DataField::reader::<Post, _, _>("slug", Annotation::string(), |_| "s").deprecated("use title"),
            )
            .data_field(DataField::reader::<Post, _, _>(
                "_internal",
                Annotation::string(),
                |_| "hidden by name",
            ))
            .data_field(DataField::reader::<Post, _, _>(
                "cache",
                Annotation::string().hidden(),
                |_| "hidden by marker",
            ))
            .resolver(ResolverField::new("author", Annotation::class::<Author>(), |_req| {
                Ok(Resolved::object(Author))
            }))
    }
}

struct Author;

impl TypeDefinition for Author {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Author")
            .data_field(DataField::reader::<Author, _, _>("name", Annotation::string(), |_| "a"))
            // Cyclic reference back to Post; resolved lazily by name.
            .resolver(ResolverField::new(
                "posts",
                Annotation::list(Annotation::class::<Post>()),
                |_req| Ok(Resolved::List(Vec::new())),
            ))
    }
}

struct PostFilter;

impl TypeDefinition for PostFilter {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::input("PostFilter")
            .input_field(InputField::new("text", Annotation::string().described("full-text needle")))
            .input_field(InputField::new("limit", Annotation::int()).default(10))
            .constructor(|values| {
                let _text: String = values.get("text")?;
                let _limit: i64 = values.get("limit")?;
                Ok(PostFilter)
            })
    }
}

struct Query;

impl TypeDefinition for Query {
    fn declaration() -> TypeDeclaration {
        TypeDeclaration::object("Query")
            .resolver(
                ResolverField::new(
                    "posts",
                    Annotation::list(Annotation::class::<Post>()),
                    |_req| Ok(Resolved::List(Vec::new())),
                )
                .argument(Argument::new("filter", Annotation::class::<PostFilter>()).described("which posts"))
                .described("All posts matching a filter."),
            )
            .resolver(ResolverField::new(
                "featured",
                Annotation::union([ClassRef::of::<Post>(), ClassRef::of::<Author>()]),
                |_req| Ok(Resolved::object(Post)),
            ))
    }
}

fn schema() -> Schema {
    Schema::builder().query::<Query>().finish().expect("schema builds")
}

#[test]
fn sdl_is_deterministic_across_constructions() {
    let first = schema();
    let second = schema();
    assert_eq!(first.sdl(), second.sdl());
}

#[test]
fn sdl_contains_declared_types_and_wrappers() {
    let schema = schema();
    let sdl = schema.sdl();
    assert!(sdl.contains("type Post"), "{sdl}");
    assert!(sdl.contains("title: String!"), "{sdl}");
    assert!(sdl.contains("input PostFilter"), "{sdl}");
    assert!(sdl.contains("posts: [Post!]!"), "{sdl}");
    assert!(sdl.contains("A published post."), "{sdl}");
}

#[test]
fn hidden_and_underscored_fields_are_excluded() {
    let schema = schema();
    let sdl = schema.sdl();
    assert!(!sdl.contains("_internal"), "{sdl}");
    assert!(!sdl.contains("cache"), "{sdl}");
}

#[test]
fn deprecations_and_defaults_render() {
    let schema = schema();
    let sdl = schema.sdl();
    assert!(sdl.contains("@deprecated"), "{sdl}");
    assert!(sdl.contains("limit: Int = 10"), "{sdl}");
}

#[test]
fn anonymous_unions_concatenate_member_names() {
    let schema = schema();
    let sdl = schema.sdl();
    assert!(sdl.contains("union PostAuthor"), "{sdl}");
    assert!(sdl.contains("featured: PostAuthor!"), "{sdl}");
}
