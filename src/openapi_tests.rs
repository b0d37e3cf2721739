use crate::schemas::ApiDoc;
use utoipa::openapi::{PathItemType, RefOr, schema::Schema};
use utoipa::OpenApi;

fn object_properties(name: &str) -> Vec<String> {
    let openapi = ApiDoc::openapi();
    let components = openapi.components.expect("components are generated");
    match components.schemas.get(name) {
        Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
        _ => panic!("{} should be an object schema", name),
    }
}

#[test]
fn test_openapi_schema_generation() {
    let openapi = ApiDoc::openapi();

    let components = openapi.components.as_ref().unwrap();
    for name in [
        "ErrorResponse",
        "HealthResponse",
        "UserResponse",
        "StreamResponse",
        "MovieResponse",
        "MovieDetailResponse",
        "ReviewResponse",
    ] {
        assert!(components.schemas.contains_key(name), "missing schema {}", name);
    }

    assert!(serde_json::to_string(&openapi).is_ok());
}

#[test]
fn test_error_response_schema_structure() {
    let properties = object_properties("ErrorResponse");
    for field in ["error", "code", "success"] {
        assert!(properties.iter().any(|p| p == field));
    }
}

#[test]
fn test_user_response_hides_password() {
    let properties = object_properties("UserResponse");
    assert_eq!(properties, vec!["email".to_string(), "name".to_string()]);
}

#[test]
fn test_review_response_has_author_and_movie() {
    let properties = object_properties("ReviewResponse");
    for field in ["rating", "user", "movie", "created", "update"] {
        assert!(properties.iter().any(|p| p == field), "missing {}", field);
    }
}

#[test]
fn test_openapi_paths_cover_routes() {
    let openapi = ApiDoc::openapi();
    let paths = &openapi.paths.paths;

    let expected = [
        ("/health", PathItemType::Get),
        ("/api/user/create", PathItemType::Post),
        ("/api/user/token", PathItemType::Post),
        ("/api/user/me", PathItemType::Get),
        ("/api/movie/streams", PathItemType::Post),
        ("/api/movie/streams/{stream_id}", PathItemType::Delete),
        ("/api/movie/movies", PathItemType::Get),
        ("/api/movie/movies/{movie_id}", PathItemType::Patch),
        ("/api/movie/movies/{movie_id}/upload-image", PathItemType::Post),
        ("/api/movie/{movie_id}/review-create", PathItemType::Post),
        ("/api/movie/review/{review_id}", PathItemType::Put),
    ];
    for (path, method) in expected {
        let item = paths.get(path).unwrap_or_else(|| panic!("missing path {}", path));
        assert!(item.operations.contains_key(&method), "missing operation on {}", path);
    }
}

#[test]
fn test_token_auth_scheme_registered() {
    let openapi = ApiDoc::openapi();
    let openapi_json = serde_json::to_string(&openapi).unwrap();

    assert!(openapi_json.contains("token_auth"));
    assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
}
