/// API index served at `/`
///
/// Lists the mounted endpoints so a client (or a person with curl) can
/// find their way around.

use axum::Json;
use serde::Serialize;

/// One documented endpoint
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub auth: bool,
    pub description: &'static str,
}

/// Index response
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub api_base: &'static str,
    pub admin: &'static str,
    pub authentication: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

const fn endpoint(
    method: &'static str,
    path: &'static str,
    auth: bool,
    description: &'static str,
) -> EndpointInfo {
    EndpointInfo {
        method,
        path,
        auth,
        description,
    }
}

/// GET /
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "Quill blog API",
        version: env!("CARGO_PKG_VERSION"),
        api_base: crate::app::API_PREFIX,
        admin: "/admin",
        authentication: "Authorization: Bearer <token>, or a \"token\" field in the JSON body of POST/PUT/PATCH requests",
        endpoints: vec![
            endpoint("POST", "/register", false, "Create an account"),
            endpoint("POST", "/login", false, "Get a bearer token"),
            endpoint("POST", "/logout", true, "Revoke the current token"),
            endpoint("POST", "/change-password", true, "Change password"),
            endpoint("GET", "/articles", false, "List published articles (?search=&category_id=)"),
            endpoint("GET", "/articles/{id}", false, "Get a published article"),
            endpoint("POST", "/articles", true, "Create an article"),
            endpoint("PUT", "/articles/{id}", true, "Update your article"),
            endpoint("DELETE", "/articles/{id}", true, "Delete your article"),
            endpoint("GET", "/articles/{id}/comments", false, "List comments on an article"),
            endpoint("POST", "/comments", true, "Comment on an article"),
            endpoint("PUT", "/comments/{id}", true, "Edit your comment"),
            endpoint("DELETE", "/comments/{id}", true, "Delete your comment"),
            endpoint("GET", "/categories", false, "List categories"),
            endpoint("GET", "/categories/{id}", false, "Get a category"),
            endpoint("POST", "/categories", true, "Create a category"),
        ],
    })
}
