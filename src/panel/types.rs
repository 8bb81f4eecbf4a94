use serde::Deserialize;
use std::collections::HashMap;

/// `{ "attributes": { ... } }` envelope on single-object responses
#[derive(Debug, Deserialize)]
pub struct ApiObject<T> {
    pub attributes: T,
}

/// `{ "data": [ { "attributes": { ... } }, ... ] }` envelope on lists
#[derive(Debug, Deserialize)]
pub struct ApiList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<ApiObject<T>>,
}

/// `{ "errors": [ { "detail": ... } ] }` envelope on failures
#[derive(Debug, Deserialize)]
pub struct ApiErrors {
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserAttributes {
    pub id: u64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerAttributes {
    pub id: u64,
    pub name: String,
    pub user: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EggAttributes {
    pub startup: Option<String>,
    #[serde(default)]
    pub docker_images: HashMap<String, String>,
}

/// A user as reported by the panel's list endpoint
#[derive(Debug, Clone)]
pub struct PanelUser {
    pub id: u64,
    pub username: String,
    pub email: String,
}
