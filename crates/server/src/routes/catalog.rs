use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{location::Location, sweet::SweetListing};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::catalog::CatalogService;
use ts_rs::TS;

use crate::{DeploymentImpl, error::ApiError, middleware::AuthUser};

#[derive(Debug, Default, Deserialize)]
pub struct SweetsQuery {
    /// Location slug; blank means every location.
    pub location: Option<String>,
}

#[derive(Debug, Serialize, TS)]
pub struct LocationsResponse {
    pub locations: Vec<Location>,
}

#[derive(Debug, Serialize, TS)]
pub struct SweetsResponse {
    pub sweets: Vec<SweetListing>,
}

pub async fn list_locations(
    State(deployment): State<DeploymentImpl>,
    _user: AuthUser,
) -> Result<ResponseJson<LocationsResponse>, ApiError> {
    let locations = CatalogService::list_locations(&deployment.db().pool).await?;
    Ok(ResponseJson(LocationsResponse { locations }))
}

pub async fn list_sweets(
    State(deployment): State<DeploymentImpl>,
    _user: AuthUser,
    Query(query): Query<SweetsQuery>,
) -> Result<ResponseJson<SweetsResponse>, ApiError> {
    let sweets =
        CatalogService::list_sweets(&deployment.db().pool, query.location.as_deref()).await?;
    Ok(ResponseJson(SweetsResponse { sweets }))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/locations", get(list_locations))
        .route("/sweets", get(list_sweets))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::routes::test_support::TestApp;

    #[tokio::test]
    async fn test_locations_are_seeded() {
        let app = TestApp::new().await;
        let (_, token) = app.login("U1").await;

        let (status, body) = app
            .json(Method::GET, "/api/locations", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let slugs: Vec<&str> = body["locations"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|l| l["slug"].as_str())
            .collect();
        assert!(slugs.contains(&"taipei"));
        assert!(slugs.contains(&"kaohsiung"));
    }

    #[tokio::test]
    async fn test_sweets_filtered_by_location() {
        let app = TestApp::new().await;
        let (_, token) = app.login("U1").await;
        app.create_sweet("小晴", "taipei").await;
        app.create_sweet("小雨", "kaohsiung").await;

        let (status, body) = app
            .json(Method::GET, "/api/sweets", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sweets"].as_array().unwrap().len(), 2);

        let (_, body) = app
            .json(Method::GET, "/api/sweets?location=kaohsiung", Some(&token), None)
            .await;
        let sweets = body["sweets"].as_array().unwrap();
        assert_eq!(sweets.len(), 1);
        assert_eq!(sweets[0]["name"], "小雨");

        let (status, _) = app.json(Method::GET, "/api/sweets", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
