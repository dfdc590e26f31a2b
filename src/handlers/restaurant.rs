use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::restaurant;
use crate::services::restaurant::{
    Coordinates, Geofence, OnboardRestaurant, UpdateRestaurantSettings,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RestaurantResponse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub geofence: Option<GeofenceDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GeofenceDto {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OnboardRequest {
    #[validate(length(min = 1, message = "Restaurant name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSettingsRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    /// Present-and-null clears the geofence; absent leaves it untouched.
    #[serde(default, with = "double_option")]
    pub geofence: Option<Option<GeofenceDto>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

fn to_response(model: restaurant::Model) -> RestaurantResponse {
    let geofence = match (model.geo_latitude, model.geo_longitude, model.geo_radius_m) {
        (Some(latitude), Some(longitude), Some(radius_m)) => Some(GeofenceDto {
            latitude,
            longitude,
            radius_m,
        }),
        _ => None,
    };

    RestaurantResponse {
        id: model.id,
        name: model.name,
        address: model.address,
        phone: model.phone,
        email: model.email,
        website: model.website,
        logo_url: model.logo_url,
        geofence,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// Fetch the restaurant.
#[utoipa::path(
    get,
    path = "/api/v1/restaurant",
    responses(
        (status = 200, description = "The restaurant", body = RestaurantResponse),
        (status = 503, description = "Deployment not onboarded")
    ),
    tag = "restaurant"
)]
pub async fn get_restaurant(State(state): State<AppState>) -> ApiResult<RestaurantResponse> {
    let model = state.services.restaurant.get().await?;
    Ok(Json(ApiResponse::success(to_response(model))))
}

/// Onboard the deployment. Idempotent.
#[utoipa::path(
    post,
    path = "/api/v1/restaurant",
    request_body = OnboardRequest,
    responses((status = 200, description = "Restaurant created or already present", body = RestaurantResponse)),
    tag = "restaurant"
)]
pub async fn onboard_restaurant(
    State(state): State<AppState>,
    Json(request): Json<OnboardRequest>,
) -> ApiResult<RestaurantResponse> {
    request.validate()?;

    let model = state
        .services
        .restaurant
        .onboard(OnboardRestaurant {
            name: request.name,
            address: request.address,
            phone: request.phone,
            email: request.email,
            website: request.website,
            logo_url: request.logo_url,
        })
        .await?;

    Ok(Json(ApiResponse::success(to_response(model))))
}

/// Update restaurant settings, including the geofence.
#[utoipa::path(
    put,
    path = "/api/v1/restaurant",
    request_body = UpdateSettingsRequest,
    responses((status = 200, description = "Updated restaurant", body = RestaurantResponse)),
    tag = "restaurant"
)]
pub async fn update_restaurant(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<RestaurantResponse> {
    let geofence = request.geofence.map(|fence| {
        fence.map(|f| Geofence {
            centre: Coordinates {
                latitude: f.latitude,
                longitude: f.longitude,
            },
            radius_m: f.radius_m,
        })
    });

    let model = state
        .services
        .restaurant
        .update_settings(UpdateRestaurantSettings {
            name: request.name,
            address: request.address.map(Some),
            phone: request.phone.map(Some),
            email: request.email.map(Some),
            website: request.website.map(Some),
            logo_url: request.logo_url.map(Some),
            geofence,
        })
        .await?;

    Ok(Json(ApiResponse::success(to_response(model))))
}
