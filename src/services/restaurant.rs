use crate::{
    entities::dining_table,
    entities::restaurant::{self, Entity as RestaurantEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point on the globe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// The restaurant's on-premises zone: centre plus radius in meters.
#[derive(Debug, Clone, Copy)]
pub struct Geofence {
    pub centre: Coordinates,
    pub radius_m: f64,
}

impl Geofence {
    pub fn contains(&self, point: Coordinates) -> bool {
        haversine_distance_m(self.centre, point) <= self.radius_m
    }
}

/// Great-circle distance between two points, in meters.
pub fn haversine_distance_m(a: Coordinates, b: Coordinates) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Resolved deployment context handed to the core operations, so business
/// logic never re-queries the restaurant singleton ad hoc.
#[derive(Debug, Clone)]
pub struct RestaurantContext {
    pub restaurant_id: Uuid,
    pub geofence: Option<Geofence>,
}

impl RestaurantContext {
    /// Server-side gate for unauthenticated customer ordering. With a
    /// configured geofence, orders must come with coordinates inside it;
    /// client-side checks are trivially bypassed, so missing coordinates
    /// are rejected too. Without a geofence the gate is open.
    pub fn ensure_on_premises(&self, point: Option<Coordinates>) -> Result<(), ServiceError> {
        let Some(fence) = self.geofence else {
            return Ok(());
        };
        match point {
            Some(point) if fence.contains(point) => Ok(()),
            _ => Err(ServiceError::OutsideServiceArea),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OnboardRestaurant {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRestaurantSettings {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub logo_url: Option<Option<String>>,
    /// Set or clear the geofence as one unit.
    pub geofence: Option<Option<Geofence>>,
}

/// Owns the restaurant singleton and the cached [`RestaurantContext`].
///
/// The context is resolved once and invalidated only when onboarding or a
/// settings update changes it.
#[derive(Clone)]
pub struct RestaurantService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    default_table_name: String,
    context: Arc<RwLock<Option<RestaurantContext>>>,
}

impl RestaurantService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        default_table_name: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            default_table_name,
            context: Arc::new(RwLock::new(None)),
        }
    }

    /// The restaurant row, or `RestaurantNotConfigured` when the deployment
    /// has not been onboarded.
    pub async fn get(&self) -> Result<restaurant::Model, ServiceError> {
        RestaurantEntity::find()
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or(ServiceError::RestaurantNotConfigured)
    }

    /// The cached deployment context, resolving it on first use.
    pub async fn context(&self) -> Result<RestaurantContext, ServiceError> {
        if let Some(ctx) = self.context.read().await.as_ref() {
            return Ok(ctx.clone());
        }

        let model = self.get().await?;
        let ctx = context_from_model(&model);
        *self.context.write().await = Some(ctx.clone());
        Ok(ctx)
    }

    async fn invalidate_context(&self) {
        *self.context.write().await = None;
    }

    /// Creates the restaurant row and its default table. Idempotent: a
    /// second call returns the existing restaurant untouched.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn onboard(
        &self,
        input: OnboardRestaurant,
    ) -> Result<restaurant::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Restaurant name must not be empty".to_string(),
            ));
        }

        if let Some(existing) = RestaurantEntity::find()
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
        {
            info!(restaurant_id = %existing.id, "restaurant already onboarded");
            return Ok(existing);
        }

        let now = Utc::now();
        let restaurant_id = Uuid::new_v4();

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start onboarding transaction");
            ServiceError::DatabaseError(e)
        })?;

        let model = restaurant::ActiveModel {
            id: Set(restaurant_id),
            name: Set(input.name),
            address: Set(input.address),
            phone: Set(input.phone),
            email: Set(input.email),
            website: Set(input.website),
            logo_url: Set(input.logo_url),
            geo_latitude: Set(None),
            geo_longitude: Set(None),
            geo_radius_m: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::DatabaseError)?;

        dining_table::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(self.default_table_name.clone()),
            restaurant_id: Set(restaurant_id),
            is_default: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::DatabaseError)?;

        txn.commit().await.map_err(ServiceError::DatabaseError)?;

        self.invalidate_context().await;
        info!(restaurant_id = %restaurant_id, "restaurant onboarded");

        if let Err(e) = self
            .event_sender
            .send(Event::RestaurantOnboarded(restaurant_id))
            .await
        {
            warn!(error = %e, "failed to send restaurant onboarded event");
        }

        Ok(model)
    }

    /// Updates display metadata and the geofence.
    #[instrument(skip(self, input))]
    pub async fn update_settings(
        &self,
        input: UpdateRestaurantSettings,
    ) -> Result<restaurant::Model, ServiceError> {
        let model = self.get().await?;
        let mut active: restaurant::ActiveModel = model.into();

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Restaurant name must not be empty".to_string(),
                ));
            }
            active.name = Set(name);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(email) = input.email {
            active.email = Set(email);
        }
        if let Some(website) = input.website {
            active.website = Set(website);
        }
        if let Some(logo_url) = input.logo_url {
            active.logo_url = Set(logo_url);
        }
        if let Some(geofence) = input.geofence {
            match geofence {
                Some(fence) => {
                    if fence.radius_m <= 0.0 {
                        return Err(ServiceError::ValidationError(
                            "Geofence radius must be positive".to_string(),
                        ));
                    }
                    active.geo_latitude = Set(Some(fence.centre.latitude));
                    active.geo_longitude = Set(Some(fence.centre.longitude));
                    active.geo_radius_m = Set(Some(fence.radius_m));
                }
                None => {
                    active.geo_latitude = Set(None);
                    active.geo_longitude = Set(None);
                    active.geo_radius_m = Set(None);
                }
            }
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.invalidate_context().await;
        info!(restaurant_id = %updated.id, "restaurant settings updated");

        Ok(updated)
    }
}

fn context_from_model(model: &restaurant::Model) -> RestaurantContext {
    let geofence = match (model.geo_latitude, model.geo_longitude, model.geo_radius_m) {
        (Some(latitude), Some(longitude), Some(radius_m)) => Some(Geofence {
            centre: Coordinates {
                latitude,
                longitude,
            },
            radius_m,
        }),
        _ => None,
    };

    RestaurantContext {
        restaurant_id: model.id,
        geofence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: Coordinates = Coordinates {
        latitude: 48.8566,
        longitude: 2.3522,
    };
    const LONDON: Coordinates = Coordinates {
        latitude: 51.5074,
        longitude: -0.1278,
    };

    #[test]
    fn haversine_matches_known_distance() {
        // Paris to London is roughly 344 km.
        let d = haversine_distance_m(PARIS, LONDON);
        assert!((d - 344_000.0).abs() < 5_000.0, "got {}", d);
    }

    #[test]
    fn haversine_is_zero_for_same_point() {
        assert_eq!(haversine_distance_m(PARIS, PARIS), 0.0);
    }

    #[test]
    fn geofence_contains_nearby_point() {
        let fence = Geofence {
            centre: PARIS,
            radius_m: 200.0,
        };
        let nearby = Coordinates {
            latitude: 48.8567,
            longitude: 2.3523,
        };
        assert!(fence.contains(nearby));
        assert!(!fence.contains(LONDON));
    }

    #[test]
    fn gate_is_open_without_geofence() {
        let ctx = RestaurantContext {
            restaurant_id: Uuid::new_v4(),
            geofence: None,
        };
        assert!(ctx.ensure_on_premises(None).is_ok());
        assert!(ctx.ensure_on_premises(Some(LONDON)).is_ok());
    }

    #[test]
    fn gate_rejects_missing_or_distant_coordinates() {
        let ctx = RestaurantContext {
            restaurant_id: Uuid::new_v4(),
            geofence: Some(Geofence {
                centre: PARIS,
                radius_m: 100.0,
            }),
        };
        assert!(matches!(
            ctx.ensure_on_premises(None),
            Err(ServiceError::OutsideServiceArea)
        ));
        assert!(matches!(
            ctx.ensure_on_premises(Some(LONDON)),
            Err(ServiceError::OutsideServiceArea)
        ));
        assert!(ctx.ensure_on_premises(Some(PARIS)).is_ok());
    }
}
