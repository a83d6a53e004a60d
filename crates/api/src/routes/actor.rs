//! Console actor extraction.
//!
//! The upstream auth layer identifies console users and forwards the result
//! as headers: `X-Actor-Role` (`restaurant` or `administrator`) and, for
//! restaurants, `X-Restaurant-Id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::RestaurantId;
use domain::Actor;

use crate::error::ApiError;

pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const RESTAURANT_ID_HEADER: &str = "x-restaurant-id";

/// The actor performing a console request.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for ConsoleActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match header(parts, ACTOR_ROLE_HEADER) {
            Some("administrator") => Ok(ConsoleActor(Actor::Administrator)),
            Some("restaurant") => {
                let raw = header(parts, RESTAURANT_ID_HEADER).ok_or_else(|| {
                    ApiError::Unauthenticated("Missing X-Restaurant-Id header".to_string())
                })?;
                let id = RestaurantId::parse(raw).ok_or_else(|| {
                    ApiError::Unauthenticated(format!("Invalid restaurant id: {raw}"))
                })?;
                Ok(ConsoleActor(Actor::Restaurant(id)))
            }
            Some(other) => Err(ApiError::Unauthenticated(format!(
                "Unknown actor role: {other}"
            ))),
            None => Err(ApiError::Unauthenticated(
                "Missing X-Actor-Role header".to_string(),
            )),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}
