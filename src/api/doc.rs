use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub const HEALTH_TAG: &str = "Health";
pub const DISPATCH_TAG: &str = "Dispatch";
pub const NOTIFICATION_JOB_TAG: &str = "NotificationJobs";
pub const GEO_TAG: &str = "Geo";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Basket",
        description = "Scheduled notification dispatch and store proximity API",
    ),
    modifiers(&SecurityAddon),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
            crate::error::ValidationFieldError,
            crate::models::JobKind,
            crate::models::JobStatus,
        )
    ),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = DISPATCH_TAG, description = "Dispatch loop trigger"),
        (name = NOTIFICATION_JOB_TAG, description = "Notification job scheduling endpoints"),
        (name = GEO_TAG, description = "Route planning and geofence endpoints"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some("Shared trigger secret (dispatch.trigger_secret)"))
                        .build(),
                ),
            )
        }
    }
}
