//! Data Transfer Objects for API requests and responses.
//!
//! DTOs are organized by domain:
//! - `notification_job` - scheduling API request/response DTOs
//! - `geo` - route planner and geofence DTOs
//! - `health` - health check DTOs
//! - `error` - common error response DTOs
//! - `pagination` - pagination-related DTOs

mod error;
mod geo;
mod health;
mod notification_job;
mod pagination;

pub use error::{DispatchErrorResponse, ErrorResponse};
pub use geo::{GeofenceRequest, GeofenceResponse, RouteRequest};
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
pub use notification_job::{
    CreateNotificationJobRequest, ListNotificationJobsQuery, NotificationJobResponse,
};
pub use pagination::{PagedResponse, PaginationMeta, PaginationParams};
