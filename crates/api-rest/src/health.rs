use grid_core::GridStore;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Health checks shared by the REST handlers.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Liveness only: the process is up and serving.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Grid maker is alive".into(),
        }
    }

    /// Readiness: the grid store can be read.
    pub fn check_store(store: &dyn GridStore) -> HealthRes {
        match store.read() {
            Ok(_) => Self::check_health(),
            Err(e) => {
                tracing::warn!(error = %e, "health check could not read grid store");
                HealthRes {
                    ok: false,
                    message: "Grid store unavailable".into(),
                }
            }
        }
    }
}
