use crate::container::{Container, ContainerError};
use crate::federation::{FederationError, RemoteQuery};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use mosaic_domain::constants::keys;
use serde_json::{Value, json};
use tracing::{debug, error};

/// Why `POST /query` did not produce data.
#[derive(Debug)]
pub enum QueryRejection {
    /// No `remoteQuery` binding: the platform runs legacy-only.
    Unavailable,
    /// The shape could not be resolved.
    Federation(FederationError),
    Registry(ContainerError),
}

impl IntoResponse for QueryRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Federated queries require isolated modules".to_owned(),
            ),
            Self::Federation(err) => {
                debug!(error = %err, "Query rejected");
                (StatusCode::BAD_REQUEST, err.to_string())
            },
            Self::Registry(err) => {
                error!(error = %err, "remoteQuery binding unusable");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_owned())
            },
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub(super) async fn query_handler(
    Extension(scope): Extension<Container>,
    Json(shape): Json<Value>,
) -> Result<Json<Value>, QueryRejection> {
    let remote_query = scope
        .try_resolve::<RemoteQuery>(keys::REMOTE_QUERY)
        .map_err(QueryRejection::Registry)?
        .ok_or(QueryRejection::Unavailable)?;

    let data = remote_query.resolve(&shape).await.map_err(QueryRejection::Federation)?;
    Ok(Json(data))
}
