use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::ranking::{DistanceVector, RankingResult};

/// Envelope every successful response is wrapped in
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub(crate) success: bool,
    pub(crate) data: Option<T>,
    pub(crate) error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wraps `data` in a successful envelope
    pub(crate) fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

// Implement IntoResponse for ApiResponse
impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };

        let body = json!({
            "success": self.success,
            "data": self.data,
            "error": self.error,
        });

        (status, Json(body)).into_response()
    }
}

/// One line of a ranking, with the reference label when the model has one.
#[derive(Debug, Serialize)]
pub(crate) struct MatchView {
    pub(crate) index: usize,
    pub(crate) distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) label: Option<String>,
}

/// Body of both ranking endpoints
#[derive(Debug, Serialize)]
pub(crate) struct RankResponse {
    pub(crate) query_id: Uuid,
    pub(crate) model_version: Option<String>,
    pub(crate) k: i64,
    pub(crate) matches: Vec<MatchView>,
    pub(crate) listing: String,
}

impl RankResponse {
    pub(crate) fn new<'a, F>(
        ranking: &RankingResult,
        k: i64,
        model_version: Option<String>,
        label: F,
    ) -> Self
    where
        F: Fn(usize) -> Option<&'a str>,
    {
        let matches = ranking
            .iter()
            .map(|m| MatchView {
                index: m.index,
                distance: m.distance,
                label: label(m.index).map(String::from),
            })
            .collect();

        Self {
            query_id: Uuid::new_v4(),
            model_version,
            k,
            matches,
            listing: ranking.listing(),
        }
    }
}

/// Query string of `/api/rank`
#[derive(Debug, Deserialize)]
pub(crate) struct RankParams {
    pub(crate) k: Option<i64>,
}

/// JSON body of `/api/rank/distances`
#[derive(Debug, Deserialize)]
pub(crate) struct RankDistancesRequest {
    pub(crate) distances: DistanceVector,
    pub(crate) k: Option<i64>,
}

/// Body of `/api/health`
#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) version: &'static str,
    pub(crate) model_version: Option<String>,
}
