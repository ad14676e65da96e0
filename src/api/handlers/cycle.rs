use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::api::auth::worker_secret;
use crate::engine::CycleRequest;
use crate::errors::AppError;
use crate::models::CycleResult;
use crate::AppState;

/// `asOf` accepts unix seconds (number or numeric string) or RFC 3339.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AsOf {
    Unix(i64),
    Text(String),
}

impl AsOf {
    pub fn resolve(&self) -> Result<DateTime<Utc>, AppError> {
        let invalid = || AppError::BadRequest("asOf must be unix seconds or RFC 3339".into());
        match self {
            AsOf::Unix(secs) => Utc.timestamp_opt(*secs, 0).single().ok_or_else(invalid),
            AsOf::Text(s) => {
                let s = s.trim();
                if let Ok(secs) = s.parse::<i64>() {
                    return Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid);
                }
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| invalid())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCycleBody {
    pub identity: String,
    pub as_of: Option<AsOf>,
}

/// POST /api/worker/copy-trade/run
pub async fn run(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RunCycleBody>, JsonRejection>,
) -> Result<Json<CycleResult>, AppError> {
    let credential = worker_secret(&headers);

    // A malformed body from an unauthenticated caller is still a 401
    let reject = |e: AppError| {
        if state.engine.auth().verify(&credential) {
            e
        } else {
            AppError::Unauthorized
        }
    };

    let Json(body) = body.map_err(|e| reject(AppError::BadRequest(e.body_text())))?;
    let as_of = body
        .as_of
        .as_ref()
        .map(AsOf::resolve)
        .transpose()
        .map_err(reject)?;

    let result = state
        .engine
        .run_cycle(CycleRequest {
            credential,
            identity: body.identity.trim().to_string(),
            as_of,
        })
        .await?;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_of_unix_number() {
        let body: RunCycleBody = serde_json::from_str(r#"{"identity":"u","asOf":1700000000}"#).unwrap();
        let dt = body.as_of.unwrap().resolve().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_as_of_numeric_string_and_rfc3339() {
        let dt = AsOf::Text("1700000000".into()).resolve().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);

        let dt = AsOf::Text("2023-11-14T22:13:20Z".into()).resolve().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);

        let dt = AsOf::Text("2023-11-15T00:13:20+02:00".into()).resolve().unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_as_of_invalid() {
        assert!(matches!(
            AsOf::Text("yesterday".into()).resolve(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_as_of_optional() {
        let body: RunCycleBody = serde_json::from_str(r#"{"identity":"u"}"#).unwrap();
        assert!(body.as_of.is_none());
    }
}
