use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap, Uri};
use modkit::{
    bad_request, conflict, forbidden, internal_error, unauthorized, ProblemResponse, ValidationError,
};

use crate::domain::error::DomainError;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request path and id, copied into problem responses.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub instance: String,
    pub request_id: Option<String>,
}

impl RequestMeta {
    pub fn from_http(uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            instance: uri.path().to_owned(),
            request_id: headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_http(&parts.uri, &parts.headers))
    }
}

/// Stamp the module's error code and the request metadata onto a problem.
pub fn with_meta(resp: ProblemResponse, code: &str, meta: &RequestMeta) -> ProblemResponse {
    let ProblemResponse(mut problem) = resp;
    problem = problem
        .with_type(format!("https://errors.streetlight.local/{code}"))
        .with_code(code)
        .with_instance(meta.instance.clone());
    if let Some(id) = &meta.request_id {
        problem = problem.with_request_id(id.clone());
    }
    ProblemResponse(problem)
}

/// Map domain errors to RFC 9457 problems.
pub fn map_domain_error(e: &DomainError, meta: &RequestMeta) -> ProblemResponse {
    match e {
        DomainError::UsernameTaken { .. } => {
            with_meta(conflict(e.to_string()), "LIGHT_CONTROL_USERNAME_TAKEN", meta)
        }
        DomainError::Validation { field, message } => {
            let ProblemResponse(problem) = bad_request(e.to_string());
            let problem = problem.with_errors(vec![ValidationError {
                detail: message.clone(),
                pointer: format!("/{field}"),
            }]);
            with_meta(ProblemResponse(problem), "LIGHT_CONTROL_VALIDATION", meta)
        }
        DomainError::InvalidCredentials => {
            with_meta(unauthorized(e.to_string()), "LIGHT_CONTROL_INVALID_CREDENTIALS", meta)
        }
        DomainError::InvalidToken => {
            with_meta(forbidden(e.to_string()), "LIGHT_CONTROL_INVALID_TOKEN", meta)
        }
        DomainError::IntensityOutOfRange { .. } => with_meta(
            bad_request(e.to_string()),
            "LIGHT_CONTROL_INTENSITY_OUT_OF_RANGE",
            meta,
        ),
        DomainError::Database { .. } | DomainError::Internal { .. } => {
            tracing::error!(error = %e, instance = %meta.instance, "light_control request failed");
            with_meta(
                internal_error("An internal error occurred"),
                "LIGHT_CONTROL_INTERNAL",
                meta,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RequestMeta {
        RequestMeta {
            instance: "/login".into(),
            request_id: Some("rid-1".into()),
        }
    }

    #[test]
    fn statuses_and_codes() {
        let cases = [
            (DomainError::username_taken("bob"), 409, "LIGHT_CONTROL_USERNAME_TAKEN"),
            (DomainError::validation("username", "must not be empty"), 400, "LIGHT_CONTROL_VALIDATION"),
            (DomainError::InvalidCredentials, 401, "LIGHT_CONTROL_INVALID_CREDENTIALS"),
            (DomainError::InvalidToken, 403, "LIGHT_CONTROL_INVALID_TOKEN"),
            (
                DomainError::IntensityOutOfRange { value: 101, min: 0, max: 100 },
                400,
                "LIGHT_CONTROL_INTENSITY_OUT_OF_RANGE",
            ),
            (DomainError::database("disk I/O error"), 500, "LIGHT_CONTROL_INTERNAL"),
        ];
        for (err, status, code) in cases {
            let ProblemResponse(p) = map_domain_error(&err, &meta());
            assert_eq!(p.status, status);
            assert_eq!(p.code, code);
            assert_eq!(p.instance, "/login");
            assert_eq!(p.request_id.as_deref(), Some("rid-1"));
        }
    }

    #[test]
    fn validation_problem_points_at_the_field() {
        let ProblemResponse(p) =
            map_domain_error(&DomainError::validation("username", "must not be empty"), &meta());
        assert_eq!(p.title, "Bad Request");
        let errors = p.errors.expect("field errors");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pointer, "/username");
        assert_eq!(errors[0].detail, "must not be empty");
    }

    #[test]
    fn storage_details_are_hidden() {
        let ProblemResponse(p) = map_domain_error(&DomainError::database("table users is locked"), &meta());
        assert!(!p.detail.contains("locked"));
    }

    #[test]
    fn meta_reads_path_and_header() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, "abc".parse().unwrap());
        let uri: Uri = "/update-light?x=1".parse().unwrap();
        let m = RequestMeta::from_http(&uri, &headers);
        assert_eq!(m.instance, "/update-light");
        assert_eq!(m.request_id.as_deref(), Some("abc"));
    }
}
