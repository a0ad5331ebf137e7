use std::sync::Arc;

use axum::{http::StatusCode, response::Json, Extension};
use modkit::ProblemResponse;
use tracing::info;

use crate::api::rest::dto::{
    CredentialsReq, DecisionResp, IntensityDto, LoginResp, MessageDto, UpdateLightResp,
};
use crate::api::rest::error::{map_domain_error, RequestMeta};
use crate::contract::model::Principal;
use crate::domain::service::Service;

type ApiResult<T> = Result<T, ProblemResponse>;

/// Create an account
pub async fn register(
    Extension(svc): Extension<Arc<Service>>,
    meta: RequestMeta,
    Json(req): Json<CredentialsReq>,
) -> ApiResult<(StatusCode, Json<MessageDto>)> {
    let user = svc
        .register(req.into())
        .await
        .map_err(|e| map_domain_error(&e, &meta))?;
    info!(user_id = user.id, "User registered via REST");

    Ok((
        StatusCode::CREATED,
        Json(MessageDto {
            message: "User created successfully".to_owned(),
        }),
    ))
}

/// Exchange credentials for an access token
pub async fn login(
    Extension(svc): Extension<Arc<Service>>,
    meta: RequestMeta,
    Json(req): Json<CredentialsReq>,
) -> ApiResult<Json<LoginResp>> {
    let token = svc
        .login(req.into())
        .await
        .map_err(|e| map_domain_error(&e, &meta))?;
    Ok(Json(LoginResp {
        access_token: token.token,
    }))
}

pub async fn latest_intensity(
    Extension(svc): Extension<Arc<Service>>,
    meta: RequestMeta,
) -> ApiResult<Json<IntensityDto>> {
    let intensity = svc
        .latest_intensity()
        .await
        .map_err(|e| map_domain_error(&e, &meta))?;
    Ok(Json(IntensityDto { intensity }))
}

pub async fn update_light(
    Extension(svc): Extension<Arc<Service>>,
    Extension(principal): Extension<Principal>,
    meta: RequestMeta,
    Json(req): Json<IntensityDto>,
) -> ApiResult<Json<UpdateLightResp>> {
    let reading = svc
        .record_intensity(req.intensity)
        .await
        .map_err(|e| map_domain_error(&e, &meta))?;
    info!(
        username = %principal.username,
        reading_id = reading.id,
        intensity = reading.intensity,
        "Light intensity updated"
    );
    Ok(Json(reading.into()))
}

/// Stateless on/off decision for a given intensity
pub async fn ai_control(
    Extension(svc): Extension<Arc<Service>>,
    Json(req): Json<IntensityDto>,
) -> Json<DecisionResp> {
    Json(svc.decide(req.intensity).into())
}
