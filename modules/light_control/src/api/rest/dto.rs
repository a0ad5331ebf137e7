use serde::{Deserialize, Serialize};

use crate::contract::model::{Credentials, LightDecision, LightReading};

/// Body of `/register` and `/login`. Absent fields become empty strings so
/// the domain reports them as validation errors.
#[derive(Deserialize)]
pub struct CredentialsReq {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl From<CredentialsReq> for Credentials {
    fn from(req: CredentialsReq) -> Self {
        Credentials::new(req.username, req.password)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageDto {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResp {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntensityDto {
    pub intensity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateLightResp {
    pub message: String,
    pub id: i64,
}

impl From<LightReading> for UpdateLightResp {
    fn from(r: LightReading) -> Self {
        Self {
            message: "Light intensity updated successfully".to_owned(),
            id: r.id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionResp {
    pub decision: String,
}

impl From<LightDecision> for DecisionResp {
    fn from(d: LightDecision) -> Self {
        Self {
            decision: d.as_str().to_owned(),
        }
    }
}
