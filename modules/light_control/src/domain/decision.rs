use crate::contract::model::LightDecision;

/// The light goes on when the measured intensity is strictly below `threshold`.
pub fn decide(intensity: i32, threshold: i32) -> LightDecision {
    if intensity < threshold {
        LightDecision::On
    } else {
        LightDecision::Off
    }
}
