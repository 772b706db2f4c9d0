//! Shared API request/response types
//!
//! Field names follow what the client application expects on the wire
//! (`scientificName` is camelCase, health fields are snake_case).

use serde::{Deserialize, Serialize};

/// Body of `POST /identify`
///
/// # Examples
///
/// ```
/// use flora_common::api::IdentifyRequest;
///
/// let req: IdentifyRequest =
///     serde_json::from_str(r#"{"image": "data:image/jpeg;base64,/9j/4AAQ"}"#).unwrap();
/// assert!(req.image.starts_with("data:"));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentifyRequest {
    /// Base64 image, optionally with a data-URL header (`data:...;base64,`)
    pub image: String,
}

/// Response of `POST /identify`
///
/// Every text field is always present. `description` is never blank.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    /// Resolved species name (local name)
    pub name: String,
    /// Foreign/scientific name, or a sentinel for remote-only identification
    pub scientific_name: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub description: String,
    pub poetry: String,
    pub botany: String,
    /// Care instructions (water/light/soil/temperature, one per line)
    pub care: String,
    pub culture: String,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    /// Always "ok" once the process is serving
    pub status: String,
    /// Module name ("flora-id")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Whether local inference is usable
    pub ml_available: bool,
    /// Why local inference is unavailable (null when available)
    pub ml_error: Option<String>,
    /// Device selected for local inference at startup
    pub device: String,
    /// Number of species in the loaded table
    pub flower_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identification_result_uses_camel_case() {
        let result = IdentificationResult {
            name: "玫瑰".to_string(),
            scientific_name: "Rose".to_string(),
            confidence: 0.95,
            description: "d".to_string(),
            poetry: String::new(),
            botany: String::new(),
            care: String::new(),
            culture: String::new(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["scientificName"], "Rose");
        assert!(json.get("scientific_name").is_none());
        assert_eq!(json["poetry"], "");
    }

    #[test]
    fn test_health_response_serializes_null_ml_error() {
        let health = HealthResponse {
            status: "ok".to_string(),
            module: "flora-id".to_string(),
            version: "0.1.0".to_string(),
            uptime_seconds: 0,
            ml_available: true,
            ml_error: None,
            device: "cpu".to_string(),
            flower_count: 3,
        };

        let json = serde_json::to_value(&health).unwrap();
        assert!(json["ml_error"].is_null());
        assert_eq!(json["flower_count"], 3);
    }
}
