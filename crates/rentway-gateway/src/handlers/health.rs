//! Liveness endpoint.
//!
//! GET /api/health - always 200 while the process is alive.

use rentway_kernel::GatewayResponse;
use serde_json::json;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "api-gateway";

/// `GET /api/health`
pub fn health() -> GatewayResponse {
    GatewayResponse::json(
        200,
        &json!({
            "status": "ok",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": SERVICE_NAME,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_reports_service_and_timestamp() {
        let resp = health();
        assert_eq!(resp.status, 200);
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "api-gateway");
        let ts = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
