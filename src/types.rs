use serde::{Deserialize, Serialize};

/// Body of the token refresh call (wire field names of the drive API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    #[serde(default)]
    pub refresh_token: String,
    pub access_token: String,
    /// Seconds until the access token expires on the server side.
    pub expires_in: i64,
}

/// Session registration request. The signature travels as the `X-Signature`
/// header, not in the JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub device_name: String,
    pub model_name: String,
    pub pub_key: String,
    #[serde(skip)]
    pub signature: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub success: bool,
}

impl CreateSessionResponse {
    pub fn accepted() -> Self {
        Self {
            result: true,
            success: true,
        }
    }

    /// The server only accepted the public key when both flags are set.
    pub fn is_accepted(&self) -> bool {
        self.result && self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_request_uses_camel_case_and_skips_signature() {
        let req = CreateSessionRequest {
            device_name: "dev".into(),
            model_name: "model".into(),
            pub_key: "04ab".into(),
            signature: "deadbeef".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["deviceName"], "dev");
        assert_eq!(json["modelName"], "model");
        assert_eq!(json["pubKey"], "04ab");
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn refresh_response_parses_wire_format() {
        let resp: RefreshTokenResponse = serde_json::from_str(
            r#"{"access_token":"at","refresh_token":"rt","expires_in":7200,"token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(resp.access_token, "at");
        assert_eq!(resp.refresh_token, "rt");
        assert_eq!(resp.expires_in, 7200);
    }

    #[test]
    fn session_response_requires_both_flags() {
        let partial: CreateSessionResponse = serde_json::from_str(r#"{"result":true}"#).unwrap();
        assert!(!partial.is_accepted());
        assert!(CreateSessionResponse::accepted().is_accepted());
    }
}
