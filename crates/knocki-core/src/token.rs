//! Login request and token response documents
//!
//! The token endpoint speaks JSON:API. The request wraps the credentials in
//! a `tokens` resource; the response carries the token id in `data` and the
//! user in `included`.

use serde::{Deserialize, Serialize};

/// Token response from the Knocki API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TokenDocument")]
pub struct TokenResponse {
    pub token: String,
    pub user_id: String,
}

impl TokenResponse {
    /// Parse a token response from a raw API document
    pub fn from_api(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[derive(Deserialize)]
struct TokenDocument {
    data: Vec<Resource>,
    included: Vec<Resource>,
}

#[derive(Deserialize)]
struct Resource {
    attributes: ResourceAttributes,
}

#[derive(Deserialize)]
struct ResourceAttributes {
    id: String,
}

impl TryFrom<TokenDocument> for TokenResponse {
    type Error = String;

    fn try_from(doc: TokenDocument) -> Result<Self, Self::Error> {
        let token = doc
            .data
            .into_iter()
            .next()
            .ok_or("token document has an empty `data` array")?
            .attributes
            .id;
        let user_id = doc
            .included
            .into_iter()
            .next()
            .ok_or("token document has an empty `included` array")?
            .attributes
            .id;

        Ok(Self { token, user_id })
    }
}

/// Body posted to the token endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    data: [LoginResource; 1],
}

#[derive(Debug, Clone, Serialize)]
struct LoginResource {
    #[serde(rename = "type")]
    kind: &'static str,
    attributes: LoginAttributes,
}

#[derive(Debug, Clone, Serialize)]
struct LoginAttributes {
    email: String,
    password: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            data: [LoginResource {
                kind: "tokens",
                attributes: LoginAttributes {
                    email: email.into(),
                    password: password.into(),
                    kind: "auth",
                },
            }],
        }
    }
}

/// JSON:API error document
///
/// The token endpoint answers bad credentials with HTTP 200 and this body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ApiError>,
}

/// A single entry of an error document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorDocument {
    /// Extract the error document if `value` carries an `errors` member
    pub fn from_response(value: &serde_json::Value) -> Option<Self> {
        value.get("errors")?;
        Some(serde_json::from_value(value.clone()).unwrap_or_default())
    }

    /// First human readable message, if any
    pub fn message(&self) -> Option<&str> {
        self.errors
            .iter()
            .find_map(|e| e.detail.as_deref().or(e.title.as_deref()))
    }
}
