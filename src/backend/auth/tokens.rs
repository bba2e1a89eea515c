/**
 * Workspace Tokens
 *
 * HS256-signed JWTs binding a bearer to one workspace: the subject is the
 * workspace id in decimal. Tokens live 30 minutes; verification allows 5
 * seconds of clock skew and pins the issuer.
 */

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::error::ServerError;

/// Issuer claim stamped on and required of every token.
pub const ISSUER: &str = "obsidian-rt";

const TOKEN_TTL_MINUTES: i64 = 30;
const LEEWAY_SECONDS: u64 = 5;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Workspace id, decimal.
    sub: String,
    iss: String,
    exp: i64,
    nbf: i64,
    iat: i64,
    jti: String,
}

/// Create a token for `workspace_id`.
pub fn create_token(
    secret: &[u8],
    workspace_id: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: workspace_id.to_string(),
        iss: ISSUER.to_string(),
        exp: (now + chrono::Duration::minutes(TOKEN_TTL_MINUTES)).timestamp(),
        nbf: now.timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

/// Verify a token and return the workspace id it grants.
pub fn verify_token(secret: &[u8], token: &str) -> Result<i64, ServerError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = LEEWAY_SECONDS;
    validation.validate_nbf = true;
    validation.set_issuer(&[ISSUER]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|_| ServerError::Unauthorized)?;

    data.claims
        .sub
        .parse::<i64>()
        .map_err(|_| ServerError::Unauthorized)
}
