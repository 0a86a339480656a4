//! ID token payload decoding
//!
//! The token comes straight from the token endpoint over TLS, so only the
//! payload is read. The signature is not checked.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use super::AuthError;
use crate::models::{Account, Claims};

/// Decode the claims of a compact-serialized JWT.
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_header), Some(payload), Some(_signature), None) => payload,
        _ => {
            return Err(AuthError::Provider(
                "ID token is not a compact JWT".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::Provider(format!("ID token payload is not base64url: {}", e)))?;
    let map: Map<String, Value> = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Provider(format!("ID token payload is not a JSON object: {}", e)))?;

    Ok(Claims::new(map))
}

/// Decode an ID token into the account it describes.
pub fn account_from_id_token(token: &str) -> Result<Account, AuthError> {
    decode_claims(token).map(Account::from_claims)
}

#[cfg(test)]
pub(crate) fn encode_for_test(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_claims() {
        let token = encode_for_test(&json!({
            "name": "Ada Lovelace",
            "roles": ["Admin"],
            "iat": 1700000000,
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.string("name"), Some("Ada Lovelace"));
        assert_eq!(claims.strings("roles"), vec!["Admin"]);
        assert_eq!(claims.timestamp("iat"), Some(1700000000.0));
    }

    #[test]
    fn test_decode_tolerates_padding() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"oid":"x"}"#);
        let token = format!("h.{}.s", payload);
        assert_eq!(decode_claims(&token).unwrap().string("oid"), Some("x"));
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(decode_claims("not-a-jwt").is_err());
        assert!(decode_claims("a.b.c.d").is_err());
        assert!(decode_claims("h.!!!.s").is_err());

        let array_payload = URL_SAFE_NO_PAD.encode("[1,2]");
        assert!(decode_claims(&format!("h.{}.s", array_payload)).is_err());
    }

    #[test]
    fn test_account_from_id_token() {
        let token = encode_for_test(&json!({
            "name": "Ada Lovelace",
            "preferred_username": "ada@contoso.com",
        }));
        let account = account_from_id_token(&token).unwrap();
        assert_eq!(account.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(account.username.as_deref(), Some("ada@contoso.com"));
    }
}
