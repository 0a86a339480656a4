//! Identity summary projected from the active account's claims

use chrono::{DateTime, SecondsFormat};

use super::account::Account;

/// Placeholder shown for any field that cannot be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

/// Largest time value (ms) a timestamp may carry: +/- 100,000,000 days.
const MAX_TIME_MILLIS: f64 = 8.64e15;

/// Display fields derived from an account.
///
/// Always recomputed from the account on demand; nothing here is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySummary {
    pub name: String,
    pub email: String,
    pub tenant_id: String,
    pub object_id: String,
    pub roles: Vec<String>,
    pub issued_at: String,
    pub expires_at: String,
    pub issuer: String,
}

impl IdentitySummary {
    /// Project an account (or its absence) into display fields.
    ///
    /// Each field takes the first non-empty candidate in a fixed order. ID
    /// token claims come before the provider's account metadata.
    pub fn project(account: Option<&Account>) -> Self {
        let Some(account) = account else {
            return Self::unavailable();
        };
        let claims = &account.claims;
        let display_name = account.display_name.as_deref();
        let username = account.username.as_deref();

        Self {
            name: first_present([claims.string("name"), display_name, username]),
            email: first_present([
                claims.string("preferred_username"),
                claims.string("email"),
                username,
            ]),
            tenant_id: first_present([claims.string("tid"), claims.string("tenantId")]),
            object_id: first_present([claims.string("oid")]),
            roles: claims.strings("roles"),
            issued_at: format_timestamp(claims.timestamp("iat")),
            expires_at: format_timestamp(claims.timestamp("exp")),
            issuer: first_present([claims.string("iss")]),
        }
    }

    fn unavailable() -> Self {
        Self {
            name: NOT_AVAILABLE.to_string(),
            email: NOT_AVAILABLE.to_string(),
            tenant_id: NOT_AVAILABLE.to_string(),
            object_id: NOT_AVAILABLE.to_string(),
            roles: Vec::new(),
            issued_at: NOT_AVAILABLE.to_string(),
            expires_at: NOT_AVAILABLE.to_string(),
            issuer: NOT_AVAILABLE.to_string(),
        }
    }
}

fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// Render epoch seconds as an ISO-8601 UTC instant with millisecond precision.
fn format_timestamp(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return NOT_AVAILABLE.to_string();
    };
    let millis = (seconds * 1000.0).trunc();
    if !millis.is_finite() || millis.abs() > MAX_TIME_MILLIS {
        return NOT_AVAILABLE.to_string();
    }

    DateTime::from_timestamp_millis(millis as i64)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Claims;
    use serde_json::{json, Value};

    fn account(claims: Value, display_name: Option<&str>, username: Option<&str>) -> Account {
        let map = match claims {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        };
        Account {
            display_name: display_name.map(String::from),
            username: username.map(String::from),
            claims: Claims::new(map),
        }
    }

    #[test]
    fn test_absent_account_is_all_unavailable() {
        let summary = IdentitySummary::project(None);
        assert_eq!(summary.name, "N/A");
        assert_eq!(summary.email, "N/A");
        assert_eq!(summary.tenant_id, "N/A");
        assert_eq!(summary.object_id, "N/A");
        assert_eq!(summary.issued_at, "N/A");
        assert_eq!(summary.expires_at, "N/A");
        assert_eq!(summary.issuer, "N/A");
        assert!(summary.roles.is_empty());
    }

    #[test]
    fn test_name_claim_wins_over_account_metadata() {
        let acc = account(
            json!({"name": "Claim Name"}),
            Some("Display Name"),
            Some("user@contoso.com"),
        );
        assert_eq!(IdentitySummary::project(Some(&acc)).name, "Claim Name");
    }

    #[test]
    fn test_name_falls_back_to_display_name_then_username() {
        let acc = account(json!({}), Some("Display Name"), Some("user@contoso.com"));
        assert_eq!(IdentitySummary::project(Some(&acc)).name, "Display Name");

        let acc = account(json!({"name": ""}), Some(""), Some("user@contoso.com"));
        assert_eq!(IdentitySummary::project(Some(&acc)).name, "user@contoso.com");

        let acc = account(json!({}), None, None);
        assert_eq!(IdentitySummary::project(Some(&acc)).name, "N/A");
    }

    #[test]
    fn test_email_precedence() {
        let acc = account(
            json!({"preferred_username": "upn@contoso.com", "email": "mail@contoso.com"}),
            None,
            Some("user@contoso.com"),
        );
        assert_eq!(IdentitySummary::project(Some(&acc)).email, "upn@contoso.com");

        let acc = account(
            json!({"email": "mail@contoso.com"}),
            None,
            Some("user@contoso.com"),
        );
        assert_eq!(IdentitySummary::project(Some(&acc)).email, "mail@contoso.com");

        let acc = account(json!({}), None, Some("user@contoso.com"));
        assert_eq!(IdentitySummary::project(Some(&acc)).email, "user@contoso.com");
    }

    #[test]
    fn test_tenant_object_and_issuer() {
        let acc = account(
            json!({"tenantId": "tenant-b", "oid": "object-1", "iss": "https://login/v2.0"}),
            None,
            None,
        );
        let summary = IdentitySummary::project(Some(&acc));
        assert_eq!(summary.tenant_id, "tenant-b");
        assert_eq!(summary.object_id, "object-1");
        assert_eq!(summary.issuer, "https://login/v2.0");

        let acc = account(json!({"tid": "tenant-a", "tenantId": "tenant-b"}), None, None);
        assert_eq!(IdentitySummary::project(Some(&acc)).tenant_id, "tenant-a");
    }

    #[test]
    fn test_roles_absent_or_malformed() {
        let acc = account(json!({"roles": "Admin"}), None, None);
        assert!(IdentitySummary::project(Some(&acc)).roles.is_empty());

        let acc = account(json!({"roles": ["Admin", "Editor"]}), None, None);
        assert_eq!(
            IdentitySummary::project(Some(&acc)).roles,
            vec!["Admin", "Editor"]
        );
    }

    #[test]
    fn test_timestamps_render_as_iso_instants() {
        let acc = account(json!({"iat": 1700000000, "exp": 1700003600}), None, None);
        let summary = IdentitySummary::project(Some(&acc));
        assert_eq!(summary.issued_at, "2023-11-14T22:13:20.000Z");
        assert_eq!(summary.expires_at, "2023-11-14T23:13:20.000Z");
    }

    #[test]
    fn test_timestamps_zero_missing_or_non_numeric() {
        let acc = account(json!({"iat": 0, "exp": "soon"}), None, None);
        let summary = IdentitySummary::project(Some(&acc));
        assert_eq!(summary.issued_at, "N/A");
        assert_eq!(summary.expires_at, "N/A");

        let acc = account(json!({"iat": 1e300}), None, None);
        assert_eq!(IdentitySummary::project(Some(&acc)).issued_at, "N/A");
    }

    #[test]
    fn test_projection_is_idempotent() {
        let acc = account(
            json!({"name": "Ada", "roles": ["Reader"], "iat": 1700000000}),
            Some("Ada L"),
            Some("ada@contoso.com"),
        );
        assert_eq!(
            IdentitySummary::project(Some(&acc)),
            IdentitySummary::project(Some(&acc))
        );
    }
}
