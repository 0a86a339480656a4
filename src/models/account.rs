//! Signed-in account and its ID token claims

use serde_json::{Map, Value};

/// Claims carried by an ID token.
///
/// The mapping is opaque: any key may be absent and values keep whatever JSON
/// type the identity provider chose. Typed access goes through the getters,
/// which treat a wrong type the same as a missing claim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// String claim, `None` when absent, empty or not a string.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// String elements of an array claim. Non-array values yield an empty list.
    pub fn strings(&self, name: &str) -> Vec<String> {
        match self.0.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Numeric Unix timestamp claim in seconds. Zero counts as absent.
    pub fn timestamp(&self, name: &str) -> Option<f64> {
        self.0
            .get(name)
            .and_then(Value::as_f64)
            .filter(|secs| secs.is_finite() && *secs != 0.0)
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// An account held by the token provider.
///
/// `display_name` and `username` come from the provider's account metadata,
/// not from the claims mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub claims: Claims,
}

impl Account {
    /// Build account metadata from ID token claims.
    pub fn from_claims(claims: Claims) -> Self {
        let display_name = claims.string("name").map(String::from);
        let username = claims
            .string("preferred_username")
            .or_else(|| claims.string("upn"))
            .or_else(|| claims.string("email"))
            .map(String::from);

        Self {
            display_name,
            username,
            claims,
        }
    }

    /// Cache key for tokens issued to this account: `<oid>.<tid>`.
    pub fn home_account_id(&self) -> String {
        format!(
            "{}.{}",
            self.claims.string("oid").unwrap_or_default(),
            self.claims.string("tid").unwrap_or_default()
        )
    }
}
