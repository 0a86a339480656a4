//! Dashboard composition: which sections and cards appear for the current
//! authentication state and roles.
//!
//! Composition is pure. The TUI styles the result, the CLI prints it with
//! `render_text`.

use std::fmt;

use crate::api::CallError;
use crate::auth::{AuthState, RoleGuard};
use crate::models::IdentitySummary;

/// One line inside a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Field { label: &'static str, value: String },
    Text(String),
    Muted(String),
    /// Something the user can trigger, e.g. `[c] Call protected API`.
    Action(String),
    Code(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: &'static str,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub description: &'static str,
    pub cards: Vec<Card>,
}

/// State of the protected API panel in the Settings section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiPanel {
    pub loading: bool,
    pub result: Option<String>,
    pub error: Option<String>,
    /// The last failure can only be fixed by signing in again.
    pub needs_sign_in: bool,
}

impl ApiPanel {
    /// Start a call. Returns false while a previous call is outstanding.
    pub fn begin(&mut self) -> bool {
        if self.loading {
            return false;
        }
        *self = Self {
            loading: true,
            ..Self::default()
        };
        true
    }

    pub fn finish(&mut self, result: Result<String, CallError>) {
        self.loading = false;
        match result {
            Ok(body) => self.result = Some(body),
            Err(e) => {
                self.needs_sign_in = e.needs_sign_in();
                self.error = Some(e.user_message());
            }
        }
    }
}

fn field(label: &'static str, value: &str) -> Row {
    Row::Field {
        label,
        value: value.to_string(),
    }
}

/// Card shown only when the guard admits one of `roles`.
fn guarded(guard: RoleGuard, roles: &[String], card: impl FnOnce() -> Card) -> Option<Card> {
    guard.permits(roles).then(card)
}

/// Compose the screen for the given state.
///
/// Without an active account only the sign-in section is produced. The
/// identity summary is projected afresh on every call.
pub fn compose(state: &AuthState, api: &ApiPanel) -> Vec<Section> {
    match state {
        AuthState::Authenticated(account) => {
            dashboard(&IdentitySummary::project(Some(account)), api)
        }
        _ => vec![sign_in(state)],
    }
}

fn sign_in(state: &AuthState) -> Section {
    let mut rows = Vec::new();
    match state {
        AuthState::Authenticating { prompt } => {
            rows.push(Row::Muted("Signing in...".to_string()));
            if let Some(prompt) = prompt {
                rows.push(field("Visit", &prompt.verification_uri));
                rows.push(field("Enter code", &prompt.user_code));
                rows.push(Row::Muted(format!(
                    "The code expires in {} minutes.",
                    prompt.expires_in / 60
                )));
            }
        }
        AuthState::Unauthenticated { error } => {
            rows.push(Row::Action("[l] Sign in with Microsoft".to_string()));
            if let Some(error) = error {
                rows.push(Row::Error(error.clone()));
            }
        }
        AuthState::Authenticated(_) => {}
    }

    Section {
        title: "Secure Dashboard",
        description: "Sign in with your Microsoft Entra ID account to access the dashboard.",
        cards: vec![
            Card {
                title: "Sign in",
                rows,
            },
            Card {
                title: "Tokens",
                rows: vec![
                    Row::Muted("ID Token -> user profile & roles (UI security)".to_string()),
                    Row::Muted("Access Token -> secure API calls".to_string()),
                ],
            },
        ],
    }
}

fn dashboard(summary: &IdentitySummary, api: &ApiPanel) -> Vec<Section> {
    vec![
        overview(summary),
        users(summary),
        settings(api),
        activity(summary),
    ]
}

fn overview(summary: &IdentitySummary) -> Section {
    Section {
        title: "Overview",
        description: "High-level information about the signed-in user and tenant.",
        cards: vec![
            Card {
                title: "User",
                rows: vec![field("Name", &summary.name), field("Email", &summary.email)],
            },
            Card {
                title: "Tenant",
                rows: vec![
                    field("Tenant ID", &summary.tenant_id),
                    field("Object ID", &summary.object_id),
                ],
            },
        ],
    }
}

fn users(summary: &IdentitySummary) -> Section {
    let roles = &summary.roles;
    let assigned = if roles.is_empty() {
        vec![Row::Muted("No app roles assigned.".to_string())]
    } else {
        roles.iter().map(|r| Row::Text(format!("- {}", r))).collect()
    };

    let mut cards = vec![Card {
        title: "Assigned Roles",
        rows: assigned,
    }];
    cards.extend(guarded(RoleGuard::ADMIN, roles, || Card {
        title: "Admin Actions",
        rows: vec![Row::Text(
            "Manage users, review audit logs, and configure security policies.".to_string(),
        )],
    }));
    cards.extend(guarded(RoleGuard::EDITORS, roles, || Card {
        title: "Editors",
        rows: vec![Row::Text(
            "Create and update dashboard content and configuration.".to_string(),
        )],
    }));
    cards.extend(guarded(RoleGuard::READERS, roles, || Card {
        title: "Reporting",
        rows: vec![Row::Text(
            "Read-only access to analytics and reports.".to_string(),
        )],
    }));

    Section {
        title: "Users",
        description: "Role-based view of what this account can access inside the application.",
        cards,
    }
}

fn settings(api: &ApiPanel) -> Section {
    let mut rows = Vec::new();
    if api.loading {
        rows.push(Row::Muted("Calling API...".to_string()));
    } else {
        rows.push(Row::Action("[c] Call protected API".to_string()));
    }
    if let Some(result) = &api.result {
        rows.extend(result.lines().map(|l| Row::Code(l.to_string())));
    }
    if let Some(error) = &api.error {
        rows.push(Row::Error(error.clone()));
        if api.needs_sign_in {
            rows.push(Row::Muted(
                "Sign out with [o] and sign in again to renew the session.".to_string(),
            ));
        }
    }

    Section {
        title: "Settings",
        description: "Calls a protected backend API with an access token acquired silently.",
        cards: vec![Card {
            title: "Protected API",
            rows,
        }],
    }
}

fn activity(summary: &IdentitySummary) -> Section {
    Section {
        title: "Activity",
        description: "High-level view of sign-in and token details for this session.",
        cards: vec![Card {
            title: "Session",
            rows: vec![
                field("Session started (iat)", &summary.issued_at),
                field("Token expires (exp)", &summary.expires_at),
                field("Issuer (iss)", &summary.issuer),
            ],
        }],
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        writeln!(f, "{}", self.description)?;
        for card in &self.cards {
            writeln!(f)?;
            writeln!(f, "  [{}]", card.title)?;
            for row in &card.rows {
                match row {
                    Row::Field { label, value } => writeln!(f, "    {}: {}", label, value)?,
                    Row::Text(text) | Row::Muted(text) | Row::Action(text) => {
                        writeln!(f, "    {}", text)?
                    }
                    Row::Code(line) => writeln!(f, "    | {}", line)?,
                    Row::Error(msg) => writeln!(f, "    ! {}", msg)?,
                }
            }
        }
        writeln!(f)
    }
}

/// Plain-text rendering for non-interactive output.
pub fn render_text(sections: &[Section]) -> String {
    sections.iter().map(Section::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, SignInPrompt};
    use crate::models::{Account, Claims};
    use serde_json::{json, Value};

    fn account_with(claims: Value) -> Account {
        match claims {
            Value::Object(map) => Account::from_claims(Claims::new(map)),
            _ => panic!("claims must be an object"),
        }
    }

    fn authenticated(roles: &[&str]) -> AuthState {
        AuthState::Authenticated(account_with(json!({
            "name": "Ada Lovelace",
            "preferred_username": "ada@contoso.com",
            "tid": "tenant-1",
            "oid": "object-1",
            "roles": roles,
            "iat": 1700000000,
            "iss": "https://login.microsoftonline.com/tenant-1/v2.0",
        })))
    }

    fn titles(sections: &[Section]) -> Vec<&'static str> {
        sections.iter().map(|s| s.title).collect()
    }

    fn card_titles(sections: &[Section], section: &str) -> Vec<&'static str> {
        sections
            .iter()
            .find(|s| s.title == section)
            .map(|s| s.cards.iter().map(|c| c.title).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_unauthenticated_shows_only_sign_in() {
        let sections = compose(&AuthState::default(), &ApiPanel::default());
        assert_eq!(titles(&sections), vec!["Secure Dashboard"]);
        assert!(sections[0].cards[0]
            .rows
            .contains(&Row::Action("[l] Sign in with Microsoft".into())));
    }

    #[test]
    fn test_sign_in_error_shown_inline() {
        let state = AuthState::Unauthenticated {
            error: Some("User cancelled".into()),
        };
        let sections = compose(&state, &ApiPanel::default());
        assert!(sections[0].cards[0]
            .rows
            .contains(&Row::Error("User cancelled".into())));
    }

    #[test]
    fn test_authenticating_shows_device_prompt() {
        let state = AuthState::Authenticating {
            prompt: Some(SignInPrompt {
                verification_uri: "https://microsoft.com/devicelogin".into(),
                user_code: "ABCD-EFGH".into(),
                expires_in: 900,
            }),
        };
        let text = render_text(&compose(&state, &ApiPanel::default()));
        assert!(text.contains("Signing in..."));
        assert!(text.contains("Visit: https://microsoft.com/devicelogin"));
        assert!(text.contains("Enter code: ABCD-EFGH"));
        assert!(!text.contains("[l] Sign in"));
    }

    #[test]
    fn test_admin_sees_every_card() {
        let sections = compose(&authenticated(&["Admin"]), &ApiPanel::default());
        assert_eq!(
            titles(&sections),
            vec!["Overview", "Users", "Settings", "Activity"]
        );
        assert_eq!(
            card_titles(&sections, "Users"),
            vec!["Assigned Roles", "Admin Actions", "Editors", "Reporting"]
        );
    }

    #[test]
    fn test_reader_cards_are_filtered() {
        let sections = compose(&authenticated(&["Reader"]), &ApiPanel::default());
        assert_eq!(
            card_titles(&sections, "Users"),
            vec!["Assigned Roles", "Reporting"]
        );
    }

    #[test]
    fn test_editor_cards() {
        let sections = compose(&authenticated(&["Editor"]), &ApiPanel::default());
        assert_eq!(
            card_titles(&sections, "Users"),
            vec!["Assigned Roles", "Editors"]
        );
    }

    #[test]
    fn test_no_roles() {
        let sections = compose(&authenticated(&[]), &ApiPanel::default());
        assert_eq!(card_titles(&sections, "Users"), vec!["Assigned Roles"]);
        let text = render_text(&sections);
        assert!(text.contains("No app roles assigned."));
    }

    #[test]
    fn test_rendered_fields() {
        let text = render_text(&compose(&authenticated(&["Reader"]), &ApiPanel::default()));
        assert!(text.contains("Name: Ada Lovelace"));
        assert!(text.contains("Email: ada@contoso.com"));
        assert!(text.contains("Tenant ID: tenant-1"));
        assert!(text.contains("Object ID: object-1"));
        assert!(text.contains("- Reader"));
        assert!(text.contains("Session started (iat): 2023-11-14T22:13:20.000Z"));
        assert!(text.contains("Token expires (exp): N/A"));
        assert!(text.contains("Issuer (iss): https://login.microsoftonline.com/tenant-1/v2.0"));
    }

    #[test]
    fn test_render_text_layout() {
        let section = Section {
            title: "Settings",
            description: "Protected API.",
            cards: vec![Card {
                title: "Protected API",
                rows: vec![
                    field("Status", "ok"),
                    Row::Code("{}".into()),
                    Row::Error("boom".into()),
                ],
            }],
        };
        assert_eq!(
            render_text(&[section]),
            "== Settings ==\nProtected API.\n\n  [Protected API]\n    Status: ok\n    | {}\n    ! boom\n\n"
        );
    }

    #[test]
    fn test_api_panel_lifecycle() {
        let mut panel = ApiPanel::default();
        assert!(panel.begin());
        assert!(!panel.begin());

        let text = render_text(&compose(&authenticated(&[]), &panel));
        assert!(text.contains("Calling API..."));
        assert!(!text.contains("[c] Call protected API"));

        panel.finish(Ok("{\n  \"ok\": true\n}".into()));
        assert!(!panel.loading);
        let text = render_text(&compose(&authenticated(&[]), &panel));
        assert!(text.contains("|   \"ok\": true"));

        assert!(panel.begin());
        assert_eq!(panel.result, None);
        panel.finish(Err(CallError::Status(500)));
        assert_eq!(panel.error.as_deref(), Some("API responded with status 500"));
        assert!(!panel.needs_sign_in);
    }

    #[test]
    fn test_api_panel_sign_in_hint() {
        let mut panel = ApiPanel::default();
        panel.begin();
        panel.finish(Err(CallError::Token(AuthError::InteractionRequired(
            "Session expired.".into(),
        ))));
        let text = render_text(&compose(&authenticated(&[]), &panel));
        assert!(text.contains("! Session expired."));
        assert!(text.contains("sign in again"));
    }
}
