//! Declarative visibility rules and their evaluation.
//!
//! Each rule class has one attribute that declares it and one marker attribute
//! stamped on elements it hides. Evaluation is a pure function of the user
//! record and the rule, except for permission rules, which need a round trip
//! to the service because permissions are not part of the cached record.

use crate::auth::{Authority, UserRecord};
use std::collections::BTreeSet;

/// Why an element was hidden. Also names the rule class and its phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reason {
    Permission,
    Profile,
    Admin,
    Blacklist,
    Whitelist,
}

impl Reason {
    /// Phase order of a reconciliation pass.
    pub const PASS_ORDER: [Reason; 5] = [
        Reason::Permission,
        Reason::Profile,
        Reason::Admin,
        Reason::Blacklist,
        Reason::Whitelist,
    ];

    /// Attribute declaring the rule on an element.
    #[must_use]
    pub const fn rule_attribute(self) -> &'static str {
        match self {
            Reason::Permission => "data-require-permission",
            Reason::Profile => "data-require-profile",
            Reason::Admin => "data-require-admin",
            Reason::Blacklist => "data-hide-for-profiles",
            Reason::Whitelist => "data-show-for-profiles",
        }
    }

    /// Attribute stamped (`="true"`) on elements this rule class hid.
    #[must_use]
    pub const fn marker_attribute(self) -> &'static str {
        match self {
            Reason::Permission => "data-hidden-by-permission",
            Reason::Profile => "data-hidden-by-profile",
            Reason::Admin => "data-hidden-by-admin",
            Reason::Blacklist => "data-hidden-for-profile",
            Reason::Whitelist => "data-hidden-show-only",
        }
    }

    /// Only `data-require-admin="true"` declares the admin rule; other values
    /// are ignored.
    #[must_use]
    pub const fn required_value(self) -> Option<&'static str> {
        match self {
            Reason::Admin => Some("true"),
            _ => None,
        }
    }

    /// Whether evaluating this class needs the current user record.
    #[must_use]
    pub const fn needs_user(self) -> bool {
        !matches!(self, Reason::Permission)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Reason::Permission => "permission",
            Reason::Profile => "profile",
            Reason::Admin => "admin",
            Reason::Blacklist => "blacklist",
            Reason::Whitelist => "whitelist",
        }
    }
}

impl Reason {
    /// Inverse of [`Reason::as_str`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::PASS_ORDER
            .into_iter()
            .find(|reason| reason.as_str() == name.trim())
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    RequirePermission { module: String, permission: String },
    RequireProfile { profile: String },
    RequireAdmin,
    HideForProfiles { profiles: BTreeSet<String> },
    ShowForProfiles { profiles: BTreeSet<String> },
}

impl Rule {
    /// Parses the attribute value declaring a rule of class `reason`.
    /// Returns `None` for a malformed declaration.
    #[must_use]
    pub fn parse(reason: Reason, value: &str) -> Option<Self> {
        match reason {
            Reason::Permission => {
                // Fields past the second are ignored: "a:b:c" checks a:b.
                let mut fields = value.split(':');
                let module = fields.next()?.trim();
                let permission = fields.next()?.trim();
                if module.is_empty() || permission.is_empty() {
                    return None;
                }
                Some(Rule::RequirePermission {
                    module: module.to_string(),
                    permission: permission.to_string(),
                })
            }
            Reason::Profile => {
                let profile = value.trim();
                (!profile.is_empty()).then(|| Rule::RequireProfile {
                    profile: profile.to_string(),
                })
            }
            Reason::Admin => Some(Rule::RequireAdmin),
            Reason::Blacklist => Some(Rule::HideForProfiles {
                profiles: parse_profiles(value),
            }),
            Reason::Whitelist => Some(Rule::ShowForProfiles {
                profiles: parse_profiles(value),
            }),
        }
    }

    #[must_use]
    pub const fn reason(&self) -> Reason {
        match self {
            Rule::RequirePermission { .. } => Reason::Permission,
            Rule::RequireProfile { .. } => Reason::Profile,
            Rule::RequireAdmin => Reason::Admin,
            Rule::HideForProfiles { .. } => Reason::Blacklist,
            Rule::ShowForProfiles { .. } => Reason::Whitelist,
        }
    }
}

/// Splits a comma separated profile list, dropping blank entries.
fn parse_profiles(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|profile| !profile.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityOutcome {
    pub visible: bool,
    pub reason: Reason,
}

impl VisibilityOutcome {
    #[must_use]
    pub const fn new(visible: bool, reason: Reason) -> Self {
        Self { visible, reason }
    }

    #[must_use]
    pub const fn denied(reason: Reason) -> Self {
        Self::new(false, reason)
    }
}

/// Decides a rule from the cached user alone. Returns `None` for permission
/// rules, which must be asked of the service.
#[must_use]
pub fn evaluate_local(user: &UserRecord, rule: &Rule) -> Option<bool> {
    match rule {
        Rule::RequirePermission { .. } => None,
        Rule::RequireProfile { profile } => Some(user.holds_profile(profile)),
        Rule::RequireAdmin => Some(user.is_admin),
        Rule::HideForProfiles { profiles } => {
            Some(!profiles.iter().any(|profile| user.lists_profile(profile)))
        }
        Rule::ShowForProfiles { profiles } => Some(
            user.is_admin || profiles.iter().any(|profile| user.lists_profile(profile)),
        ),
    }
}

/// Resolves a rule to an outcome, asking `authority` for permission rules.
/// Without a user record every user-dependent rule denies.
pub async fn evaluate<A: Authority>(
    authority: &A,
    user: Option<&UserRecord>,
    rule: &Rule,
) -> VisibilityOutcome {
    let reason = rule.reason();
    let visible = match rule {
        Rule::RequirePermission { module, permission } => {
            authority.check_permission(module, permission).await
        }
        _ => user.and_then(|user| evaluate_local(user, rule)).unwrap_or(false),
    };
    VisibilityOutcome::new(visible, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_admin: bool, primary: &str, profiles: &[&str]) -> UserRecord {
        UserRecord {
            id: 1,
            display_name: "Eva".to_string(),
            email: None,
            is_admin,
            is_active: true,
            profiles: profiles.iter().map(ToString::to_string).collect(),
            primary_profile: primary.to_string(),
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn phase_attributes_are_distinct() {
        let rules: BTreeSet<_> = Reason::PASS_ORDER.iter().map(|r| r.rule_attribute()).collect();
        let markers: BTreeSet<_> = Reason::PASS_ORDER.iter().map(|r| r.marker_attribute()).collect();
        assert_eq!(rules.len(), 5);
        assert_eq!(markers.len(), 5);
    }

    #[test]
    fn reason_names_round_trip() {
        for reason in Reason::PASS_ORDER {
            assert_eq!(Reason::from_name(reason.as_str()), Some(reason));
        }
        assert_eq!(Reason::from_name(" whitelist "), Some(Reason::Whitelist));
        assert_eq!(Reason::from_name("everything"), None);
    }

    #[test]
    fn parse_permission_declaration() {
        assert_eq!(
            Rule::parse(Reason::Permission, "modulo2:edit"),
            Some(Rule::RequirePermission {
                module: "modulo2".to_string(),
                permission: "edit".to_string()
            })
        );
        assert_eq!(Rule::parse(Reason::Permission, "modulo2"), None);
        assert_eq!(Rule::parse(Reason::Permission, ":edit"), None);
        assert_eq!(Rule::parse(Reason::Permission, "modulo2: "), None);
    }

    #[test]
    fn parse_permission_ignores_extra_fields() {
        assert_eq!(
            Rule::parse(Reason::Permission, "vendas:edit:own"),
            Some(Rule::RequirePermission {
                module: "vendas".to_string(),
                permission: "edit".to_string()
            })
        );
    }

    #[test]
    fn parse_profile_lists_trims_and_drops_blanks() {
        assert_eq!(
            Rule::parse(Reason::Blacklist, " gestor, direcao ,,"),
            Some(Rule::HideForProfiles {
                profiles: set(&["gestor", "direcao"])
            })
        );
        assert_eq!(Rule::parse(Reason::Profile, "  "), None);
        assert_eq!(Rule::parse(Reason::Admin, "true"), Some(Rule::RequireAdmin));
    }

    #[test]
    fn require_profile_is_case_insensitive() {
        let user = user(false, "admin", &[]);
        let rule = Rule::RequireProfile {
            profile: "Admin".to_string(),
        };
        assert_eq!(evaluate_local(&user, &rule), Some(true));
    }

    #[test]
    fn require_admin_follows_flag() {
        assert_eq!(evaluate_local(&user(true, "x", &[]), &Rule::RequireAdmin), Some(true));
        assert_eq!(evaluate_local(&user(false, "x", &[]), &Rule::RequireAdmin), Some(false));
    }

    #[test]
    fn hide_for_profiles_matches_secondary_and_primary() {
        let rule = Rule::HideForProfiles {
            profiles: set(&["gestor", "direcao"]),
        };
        assert_eq!(evaluate_local(&user(false, "gestor", &["gestor"]), &rule), Some(false));
        assert_eq!(evaluate_local(&user(false, "direcao", &[]), &rule), Some(false));
        assert_eq!(evaluate_local(&user(false, "op", &["direcao"]), &rule), Some(false));
        assert_eq!(evaluate_local(&user(false, "op", &["auditor"]), &rule), Some(true));
    }

    #[test]
    fn profile_lists_match_exactly() {
        let gestor = user(false, "gestor", &["gestor"]);
        let hide = Rule::HideForProfiles {
            profiles: set(&["Gestor"]),
        };
        let show = Rule::ShowForProfiles {
            profiles: set(&["GESTOR"]),
        };
        assert_eq!(evaluate_local(&gestor, &hide), Some(true));
        assert_eq!(evaluate_local(&gestor, &show), Some(false));
        assert_eq!(evaluate_local(&user(false, "op", &["Direcao"]), &hide), Some(true));
    }

    #[test]
    fn hide_for_profiles_does_not_spare_admins() {
        let rule = Rule::HideForProfiles {
            profiles: set(&["gestor"]),
        };
        assert_eq!(evaluate_local(&user(true, "gestor", &[]), &rule), Some(false));
    }

    #[test]
    fn show_for_profiles_admin_bypass() {
        let rule = Rule::ShowForProfiles {
            profiles: set(&["auditor"]),
        };
        assert_eq!(evaluate_local(&user(true, "op", &["gestor"]), &rule), Some(true));
        assert_eq!(evaluate_local(&user(false, "op", &["gestor"]), &rule), Some(false));
        assert_eq!(evaluate_local(&user(false, "auditor", &[]), &rule), Some(true));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let user = user(false, "gestor", &["gestor", "auditor"]);
        let rules = [
            Rule::RequireProfile {
                profile: "AUDITOR".to_string(),
            },
            Rule::RequireAdmin,
            Rule::HideForProfiles {
                profiles: set(&["direcao"]),
            },
            Rule::ShowForProfiles {
                profiles: set(&["gestor"]),
            },
        ];
        for rule in &rules {
            let first = evaluate_local(&user, rule);
            for _ in 0..3 {
                assert_eq!(evaluate_local(&user, rule), first);
            }
        }
    }

    #[test]
    fn permission_rules_are_not_local() {
        let rule = Rule::RequirePermission {
            module: "m".to_string(),
            permission: "p".to_string(),
        };
        assert_eq!(evaluate_local(&user(true, "x", &[]), &rule), None);
    }

    struct FixedAuthority {
        allow: bool,
    }

    impl Authority for FixedAuthority {
        async fn refresh_current_user(&self) -> Result<Option<UserRecord>, crate::Error> {
            Ok(None)
        }

        async fn check_permission(&self, _module: &str, _permission: &str) -> bool {
            self.allow
        }
    }

    #[tokio::test]
    async fn evaluate_delegates_permission_rules() {
        let rule = Rule::RequirePermission {
            module: "m".to_string(),
            permission: "p".to_string(),
        };
        let allow = evaluate(&FixedAuthority { allow: true }, None, &rule).await;
        let deny = evaluate(&FixedAuthority { allow: false }, None, &rule).await;
        assert_eq!(allow, VisibilityOutcome::new(true, Reason::Permission));
        assert_eq!(deny, VisibilityOutcome::denied(Reason::Permission));
    }

    #[tokio::test]
    async fn evaluate_without_user_denies() {
        let authority = FixedAuthority { allow: true };
        let rule = Rule::ShowForProfiles {
            profiles: set(&["gestor"]),
        };
        let outcome = evaluate(&authority, None, &rule).await;
        assert_eq!(outcome, VisibilityOutcome::denied(Reason::Whitelist));
    }
}
