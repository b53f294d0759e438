//! Auto-shutdown policy: decides and applies per-user preference changes.

use tracing::{debug, info};

use crate::autoshutdown::entity::{
    AutoShutdownRequest, AutoShutdownSettings, NoOpReason, PreferenceAction, PreferenceUpdate,
    UserPreferenceSnapshot, UPDATED_MESSAGE,
};
use crate::autoshutdown::repository::AutoShutdownStore;
use crate::shared::error::Result;

/// Result of a bulk apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub message: String,
    /// Set when the central config stopped the run before any write
    pub skipped: Option<NoOpReason>,
    pub upserted: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

/// Decide what happens to one user's preferences.
///
/// The lifetime is the user's explicit value if listed, else the global
/// default when `override_to_default` is set. Users matching neither are left
/// alone.
pub fn plan_for_user(
    settings: &AutoShutdownSettings,
    request: &AutoShutdownRequest,
    user: &UserPreferenceSnapshot,
) -> PreferenceAction {
    let lifetime = match request.users.get(&user.login_id) {
        Some(&explicit) => explicit,
        None if request.override_to_default => settings.default_lifetime,
        None => return PreferenceAction::Unchanged,
    };

    if lifetime < 0 {
        return PreferenceAction::Delete {
            user_id: user.user_id.clone(),
        };
    }

    PreferenceAction::Upsert(PreferenceUpdate {
        user_id: user.user_id.clone(),
        enable_auto_shutdown: settings.enabled,
        max_lifetime: (lifetime > 0).then_some(lifetime),
        session_notification_period: settings
            .notifications_enabled
            .then_some(settings.notification_period),
        notify_collaborator_additions: !user.has_preferences,
    })
}

/// Push auto-shutdown durations to every user.
///
/// Nothing is written unless the central config enables auto-shutdown with a
/// default no larger than the maximum. Writes are not transactional; a
/// failure part way leaves earlier users updated.
pub async fn apply_rules(
    store: &dyn AutoShutdownStore,
    request: &AutoShutdownRequest,
) -> Result<ApplyOutcome> {
    let settings = store.settings().await?;
    debug!(?settings, "Collected auto-shutdown values from central config");

    if let Err(reason) = settings.check() {
        info!(%reason, "Auto-shutdown rules not applied");
        return Ok(ApplyOutcome {
            message: reason.to_string(),
            skipped: Some(reason),
            ..ApplyOutcome::default()
        });
    }

    let mut outcome = ApplyOutcome {
        message: UPDATED_MESSAGE.to_string(),
        ..ApplyOutcome::default()
    };

    for user in store.users_with_preferences().await? {
        match plan_for_user(&settings, request, &user) {
            PreferenceAction::Unchanged => {
                debug!(login_id = %user.login_id, "Do not override user");
                outcome.unchanged += 1;
            }
            PreferenceAction::Delete { user_id } => {
                let deleted = store.delete_preferences(&user_id).await?;
                info!(login_id = %user.login_id, deleted, "Deleted auto-shutdown preferences");
                outcome.deleted += 1;
            }
            PreferenceAction::Upsert(update) => {
                store.upsert_preferences(&update).await?;
                info!(
                    login_id = %user.login_id,
                    lifetime = ?update.max_lifetime,
                    "Upserted auto-shutdown preferences"
                );
                outcome.upserted += 1;
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;
    use std::collections::HashMap;

    fn settings() -> AutoShutdownSettings {
        AutoShutdownSettings {
            enabled: true,
            max_lifetime: 86_400,
            default_lifetime: 3_600,
            notifications_enabled: false,
            notification_period: 0,
        }
    }

    fn user(login: &str, has_preferences: bool) -> UserPreferenceSnapshot {
        UserPreferenceSnapshot {
            user_id: Bson::String(format!("id-{}", login)),
            login_id: login.to_string(),
            has_preferences,
        }
    }

    fn request(users: &[(&str, i64)], override_to_default: bool) -> AutoShutdownRequest {
        AutoShutdownRequest {
            users: users
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
            override_to_default,
        }
    }

    #[test]
    fn test_explicit_override() {
        let action = plan_for_user(&settings(), &request(&[("alice", 500)], false), &user("alice", true));
        match action {
            PreferenceAction::Upsert(update) => {
                assert_eq!(update.max_lifetime, Some(500));
                assert!(!update.notify_collaborator_additions);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_unlisted_user_unchanged_without_default_override() {
        let action = plan_for_user(&settings(), &request(&[], false), &user("bob", true));
        assert_eq!(action, PreferenceAction::Unchanged);
    }

    #[test]
    fn test_default_override_applies_global_default() {
        let action = plan_for_user(&settings(), &request(&[], true), &user("bob", false));
        match action {
            PreferenceAction::Upsert(update) => {
                assert_eq!(update.max_lifetime, Some(3_600));
                assert!(update.notify_collaborator_additions);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_negative_lifetime_deletes() {
        let action = plan_for_user(&settings(), &request(&[("carol", -1)], true), &user("carol", true));
        assert_eq!(
            action,
            PreferenceAction::Delete {
                user_id: Bson::String("id-carol".into())
            }
        );
    }

    #[test]
    fn test_zero_lifetime_omits_maximum() {
        let action = plan_for_user(&settings(), &request(&[("dave", 0)], false), &user("dave", true));
        match action {
            PreferenceAction::Upsert(update) => assert_eq!(update.max_lifetime, None),
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_notifications_period_included_when_enabled() {
        let mut s = settings();
        s.notifications_enabled = true;
        s.notification_period = 1_800;

        let action = plan_for_user(&s, &request(&[("erin", 60)], false), &user("erin", true));
        match action {
            PreferenceAction::Upsert(update) => {
                assert_eq!(update.session_notification_period, Some(1_800))
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }
}
