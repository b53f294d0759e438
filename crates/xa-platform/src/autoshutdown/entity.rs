//! Workspace Auto-Shutdown Entities

use bson::{Bson, Document};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;

use crate::shared::api_common::string_or_number;

/// Central config keys (namespace `common`)
pub mod config_keys {
    pub const NAMESPACE: &str = "common";
    pub const AUTO_SHUTDOWN_ENABLED: &str = "com.cerebro.domino.workspaceAutoShutdown.isEnabled";
    pub const GLOBAL_MAX_LIFETIME: &str =
        "com.cerebro.domino.workspaceAutoShutdown.globalMaximumLifetimeInSeconds";
    pub const GLOBAL_DEFAULT_LIFETIME: &str =
        "com.cerebro.domino.workspaceAutoShutdown.globalDefaultLifetimeInSeconds";
    pub const NOTIFICATIONS_ENABLED: &str = "com.cerebro.domino.workloadNotifications.isEnabled";
    pub const NOTIFICATION_PERIOD: &str =
        "com.cerebro.domino.workloadNotifications.longRunningWorkloadDefinitionInSeconds";
}

/// `userPreferences` field names
pub mod preference_fields {
    pub const USER_ID: &str = "userId";
    pub const ENABLE_AUTO_SHUTDOWN: &str = "enableWorkspaceAutoShutdown";
    pub const MAX_LIFETIME: &str = "maximumWorkspaceLifetimeInSeconds";
    pub const ENABLE_SESSION_NOTIFICATIONS: &str = "enableSessionNotifications";
    pub const SESSION_NOTIFICATION_PERIOD: &str = "sessionNotificationPeriod";
    pub const NOTIFY_COLLABORATOR_ADDITIONS: &str = "notifyAboutCollaboratorAdditions";
}

pub const UPDATED_MESSAGE: &str = "Workspace Shutdown Durations Updated";

/// Platform-wide auto-shutdown settings. Missing keys read as false / 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoShutdownSettings {
    pub enabled: bool,
    pub max_lifetime: i64,
    pub default_lifetime: i64,
    pub notifications_enabled: bool,
    pub notification_period: i64,
}

/// Why a bulk apply made no changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    Disabled,
    DefaultNotSet,
    DefaultExceedsMax,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::Disabled => write!(
                f,
                "{} is False. No changes made",
                config_keys::AUTO_SHUTDOWN_ENABLED
            ),
            NoOpReason::DefaultNotSet => write!(
                f,
                "{} not set. No changes made",
                config_keys::GLOBAL_DEFAULT_LIFETIME
            ),
            NoOpReason::DefaultExceedsMax => write!(
                f,
                "{} is greater than {}. No changes made",
                config_keys::GLOBAL_DEFAULT_LIFETIME,
                config_keys::GLOBAL_MAX_LIFETIME
            ),
        }
    }
}

impl NoOpReason {
    /// Wording sent by earlier releases. The first two name the notification
    /// keys rather than the settings actually checked; callers match on it.
    pub fn legacy_message(&self) -> &'static str {
        match self {
            NoOpReason::Disabled => {
                "com.cerebro.domino.workloadNotifications.isEnabled is False. No changes made"
            }
            NoOpReason::DefaultNotSet => {
                "com.cerebro.domino.workloadNotifications.defaultPeriodInSeconds not set. No changes made"
            }
            NoOpReason::DefaultExceedsMax => {
                "com.cerebro.domino.workspaceAutoShutdown.globalDefaultLifetimeInSeconds is greater than \
                 com.cerebro.domino.workspaceAutoShutdown.globalMaximumLifetimeInSeconds. No changes made"
            }
        }
    }
}

impl AutoShutdownSettings {
    /// Settings must enable auto-shutdown with a usable default before any
    /// user preference is touched.
    pub fn check(&self) -> Result<(), NoOpReason> {
        if !self.enabled {
            Err(NoOpReason::Disabled)
        } else if self.default_lifetime == 0 {
            Err(NoOpReason::DefaultNotSet)
        } else if self.default_lifetime > self.max_lifetime {
            Err(NoOpReason::DefaultExceedsMax)
        } else {
            Ok(())
        }
    }
}

/// Bulk apply payload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AutoShutdownRequest {
    /// Login id to lifetime in seconds. Values may be numbers or numeric strings.
    /// A negative lifetime removes the user's preferences.
    #[serde(default, deserialize_with = "string_or_number::deserialize_i64_map")]
    #[schema(value_type = HashMap<String, i64>)]
    pub users: HashMap<String, i64>,

    /// Apply the global default to users not listed in `users`
    #[serde(default)]
    pub override_to_default: bool,
}

/// A user joined with its preference records.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPreferenceSnapshot {
    /// `users._id`, used verbatim as `userPreferences.userId`
    pub user_id: Bson,
    pub login_id: String,
    /// Whether any preference document exists for the user
    pub has_preferences: bool,
}

/// Preference fields written for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceUpdate {
    pub user_id: Bson,
    pub enable_auto_shutdown: bool,
    /// Written only when positive
    pub max_lifetime: Option<i64>,
    /// Notification period, written when session notifications are enabled
    pub session_notification_period: Option<i64>,
    /// First-time users get collaborator notifications on
    pub notify_collaborator_additions: bool,
}

impl PreferenceUpdate {
    pub fn filter(&self) -> Document {
        user_filter(&self.user_id)
    }

    /// Body of the `$set` for the upsert.
    pub fn to_set_document(&self) -> Document {
        use preference_fields::*;

        let mut set = user_filter(&self.user_id);
        set.insert(ENABLE_AUTO_SHUTDOWN, self.enable_auto_shutdown);
        if let Some(lifetime) = self.max_lifetime {
            set.insert(MAX_LIFETIME, lifetime);
        }
        if let Some(period) = self.session_notification_period {
            set.insert(ENABLE_SESSION_NOTIFICATIONS, true);
            set.insert(SESSION_NOTIFICATION_PERIOD, period);
        }
        if self.notify_collaborator_additions {
            set.insert(NOTIFY_COLLABORATOR_ADDITIONS, true);
        }
        set
    }
}

/// Filter selecting a user's preference document.
pub fn user_filter(user_id: &Bson) -> Document {
    let mut filter = Document::new();
    filter.insert(preference_fields::USER_ID, user_id.clone());
    filter
}

/// What to do with one user's preferences.
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceAction {
    /// Not listed and no default override requested
    Unchanged,
    Delete { user_id: Bson },
    Upsert(PreferenceUpdate),
}
