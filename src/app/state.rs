//! Application-wide state: who is logged in and how things are displayed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::i18n::Language;
use crate::storage::{KeyValueStore, LANGUAGE_KEY, THEME_KEY};
use crate::types::UserRecord;

/// Visual theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

/// Display preferences. Survive logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
}

impl Preferences {
    /// Read preferences, falling back to defaults for missing or unknown
    /// values.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            language: store
                .get(LANGUAGE_KEY)
                .and_then(|code| code.parse().ok())
                .unwrap_or_default(),
            theme: store
                .get(THEME_KEY)
                .and_then(|name| name.parse().ok())
                .unwrap_or_default(),
        }
    }

    pub fn persist(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.apply(&[
            (LANGUAGE_KEY, Some(self.language.code())),
            (THEME_KEY, Some(self.theme.name())),
        ])
    }
}

/// Something that happened to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// A stored credential resolved to this user at startup.
    SessionRestored(UserRecord),
    /// No usable stored credential at startup.
    SessionMissing,
    LoggedIn(UserRecord),
    LoggedOut,
    LanguageSelected(Language),
    ThemeSelected(Theme),
    ThemeToggled,
}

/// Root state handed to the UI layer.
///
/// Only changes through [`AppState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    user: Option<UserRecord>,
    preferences: Preferences,
    loading_user: bool,
}

impl AppState {
    /// Initial state while the stored session is being checked.
    pub fn new(preferences: Preferences) -> Self {
        Self {
            user: None,
            preferences,
            loading_user: true,
        }
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn language(&self) -> Language {
        self.preferences.language
    }

    pub fn theme(&self) -> Theme {
        self.preferences.theme
    }

    pub fn is_loading_user(&self) -> bool {
        self.loading_user
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Full name if known, else username.
    pub fn greeting_name(&self) -> Option<&str> {
        self.user.as_ref().map(UserRecord::display_name)
    }

    /// Next state after `event`.
    #[must_use]
    pub fn apply(self, event: AppEvent) -> Self {
        match event {
            AppEvent::SessionRestored(user) | AppEvent::LoggedIn(user) => Self {
                user: Some(user),
                loading_user: false,
                ..self
            },
            AppEvent::SessionMissing | AppEvent::LoggedOut => Self {
                user: None,
                loading_user: false,
                ..self
            },
            AppEvent::LanguageSelected(language) => Self {
                preferences: Preferences {
                    language,
                    ..self.preferences
                },
                ..self
            },
            AppEvent::ThemeSelected(theme) => Self {
                preferences: Preferences {
                    theme,
                    ..self.preferences
                },
                ..self
            },
            AppEvent::ThemeToggled => Self {
                preferences: Preferences {
                    theme: self.preferences.theme.toggled(),
                    ..self.preferences
                },
                ..self
            },
        }
    }
}
