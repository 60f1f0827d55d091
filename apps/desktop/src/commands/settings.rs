//! # Settings Commands
//!
//! Saving publishes `SettingsSaved`; the backup scheduler listens for it and
//! rebuilds its interval.

use invpro_core::{Capability, LogAction, NewActivity, Section};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::state::{Session, Settings};
use crate::App;

pub async fn get_settings(app: &App, session: &Session) -> AppResult<Settings> {
    app.authorize(session, Section::Settings, Capability::View).await?;
    app.settings.load()
}

/// Validates and saves the whole settings document.
pub async fn update_settings(app: &App, session: &Session, settings: Settings) -> AppResult<Settings> {
    debug!(
        auto_backup = settings.auto_backup,
        interval_hours = settings.auto_backup_interval,
        "update_settings command"
    );
    let actor = app.authorize(session, Section::Settings, Capability::Edit).await?;

    let saved = app.settings.replace(settings)?;

    app.db
        .inner()
        .activity()
        .log(&NewActivity::new(
            &actor.username,
            LogAction::SettingsChange,
            Section::Settings,
            format!(
                "Settings saved (auto-backup {}, every {}h)",
                if saved.auto_backup { "on" } else { "off" },
                saved.auto_backup_interval
            ),
        ))
        .await?;

    info!(user = %actor.username, "Settings saved");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::AppEvent;
    use crate::testing;
    use invpro_core::{ActivityFilter, PermissionSet};

    #[tokio::test]
    async fn test_update_round_trips_and_publishes() {
        let (app, dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let mut sub = app.events.subscribe();

        let saved = update_settings(
            &app,
            &admin,
            Settings {
                company_name: "Acme Trading".to_string(),
                backup_path: dir.path().join("backups").display().to_string(),
                auto_backup: true,
                auto_backup_interval: 12,
                ..Settings::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(get_settings(&app, &admin).await.unwrap(), saved);
        assert_eq!(sub.try_recv(), Some(AppEvent::SettingsSaved));

        let logged = app
            .db
            .inner()
            .activity()
            .list(&ActivityFilter {
                action: Some(LogAction::SettingsChange),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(logged.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_settings_not_saved() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;

        let err = update_settings(
            &app,
            &admin,
            Settings {
                auto_backup: true,
                backup_path: String::new(),
                ..Settings::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(get_settings(&app, &admin).await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_view_only_cannot_save() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let viewer = testing::user_with(
            &app,
            &admin,
            "viewer",
            PermissionSet::none().with(Section::Settings, Capability::View),
        )
        .await;

        let err = update_settings(&app, &viewer, Settings::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }
}
