//! # Auth Commands
//!
//! Sign-in, sign-out and changing one's own password. These need no
//! section capability; everything else does.

use invpro_core::{CoreError, LogAction, NewActivity, Section};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::state::{Actor, Session};
use crate::App;

/// Verifies credentials and registers a new session.
///
/// Unknown usernames and wrong passwords fail the same way.
pub async fn login(app: &App, username: &str, password: &str) -> AppResult<Session> {
    debug!(username = %username.trim(), "login command");
    let db = app.db.inner();

    let user = match db.users().authenticate(username, password).await {
        Ok(user) => user,
        Err(e) => {
            warn!(username = %username.trim(), "Login failed");
            return Err(e.into());
        }
    };
    let role = db.roles().get(user.role_id).await?;

    db.activity()
        .log(&NewActivity::new(
            &user.username,
            LogAction::Login,
            Section::Users,
            "Logged in",
        ))
        .await?;

    let session = Session::start(&user);
    app.sessions.insert(&session);

    info!(username = %user.username, role = %role.name, "User logged in");
    Ok(session)
}

/// Ends a session. Later commands with it fail with `SessionExpired`.
pub async fn logout(app: &App, session: Session) -> AppResult<()> {
    debug!(username = %session.username(), "logout command");

    if !app.sessions.remove(session.id()) {
        return Err(AppError::session_expired());
    }

    app.db
        .inner()
        .activity()
        .log(&NewActivity::new(
            session.username(),
            LogAction::Logout,
            Section::Users,
            "Logged out",
        ))
        .await?;

    info!(username = %session.username(), "User logged out");
    Ok(())
}

/// Changes the signed-in user's password after re-checking the old one.
pub async fn change_own_password(
    app: &App,
    session: &Session,
    old_password: &str,
    new_password: &str,
) -> AppResult<()> {
    debug!(username = %session.username(), "change_own_password command");
    let actor = app.actor(session).await?;
    let users = app.db.inner().users();

    let user = users
        .authenticate(&actor.username, old_password)
        .await
        .map_err(|_| CoreError::InvalidCredentials)?;

    users
        .set_password(user.id, new_password, &actor.username, Section::Users)
        .await?;

    info!(username = %actor.username, "Password changed");
    Ok(())
}

/// The signed-in user with their current role and permissions.
///
/// Called after a `PermissionsUpdated` event to redraw what the user sees.
pub async fn current_user(app: &App, session: &Session) -> AppResult<Actor> {
    app.actor(session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use invpro_core::{ActivityFilter, Capability, PermissionSet};

    #[tokio::test]
    async fn test_login_logs_activity() {
        let (app, _dir) = testing::app().await;

        let session = login(&app, "admin", "admin").await.unwrap();
        let actor = current_user(&app, &session).await.unwrap();
        assert_eq!(actor.role_name, "Administrator");
        assert!(actor.can(Section::Backup, Capability::Extra));

        let entries = app
            .db
            .inner()
            .activity()
            .list(&ActivityFilter {
                action: Some(LogAction::Login),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user, "admin");

        logout(&app, session).await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let (app, _dir) = testing::app().await;

        let wrong = login(&app, "admin", "nope").await.unwrap_err();
        let unknown = login(&app, "ghost", "admin").await.unwrap_err();

        assert_eq!(wrong.code, ErrorCode::InvalidCredentials);
        assert_eq!(wrong.message, unknown.message);
    }

    #[tokio::test]
    async fn test_change_own_password() {
        let (app, _dir) = testing::app().await;
        let session = testing::admin(&app).await;

        let err = change_own_password(&app, &session, "wrong", "n3w-pass")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);

        change_own_password(&app, &session, "admin", "n3w-pass").await.unwrap();
        assert!(login(&app, "admin", "admin").await.is_err());
        assert!(login(&app, "admin", "n3w-pass").await.is_ok());
    }

    #[tokio::test]
    async fn test_logged_out_session_rejected() {
        let (app, _dir) = testing::app().await;
        let session = testing::admin(&app).await;
        let kept = session.clone();

        logout(&app, session).await.unwrap();

        let err = current_user(&app, &kept).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
        let err = change_own_password(&app, &kept, "admin", "n3w-pass")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
        assert_eq!(logout(&app, kept).await.unwrap_err().code, ErrorCode::SessionExpired);
        assert!(app.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_self_made_session_rejected() {
        let (app, _dir) = testing::app().await;
        let _admin = testing::admin(&app).await;
        let user = app.db.inner().users().authenticate("admin", "admin").await.unwrap();

        // Same user as a live session, but never issued by login
        let minted = Session::start(&user);
        let err = crate::commands::users::list_users(&app, &minted)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionExpired);
        assert_eq!(logout(&app, minted).await.unwrap_err().code, ErrorCode::SessionExpired);
        assert_eq!(app.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_current_user_picks_up_new_permissions() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let clerk = testing::user_with(
            &app,
            &admin,
            "clerk",
            PermissionSet::none().with(Section::Items, Capability::View),
        )
        .await;
        let before = current_user(&app, &clerk).await.unwrap();
        assert!(!before.can(Section::Sales, Capability::Add));

        let granted = before.permissions.clone().with(Section::Sales, Capability::Add);
        crate::commands::roles::update_role_permissions(&app, &admin, before.role_id, &granted)
            .await
            .unwrap();

        let after = current_user(&app, &clerk).await.unwrap();
        assert_eq!(after.user_id, clerk.user_id());
        assert!(after.can(Section::Sales, Capability::Add));
    }
}
