//! # User Commands

use invpro_core::catalog::NewUser;
use invpro_core::{Capability, Section, User};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

pub async fn list_users(app: &App, session: &Session) -> AppResult<Vec<User>> {
    app.authorize(session, Section::Users, Capability::View).await?;
    Ok(app.db.inner().users().list().await?)
}

pub async fn create_user(app: &App, session: &Session, input: &NewUser) -> AppResult<User> {
    debug!(username = %input.username, "create_user command");
    let actor = app.authorize(session, Section::Users, Capability::Add).await?;

    let user = app.db.inner().users().create(input, &actor.username).await?;

    app.events
        .publish(AppEvent::data_changed(Section::Users, ChangeKind::Created));
    info!(user_id = %user.id, username = %user.username, "User created");
    Ok(user)
}

/// Changes full name and role.
pub async fn update_user(
    app: &App,
    session: &Session,
    user_id: i64,
    full_name: &str,
    role_id: i64,
) -> AppResult<User> {
    debug!(user_id = %user_id, role_id = %role_id, "update_user command");
    let actor = app.authorize(session, Section::Users, Capability::Edit).await?;

    let user = app
        .db
        .inner()
        .users()
        .update(user_id, full_name, role_id, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Users, ChangeKind::Updated));
    info!(user_id = %user.id, "User updated");
    Ok(user)
}

/// Sets another user's password without knowing the old one.
pub async fn reset_password(
    app: &App,
    session: &Session,
    user_id: i64,
    new_password: &str,
) -> AppResult<()> {
    debug!(user_id = %user_id, "reset_password command");
    let actor = app.authorize(session, Section::Users, Capability::Edit).await?;

    app.db
        .inner()
        .users()
        .set_password(user_id, new_password, &actor.username, Section::Users)
        .await?;

    info!(user_id = %user_id, "Password reset");
    Ok(())
}

/// Deletes an account and ends its sessions. Nobody can delete the account
/// they are signed in with.
pub async fn delete_user(app: &App, session: &Session, user_id: i64) -> AppResult<()> {
    debug!(user_id = %user_id, "delete_user command");
    let actor = app.authorize(session, Section::Users, Capability::Delete).await?;

    if user_id == actor.user_id {
        return Err(AppError::conflict("You cannot delete your own account"));
    }

    app.db.inner().users().delete(user_id, &actor.username).await?;
    let ended = app.sessions.remove_user(user_id);

    app.events
        .publish(AppEvent::data_changed(Section::Users, ChangeKind::Deleted));
    info!(user_id = %user_id, sessions_ended = ended, "User deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing;
    use invpro_core::PermissionSet;

    #[tokio::test]
    async fn test_user_lifecycle() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let clerk = testing::user_with(&app, &admin, "clerk", PermissionSet::none()).await;
        let role_id = testing::actor(&app, &clerk).await.role_id;

        let updated = update_user(&app, &admin, clerk.user_id(), "Front Desk", role_id)
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Front Desk");

        reset_password(&app, &admin, clerk.user_id(), "fresh-pass").await.unwrap();
        assert!(crate::commands::auth::login(&app, "clerk", "fresh-pass").await.is_ok());

        delete_user(&app, &admin, clerk.user_id()).await.unwrap();
        assert_eq!(list_users(&app, &admin).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_user_session_rejected() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let clerk = testing::user_with(&app, &admin, "clerk", PermissionSet::all()).await;
        let second = crate::commands::auth::login(&app, "clerk", "password1").await.unwrap();
        assert!(list_users(&app, &clerk).await.is_ok());

        delete_user(&app, &admin, clerk.user_id()).await.unwrap();

        for session in [&clerk, &second] {
            let err = list_users(&app, session).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::SessionExpired);
        }
        assert_eq!(app.sessions.len(), 1);
        assert!(list_users(&app, &admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_role_change_applies_to_live_session() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let clerk = testing::user_with(
            &app,
            &admin,
            "clerk",
            PermissionSet::none().with(Section::Users, Capability::View),
        )
        .await;
        let admin_role = testing::actor(&app, &admin).await.role_id;

        let temp = NewUser {
            username: "temp".to_string(),
            password: "password1".to_string(),
            full_name: String::new(),
            role_id: admin_role,
        };
        let err = create_user(&app, &clerk, &temp).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        update_user(&app, &admin, clerk.user_id(), "clerk", admin_role)
            .await
            .unwrap();

        let current = testing::actor(&app, &clerk).await;
        assert_eq!(current.role_name, "Administrator");
        assert!(create_user(&app, &clerk, &temp).await.is_ok());
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;

        let err = delete_user(&app, &admin, admin.user_id()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;

        let err = create_user(
            &app,
            &admin,
            &NewUser {
                username: "admin".to_string(),
                password: "whatever".to_string(),
                full_name: String::new(),
                role_id: testing::actor(&app, &admin).await.role_id,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_view_only_cannot_create() {
        let (app, _dir) = testing::app().await;
        let admin = testing::admin(&app).await;
        let viewer = testing::user_with(
            &app,
            &admin,
            "viewer",
            PermissionSet::none().with(Section::Users, Capability::View),
        )
        .await;

        assert_eq!(list_users(&app, &viewer).await.unwrap().len(), 2);

        let err = create_user(
            &app,
            &viewer,
            &NewUser {
                username: "sneaky".to_string(),
                password: "password".to_string(),
                full_name: String::new(),
                role_id: testing::actor(&app, &viewer).await.role_id,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(list_users(&app, &viewer).await.unwrap().len(), 2);
    }
}
