//! # Role Commands
//!
//! Permission changes take effect on the next command of every session
//! holding the role. `PermissionsUpdated` tells the presentation layer to
//! redraw with [`current_user`](super::auth::current_user).

use invpro_core::{Capability, PermissionSet, Role, Section};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::state::{AppEvent, ChangeKind, Session};
use crate::App;

pub async fn list_roles(app: &App, session: &Session) -> AppResult<Vec<Role>> {
    app.authorize(session, Section::Roles, Capability::View).await?;
    Ok(app.db.inner().roles().list().await?)
}

pub async fn create_role(
    app: &App,
    session: &Session,
    name: &str,
    permissions: &PermissionSet,
) -> AppResult<Role> {
    debug!(name = %name, "create_role command");
    let actor = app.authorize(session, Section::Roles, Capability::Add).await?;

    let role = app
        .db
        .inner()
        .roles()
        .create(name, permissions, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Roles, ChangeKind::Created));
    info!(role_id = %role.id, name = %role.name, "Role created");
    Ok(role)
}

pub async fn update_role_permissions(
    app: &App,
    session: &Session,
    role_id: i64,
    permissions: &PermissionSet,
) -> AppResult<Role> {
    debug!(role_id = %role_id, "update_role_permissions command");
    let actor = app.authorize(session, Section::Roles, Capability::Edit).await?;

    let role = app
        .db
        .inner()
        .roles()
        .update_permissions(role_id, permissions, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Roles, ChangeKind::Updated));
    app.events.publish(AppEvent::PermissionsUpdated { role_id });
    info!(role_id = %role_id, "Role permissions updated");
    Ok(role)
}

pub async fn rename_role(app: &App, session: &Session, role_id: i64, name: &str) -> AppResult<Role> {
    debug!(role_id = %role_id, name = %name, "rename_role command");
    let actor = app.authorize(session, Section::Roles, Capability::Edit).await?;

    let role = app
        .db
        .inner()
        .roles()
        .rename(role_id, name, &actor.username)
        .await?;

    app.events
        .publish(AppEvent::data_changed(Section::Roles, ChangeKind::Updated));
    Ok(role)
}

/// Deletes a role. Rejected while any user holds it.
pub async fn delete_role(app: &App, session: &Session, role_id: i64) -> AppResult<()> {
    debug!(role_id = %role_id, "delete_role command");
    let actor = app.authorize(session, Section::Roles, Capability::Delete).await?;

    app.db.inner().roles().delete(role_id, &actor.username).await?;

    app.events
        .publish(AppEvent::data_changed(Section::Roles, ChangeKind::Deleted));
    info!(role_id = %role_id, "Role deleted");
    Ok(())
}
