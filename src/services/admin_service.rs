use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::admin::UserList,
    entity::{
        Users,
        users::{ActiveModel as UserActive, Column as UserCol, Role},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    routes::params::UserListQuery,
    services::auth_service::user_from_entity,
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    caller: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(caller)?;
    let (page, page_size, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::FullName).ilike(pattern.clone()))
                .add(Expr::col(UserCol::PhoneNumber).ilike(pattern)),
        );
    }
    if let Some(role) = query.role {
        condition = condition.add(UserCol::Role.eq(role));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);

    let total = finder.clone().count(&*state.orm).await? as i64;

    let items = finder
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect();

    let meta = Meta::new(page, page_size, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn update_user_role(
    state: &AppState,
    caller: &AuthUser,
    id: Uuid,
    role: Role,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(caller)?;

    let existing = Users::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = existing.into();
    active.role = Set(role);
    let user = active.update(&*state.orm).await?;

    tracing::info!(user_id = %user.id, role = ?role, "user role updated");

    Ok(ApiResponse::success(
        "Role updated",
        user_from_entity(user),
        Some(Meta::empty()),
    ))
}

/// Admins cannot delete their own account; everything else cascades to the
/// cart while orders keep their snapshot with a detached user.
pub async fn delete_user(
    state: &AppState,
    caller: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(caller)?;

    if id == caller.user_id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".into(),
        ));
    }

    let result = Users::delete_by_id(id).exec(&*state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id = %id, "user deleted");

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
