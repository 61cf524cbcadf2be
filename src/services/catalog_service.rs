use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    dto::products::{
        CategoryList, CollectionList, CreateCategoryRequest, CreateCollectionRequest,
        CreateTagRequest, TagList, UpdateCategoryRequest, UpdateCollectionRequest,
        UpdateTagRequest,
    },
    entity::{
        Categories, Collections, ProductTags, Products, Tags,
        categories::{ActiveModel as CategoryActive, Column as CategoryCol},
        collections::{ActiveModel as CollectionActive, Column as CollectionCol},
        product_tags::Column as ProductTagCol,
        products::Column as ProdCol,
        tags::{ActiveModel as TagActive, Column as TagCol},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Collection, Tag},
    response::{ApiResponse, Meta},
    services::product_service::{
        category_from_entity, collection_from_entity, get_or_create_tag, tag_from_entity,
    },
    state::AppState,
};

// --- Categories ---

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        None,
    ))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = Categories::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Category",
        category_from_entity(category),
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }

    let existing = Categories::find()
        .filter(CategoryCol::Name.eq(name.as_str()))
        .one(&*state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Category name already exists".into()));
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        created_at: NotSet,
    }
    .insert(&*state.orm)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "Category name already exists"))?;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let existing = Categories::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    let category = active.update(&*state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let in_use = Products::find()
        .filter(ProdCol::CategoryId.eq(id))
        .count(&*state.orm)
        .await?;
    if in_use > 0 {
        return Err(AppError::ReferentialIntegrity("Category"));
    }

    let result = Categories::delete_by_id(id).exec(&*state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

// --- Collections ---

pub async fn list_collections(state: &AppState) -> AppResult<ApiResponse<CollectionList>> {
    let items = Collections::find()
        .order_by_asc(CollectionCol::Name)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(collection_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "Collections",
        CollectionList { items },
        None,
    ))
}

pub async fn get_collection(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Collection>> {
    let collection = Collections::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Collection",
        collection_from_entity(collection),
        None,
    ))
}

pub async fn create_collection(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }

    let existing = Collections::find()
        .filter(CollectionCol::Name.eq(name.as_str()))
        .one(&*state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Collection name already exists".into()));
    }

    let collection = CollectionActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        season: Set(payload.season),
        year: Set(payload.year),
        image_url: Set(payload.image_url),
        created_at: NotSet,
    }
    .insert(&*state.orm)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "Collection name already exists"))?;

    Ok(ApiResponse::success(
        "Collection created",
        collection_from_entity(collection),
        Some(Meta::empty()),
    ))
}

pub async fn update_collection(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    ensure_admin(user)?;
    let existing = Collections::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CollectionActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(season) = payload.season {
        active.season = Set(Some(season));
    }
    if let Some(year) = payload.year {
        active.year = Set(Some(year));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    let collection = active.update(&*state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        collection_from_entity(collection),
        Some(Meta::empty()),
    ))
}

pub async fn delete_collection(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let in_use = Products::find()
        .filter(ProdCol::CollectionId.eq(id))
        .count(&*state.orm)
        .await?;
    if in_use > 0 {
        return Err(AppError::ReferentialIntegrity("Collection"));
    }

    let result = Collections::delete_by_id(id).exec(&*state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

// --- Tags ---

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items = Tags::find()
        .order_by_asc(TagCol::Name)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();
    Ok(ApiResponse::success("Tags", TagList { items }, None))
}

/// Get-or-create by name, the same helper product writes go through, so an
/// admin can prepare tags before any product carries them.
pub async fn create_tag(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTagRequest,
) -> AppResult<ApiResponse<Tag>> {
    ensure_admin(user)?;
    let tag = get_or_create_tag(&*state.orm, &payload.name).await?;
    Ok(ApiResponse::success(
        "Tag created",
        tag_from_entity(tag),
        Some(Meta::empty()),
    ))
}

pub async fn update_tag(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateTagRequest,
) -> AppResult<ApiResponse<Tag>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }

    let existing = Tags::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let duplicate = Tags::find()
        .filter(TagCol::Name.eq(name.as_str()))
        .filter(TagCol::Id.ne(id))
        .one(&*state.orm)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict("Tag name already exists".into()));
    }

    let mut active: TagActive = existing.into();
    active.name = Set(name);
    let tag = active.update(&*state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        tag_from_entity(tag),
        Some(Meta::empty()),
    ))
}

pub async fn delete_tag(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let in_use = ProductTags::find()
        .filter(ProductTagCol::TagId.eq(id))
        .count(&*state.orm)
        .await?;
    if in_use > 0 {
        return Err(AppError::ReferentialIntegrity("Tag"));
    }

    let result = Tags::delete_by_id(id).exec(&*state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
