use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        CartItems, Categories, Collections, OrderItems, ProductTags, Products, Tags,
        cart_items::Column as CartItemCol,
        categories, collections,
        order_items::Column as OrderItemCol,
        product_tags::{ActiveModel as ProductTagActive, Column as ProductTagCol},
        products::{ActiveModel as ProductActive, Column as ProdCol, Model as ProductModel},
        tags::{ActiveModel as TagActive, Column as TagCol, Model as TagModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Collection, Product, Tag},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, page_size, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(category_id) = query.category_id {
        condition = condition.add(ProdCol::CategoryId.eq(category_id));
    }

    if let Some(collection_id) = query.collection_id {
        condition = condition.add(ProdCol::CollectionId.eq(collection_id));
    }

    if let Some(tag_name) = query.tag.as_ref().filter(|t| !t.is_empty()) {
        // Join-by-hand: resolve the tag, then restrict to its product ids.
        let tag = Tags::find()
            .filter(TagCol::Name.eq(tag_name.clone()))
            .one(&*state.orm)
            .await?;
        let Some(tag) = tag else {
            let meta = Meta::new(page, page_size, 0);
            return Ok(ApiResponse::success(
                "Products",
                ProductList { items: vec![] },
                Some(meta),
            ));
        };
        let product_ids: Vec<Uuid> = ProductTags::find()
            .filter(ProductTagCol::TagId.eq(tag.id))
            .all(&*state.orm)
            .await?
            .into_iter()
            .map(|pt| pt.product_id)
            .collect();
        if product_ids.is_empty() {
            let meta = Meta::new(page, page_size, 0);
            return Ok(ApiResponse::success(
                "Products",
                ProductList { items: vec![] },
                Some(meta),
            ));
        }
        condition = condition.add(ProdCol::Id.is_in(product_ids));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ProdCol::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ProdCol::Price.lte(max_price));
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ProdCol::Description).ilike(pattern)),
        );
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Asc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
        ProductSortBy::Price => ProdCol::Price,
        ProductSortBy::Name => ProdCol::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&*state.orm).await? as i64;

    let rows = finder
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?;

    let items = hydrate_products(&*state.orm, rows).await?;

    let meta = Meta::new(page, page_size, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let row = Products::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut items = hydrate_products(&*state.orm, vec![row]).await?;
    let product = items
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("hydration dropped a product")))?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_price_and_stock(payload.price, payload.stock)?;
    verify_associations(&*state.orm, payload.category_id, payload.collection_id).await?;

    let txn = state.orm.begin().await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        collection_id: Set(payload.collection_id),
        image_url: Set(payload.image_url),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    attach_tags(&txn, product.id, &payload.tags).await?;

    txn.commit().await?;

    tracing::info!(product_id = %product.id, "product created");

    let mut items = hydrate_products(&*state.orm, vec![product]).await?;
    let product = items
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("hydration dropped a product")))?;
    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.price.is_some_and(|p| p <= 0) {
        return Err(AppError::Validation("price must be greater than 0".into()));
    }
    if payload.stock.is_some_and(|s| s < 0) {
        return Err(AppError::Validation("stock must be non-negative".into()));
    }
    verify_associations(&*state.orm, payload.category_id, payload.collection_id).await?;

    let existing = Products::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;

    if let Some(tags) = &payload.tags {
        ProductTags::delete_many()
            .filter(ProductTagCol::ProductId.eq(id))
            .exec(&txn)
            .await?;
        attach_tags(&txn, id, tags).await?;
    }

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if payload.category_id.is_some() {
        active.category_id = Set(payload.category_id);
    }
    if payload.collection_id.is_some() {
        active.collection_id = Set(payload.collection_id);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;

    txn.commit().await?;

    let mut items = hydrate_products(&*state.orm, vec![product]).await?;
    let product = items
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("hydration dropped a product")))?;
    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let ordered = OrderItems::find()
        .filter(OrderItemCol::ProductId.eq(id))
        .count(&*state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Product is referenced by existing orders".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    ProductTags::delete_many()
        .filter(ProductTagCol::ProductId.eq(id))
        .exec(&txn)
        .await?;
    CartItems::delete_many()
        .filter(CartItemCol::ProductId.eq(id))
        .exec(&txn)
        .await?;
    let result = Products::delete_by_id(id).exec(&txn).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Look up a tag by name, creating it when missing. Names are never duplicated.
pub async fn get_or_create_tag<C: ConnectionTrait>(conn: &C, name: &str) -> AppResult<TagModel> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("tag name must not be empty".into()));
    }

    if let Some(tag) = Tags::find().filter(TagCol::Name.eq(name)).one(conn).await? {
        return Ok(tag);
    }

    let tag = TagActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
    }
    .insert(conn)
    .await?;
    Ok(tag)
}

async fn attach_tags<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    tag_names: &[String],
) -> AppResult<()> {
    for name in tag_names {
        let tag = get_or_create_tag(conn, name).await?;
        ProductTagActive {
            product_id: Set(product_id),
            tag_id: Set(tag.id),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

fn validate_price_and_stock(price: i64, stock: i32) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::Validation("price must be greater than 0".into()));
    }
    if stock < 0 {
        return Err(AppError::Validation("stock must be non-negative".into()));
    }
    Ok(())
}

async fn verify_associations<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<Uuid>,
    collection_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(category_id) = category_id {
        Categories::find_by_id(category_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::BadRequest("category does not exist".into()))?;
    }
    if let Some(collection_id) = collection_id {
        Collections::find_by_id(collection_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::BadRequest("collection does not exist".into()))?;
    }
    Ok(())
}

/// Attach categories, collections, and tags to a page of product rows with
/// three batched lookups instead of per-row queries.
pub async fn hydrate_products<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    let product_ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();

    let category_ids: Vec<Uuid> = rows.iter().filter_map(|p| p.category_id).collect();
    let mut categories_by_id: HashMap<Uuid, categories::Model> = HashMap::new();
    if !category_ids.is_empty() {
        for c in Categories::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(conn)
            .await?
        {
            categories_by_id.insert(c.id, c);
        }
    }

    let collection_ids: Vec<Uuid> = rows.iter().filter_map(|p| p.collection_id).collect();
    let mut collections_by_id: HashMap<Uuid, collections::Model> = HashMap::new();
    if !collection_ids.is_empty() {
        for c in Collections::find()
            .filter(collections::Column::Id.is_in(collection_ids))
            .all(conn)
            .await?
        {
            collections_by_id.insert(c.id, c);
        }
    }

    let mut tags_by_product: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    if !product_ids.is_empty() {
        let links = ProductTags::find()
            .filter(ProductTagCol::ProductId.is_in(product_ids))
            .find_also_related(Tags)
            .all(conn)
            .await?;
        for (link, tag) in links {
            if let Some(tag) = tag {
                tags_by_product
                    .entry(link.product_id)
                    .or_default()
                    .push(tag_from_entity(tag));
            }
        }
    }

    Ok(rows
        .into_iter()
        .map(|model| {
            let category = model
                .category_id
                .and_then(|id| categories_by_id.get(&id))
                .map(|c| category_from_entity(c.clone()));
            let collection = model
                .collection_id
                .and_then(|id| collections_by_id.get(&id))
                .map(|c| collection_from_entity(c.clone()));
            let tags = tags_by_product.remove(&model.id).unwrap_or_default();
            product_from_entity(model, category, collection, tags)
        })
        .collect())
}

pub fn product_from_entity(
    model: ProductModel,
    category: Option<Category>,
    collection: Option<Collection>,
    tags: Vec<Tag>,
) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        category_id: model.category_id,
        collection_id: model.collection_id,
        image_url: model.image_url,
        category,
        collection,
        tags,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn category_from_entity(model: categories::Model) -> Category {
    Category {
        id: model.id,
        name: model.name,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn collection_from_entity(model: collections::Model) -> Collection {
    Collection {
        id: model.id,
        name: model.name,
        description: model.description,
        season: model.season,
        year: model.year,
        image_url: model.image_url,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub fn tag_from_entity(model: TagModel) -> Tag {
    Tag {
        id: model.id,
        name: model.name,
    }
}
