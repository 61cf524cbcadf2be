use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, OrderWithItems},
    entity::{
        CartItems, Carts, OrderItems, Orders, Products,
        cart_items::Column as CartItemCol,
        carts::Column as CartCol,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel, OrderStatus,
        },
        products::Model as ProductModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::auth_service::normalize_phone,
    state::AppState,
};

/// Cart-to-order transition. Resolves the item set (explicit list or the
/// caller's cart), snapshots unit prices into order items, and clears the
/// cart — all inside one transaction so a failure leaves nothing behind.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    validate_shipping(&payload)?;
    let phone_number = normalize_phone(&payload.phone_number)?;

    let txn = state.orm.begin().await?;

    let mut resolved: Vec<(ProductModel, i32)> = Vec::new();
    let mut source_cart_id: Option<Uuid> = None;

    match &payload.items {
        Some(inputs) => {
            for input in inputs {
                if input.quantity <= 0 {
                    return Err(AppError::Validation(
                        "item quantity must be greater than 0".into(),
                    ));
                }
                let product = Products::find_by_id(input.product_id)
                    .one(&txn)
                    .await?
                    .ok_or(AppError::NotFound)?;
                resolved.push((product, input.quantity));
            }
        }
        None => {
            let cart = Carts::find()
                .filter(CartCol::UserId.eq(user.user_id))
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::BadRequest("Cart is empty".into()))?;

            let lines = CartItems::find()
                .filter(CartItemCol::CartId.eq(cart.id))
                .find_also_related(Products)
                .all(&txn)
                .await?;
            if lines.is_empty() {
                return Err(AppError::BadRequest("Cart is empty".into()));
            }
            for (line, product) in lines {
                let product = product.ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!("cart line {} has no product", line.id))
                })?;
                resolved.push((product, line.quantity));
            }
            source_cart_id = Some(cart.id);
        }
    }

    if resolved.is_empty() {
        return Err(AppError::BadRequest("No items to order".into()));
    }

    // Snapshot moment: totals and per-line prices are fixed here and never
    // follow later product price changes.
    let total_amount: i64 = resolved
        .iter()
        .map(|(product, quantity)| product.price * *quantity as i64)
        .sum();

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(user.user_id)),
        full_name: Set(payload.full_name.trim().to_string()),
        phone_number: Set(phone_number),
        email: Set(payload.email.trim().to_string()),
        address: Set(payload.address.trim().to_string()),
        city: Set(payload.city.trim().to_string()),
        payment_method: Set(payload.payment_method.clone()),
        status: Set(OrderStatus::Pending),
        total_amount: Set(total_amount),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(resolved.len());
    for (product, quantity) in &resolved {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(*quantity),
            price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        items.push(OrderItem {
            id: item.id,
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            price: item.price,
            product_name: Some(product.name.clone()),
            product_image: product.image_url.clone(),
        });
    }

    if let Some(cart_id) = source_cart_id {
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart_id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    tracing::info!(order_id = %order.id, total_amount, "order created");

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, page_size, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&*state.orm).await? as i64;

    let orders = finder
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?;

    let items = with_items(&*state.orm, orders).await?;
    let meta = Meta::new(page, page_size, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    // Owner or admin only.
    if order.user_id != Some(user.user_id) && ensure_admin(user).is_err() {
        return Err(AppError::Forbidden);
    }

    let mut hydrated = with_items(&*state.orm, vec![order]).await?;
    let order = hydrated
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("hydration dropped an order")))?;
    Ok(ApiResponse::success("OK", order, Some(Meta::empty())))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, page_size, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&*state.orm).await? as i64;

    let orders = finder
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?;

    let items = with_items(&*state.orm, orders).await?;
    let meta = Meta::new(page, page_size, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Admin-only status assignment. Any status may replace any other; only the
/// status *value* is validated, by the closed enum at the boundary.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let existing = Orders::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OrderActive = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&*state.orm).await?;

    tracing::info!(order_id = %order.id, status = ?status, "order status updated");

    let mut hydrated = with_items(&*state.orm, vec![order]).await?;
    let order = hydrated
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("hydration dropped an order")))?;
    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}

fn validate_shipping(payload: &CreateOrderRequest) -> AppResult<()> {
    let fields = [
        ("full_name", &payload.full_name),
        ("email", &payload.email),
        ("address", &payload.address),
        ("city", &payload.city),
        ("payment_method", &payload.payment_method),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{name} must not be empty")));
        }
    }
    Ok(())
}

async fn with_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        let lines = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .find_also_related(Products)
            .all(conn)
            .await?;

        let items = lines
            .into_iter()
            .map(|(item, product)| OrderItem {
                id: item.id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                product_name: product.as_ref().map(|p| p.name.clone()),
                product_image: product.and_then(|p| p.image_url),
            })
            .collect();

        result.push(OrderWithItems {
            order: order_from_entity(order),
            items,
        });
    }
    Ok(result)
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        full_name: model.full_name,
        phone_number: model.phone_number,
        email: model.email,
        address: model.address,
        city: model.city,
        payment_method: model.payment_method,
        status: model.status,
        total_amount: model.total_amount,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::dto::orders::OrderItemInput;
    use crate::entity::{products::Model as Product, users::Role};
    use chrono::{DateTime, FixedOffset};
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, RuntimeErr};

    fn state_with(orm: DatabaseConnection) -> AppState {
        AppState {
            orm: std::sync::Arc::new(orm),
            config: AppConfig {
                database_url: String::new(),
                migrations_dir: "migrations".into(),
                host: "127.0.0.1".into(),
                port: 0,
                jwt_secret: "test-secret".into(),
                token_ttl_days: 7,
                cors_origins: vec![],
                gemini_api_key: None,
                gemini_base_url: String::new(),
            },
            http: reqwest::Client::new(),
        }
    }

    fn shipping(items: Option<Vec<OrderItemInput>>) -> CreateOrderRequest {
        CreateOrderRequest {
            full_name: "Test Customer".into(),
            phone_number: "+14155552671".into(),
            email: "customer@example.com".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            payment_method: "cod".into(),
            items,
        }
    }

    // A failure between the order insert and the item inserts must unwind the
    // whole transaction: no commit, no orphan order row, cart untouched.
    #[tokio::test]
    async fn failed_item_insert_rolls_back_the_order() {
        let product_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let now: DateTime<FixedOffset> = Utc::now().into();

        let product = Product {
            id: product_id,
            name: "Paisley Bandana".into(),
            description: None,
            price: 1500,
            stock: 5,
            category_id: None,
            collection_id: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        let order_row = OrderModel {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            full_name: "Test Customer".into(),
            phone_number: "+14155552671".into(),
            email: "customer@example.com".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            payment_method: "cod".into(),
            status: OrderStatus::Pending,
            total_amount: 3000,
            created_at: now,
            updated_at: now,
        };

        // Product lookup and order insert succeed; the item insert fails.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![product]])
            .append_query_results([vec![order_row]])
            .append_query_errors(vec![DbErr::Query(RuntimeErr::Internal(
                "order item insert failed".into(),
            ))])
            .into_connection();

        let state = state_with(db);
        let user = AuthUser {
            user_id,
            role: Role::User,
        };

        let result = create_order(
            &state,
            &user,
            shipping(Some(vec![OrderItemInput {
                product_id,
                quantity: 2,
            }])),
        )
        .await;
        assert!(matches!(result, Err(AppError::Orm(_))));

        let orm = std::sync::Arc::into_inner(state.orm).expect("no other handles to the mock connection");
        let log = format!("{:?}", orm.into_transaction_log());
        assert!(log.contains(r#"INSERT INTO \"orders\""#));
        assert!(log.contains("ROLLBACK"));
        assert!(!log.contains("COMMIT"));
        assert!(!log.contains("cart_items"));
    }
}
