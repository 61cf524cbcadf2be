use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddCartItemRequest, CartItemDto, CartProduct, CartResponse, UpdateCartItemRequest},
    entity::{
        CartItems, Carts, Products,
        cart_items::{ActiveModel as CartItemActive, Column as CartItemCol},
        carts::{ActiveModel as CartActive, Column as CartCol, Model as CartModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    state::AppState,
};

/// One cart per user, created on first access.
pub async fn get_or_create_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<CartModel> {
    let existing = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?;
    if let Some(cart) = existing {
        return Ok(cart);
    }

    let cart = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(user_id)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(cart)
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartResponse>> {
    let cart = get_or_create_cart(&*state.orm, user.user_id).await?;
    let response = build_cart_response(&*state.orm, cart).await?;
    Ok(ApiResponse::success("OK", response, None))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddCartItemRequest,
) -> AppResult<ApiResponse<CartResponse>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let cart = get_or_create_cart(&txn, user.user_id).await?;

    Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(payload.product_id))
        .one(&txn)
        .await?;

    match existing {
        Some(line) => {
            // Same product lands on the same line; quantities merge.
            let merged = line.quantity + payload.quantity;
            let mut active: CartItemActive = line.into();
            active.quantity = Set(merged);
            active.update(&txn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;

    let response = build_cart_response(&*state.orm, cart).await?;
    Ok(ApiResponse::success("Item added", response, None))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartResponse>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let line = CartItems::find_by_id(item_id)
        .filter(CartItemCol::CartId.eq(cart.id))
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if payload.quantity <= 0 {
        CartItems::delete_by_id(line.id).exec(&*state.orm).await?;
    } else {
        let mut active: CartItemActive = line.into();
        active.quantity = Set(payload.quantity);
        active.update(&*state.orm).await?;
    }

    let response = build_cart_response(&*state.orm, cart).await?;
    Ok(ApiResponse::success("Item updated", response, None))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartResponse>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&*state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let result = CartItems::delete_many()
        .filter(CartItemCol::Id.eq(item_id))
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&*state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    let response = build_cart_response(&*state.orm, cart).await?;
    Ok(ApiResponse::success("Item removed", response, None))
}

pub async fn clear_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&*state.orm)
        .await?;

    if let Some(cart) = cart {
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart.id))
            .exec(&*state.orm)
            .await?;
    }

    Ok(ApiResponse::success("Cart cleared", serde_json::json!({}), None))
}

/// Totals are derived from current line items and current product prices on
/// every read; nothing is stored.
pub async fn build_cart_response<C: ConnectionTrait>(
    conn: &C,
    cart: CartModel,
) -> AppResult<CartResponse> {
    let lines = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .find_also_related(Products)
        .all(conn)
        .await?;

    let mut items = Vec::with_capacity(lines.len());
    let mut total_price: i64 = 0;
    let mut total_items: i64 = 0;

    for (line, product) in lines {
        let product = product.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("cart line {} has no product", line.id))
        })?;
        total_price += product.price * line.quantity as i64;
        total_items += line.quantity as i64;
        items.push(CartItemDto {
            id: line.id,
            product_id: line.product_id,
            quantity: line.quantity,
            product: CartProduct {
                id: product.id,
                name: product.name,
                price: product.price,
                image_url: product.image_url,
            },
        });
    }

    Ok(CartResponse {
        id: cart.id,
        items,
        total_price,
        total_items,
    })
}
