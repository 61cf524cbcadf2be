use genwear_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        cart::{AddCartItemRequest, UpdateCartItemRequest},
        orders::CreateOrderRequest,
        products::{CreateCategoryRequest, CreateProductRequest, CreateTagRequest},
    },
    entity::orders::OrderStatus,
    entity::users::Role,
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{OrderListQuery, Pagination, UserListQuery},
    services::{
        admin_service, auth_service, cart_service, catalog_service, order_service,
        product_service,
    },
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// End-to-end flow through the service layer: register -> catalog -> cart ->
// order snapshot -> admin. Needs a Postgres database; skipped without one.
#[tokio::test]
async fn storefront_order_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    // Registration and login
    let registered = auth_service::register_user(
        &state,
        RegisterRequest {
            phone_number: "+14155552671".into(),
            full_name: "Test Customer".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    let user_id: Uuid = registered.data.unwrap().user_id.parse()?;

    let duplicate = auth_service::register_user(
        &state,
        RegisterRequest {
            phone_number: "+14155552671".into(),
            full_name: "Someone Else".into(),
            password: "secret123".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            phone_number: "+14155552671".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    assert!(!login.data.unwrap().access_token.is_empty());

    let wrong_password = auth_service::login_user(
        &state,
        LoginRequest {
            phone_number: "+14155552671".into(),
            password: "wrong-password".into(),
        },
    )
    .await;
    assert!(matches!(wrong_password, Err(AppError::Unauthorized)));

    let customer = AuthUser {
        user_id,
        role: Role::User,
    };
    let admin = seed_admin(&state, "+14155550000").await?;

    // Catalog setup through the admin surface
    let category = catalog_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "Classic".into(),
            description: None,
        },
    )
    .await?
    .data
    .unwrap();

    // A racing insert that slips past the duplicate pre-check still comes
    // back as Conflict, not a bare database error
    let dup_err = genwear_api::entity::categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Classic".into()),
        description: Set(None),
        created_at: NotSet,
    }
    .insert(&*state.orm)
    .await
    .expect_err("duplicate name must hit the unique index");
    assert!(matches!(
        AppError::conflict_on_unique(dup_err, "Category name already exists"),
        AppError::Conflict(_)
    ));

    let bandana = product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "Paisley Bandana".into(),
            description: Some("Classic paisley print".into()),
            price: 1500,
            stock: 10,
            category_id: Some(category.id),
            collection_id: None,
            image_url: None,
            tags: vec!["paisley".into()],
        },
    )
    .await?
    .data
    .unwrap();

    let forbidden = product_service::create_product(
        &state,
        &customer,
        CreateProductRequest {
            name: "Nope".into(),
            description: None,
            price: 100,
            stock: 1,
            category_id: None,
            collection_id: None,
            image_url: None,
            tags: vec![],
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    // Tags can be prepared ahead of any product; creation is get-or-create
    let summer = catalog_service::create_tag(
        &state,
        &admin,
        CreateTagRequest {
            name: "summer".into(),
        },
    )
    .await?
    .data
    .unwrap();
    let summer_again = catalog_service::create_tag(
        &state,
        &admin,
        CreateTagRequest {
            name: "summer".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(summer.id, summer_again.id);

    let tag_forbidden = catalog_service::create_tag(
        &state,
        &customer,
        CreateTagRequest {
            name: "nope".into(),
        },
    )
    .await;
    assert!(matches!(tag_forbidden, Err(AppError::Forbidden)));

    // Adding the same product twice merges onto one line
    cart_service::add_item(
        &state,
        &customer,
        AddCartItemRequest {
            product_id: bandana.id,
            quantity: 2,
        },
    )
    .await?;
    let cart = cart_service::add_item(
        &state,
        &customer,
        AddCartItemRequest {
            product_id: bandana.id,
            quantity: 1,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total_items, 3);
    assert_eq!(cart.total_price, 4500);

    // Drop one, keep two
    let line_id = cart.items[0].id;
    let cart = cart_service::update_item(
        &state,
        &customer,
        line_id,
        UpdateCartItemRequest { quantity: 2 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.total_items, 2);

    // Order creation consumes the cart and freezes prices
    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            full_name: "Test Customer".into(),
            phone_number: "+14155552671".into(),
            email: "customer@example.com".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            payment_method: "cod".into(),
            items: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(order.order.total_amount, 3000);
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].price, 1500);
    assert_eq!(order.items[0].quantity, 2);

    let cart_after = cart_service::get_cart(&state, &customer).await?.data.unwrap();
    assert!(cart_after.items.is_empty());

    // A second order from the now-empty cart is rejected
    let empty = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            full_name: "Test Customer".into(),
            phone_number: "+14155552671".into(),
            email: "customer@example.com".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            payment_method: "cod".into(),
            items: None,
        },
    )
    .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    // Later price changes never touch the snapshot
    product_service::update_product(
        &state,
        &admin,
        bandana.id,
        genwear_api::dto::products::UpdateProductRequest {
            name: None,
            description: None,
            price: Some(9900),
            stock: None,
            category_id: None,
            collection_id: None,
            image_url: None,
            tags: None,
        },
    )
    .await?;
    let reread = order_service::get_order(&state, &customer, order.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(reread.order.total_amount, 3000);
    assert_eq!(reread.items[0].price, 1500);

    // Only the owner or an admin can read an order
    let stranger = seed_user(&state, "+14155559999", Role::User).await?;
    let denied = order_service::get_order(&state, &stranger, order.order.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    order_service::get_order(&state, &admin, order.order.id).await?;

    // Admin order listing and status assignment
    let pending = order_service::list_all_orders(
        &state,
        &admin,
        OrderListQuery {
            page: None,
            page_size: None,
            status: Some(OrderStatus::Pending),
            sort_order: None,
        },
    )
    .await?;
    assert!(
        pending
            .data
            .unwrap()
            .items
            .iter()
            .any(|o| o.order.id == order.order.id)
    );

    let shipped = order_service::update_order_status(
        &state,
        &admin,
        order.order.id,
        OrderStatus::Shipped,
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shipped.order.status, OrderStatus::Shipped);

    let mine = order_service::list_my_orders(&state, &customer, Pagination::default()).await?;
    assert_eq!(mine.meta.unwrap().total, Some(1));

    // Deletion guards
    let blocked = product_service::delete_product(&state, &admin, bandana.id).await;
    assert!(matches!(blocked, Err(AppError::Conflict(_))));

    let cat_blocked = catalog_service::delete_category(&state, &admin, category.id).await;
    assert!(matches!(
        cat_blocked,
        Err(AppError::ReferentialIntegrity(_))
    ));

    let self_delete = admin_service::delete_user(&state, &admin, admin.user_id).await;
    assert!(matches!(self_delete, Err(AppError::BadRequest(_))));

    let users = admin_service::list_users(
        &state,
        &admin,
        UserListQuery {
            page: None,
            page_size: None,
            search: Some("Test Customer".into()),
            role: None,
        },
    )
    .await?;
    assert_eq!(users.meta.unwrap().total, Some(1));

    Ok(())
}

// Returns None (and skips the test) when no database is configured.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm, "migrations").await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, carts, product_tags, tags, products, \
         collections, product_categories, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url,
        migrations_dir: "migrations".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        token_ttl_days: 7,
        cors_origins: vec![],
        gemini_api_key: None,
        gemini_base_url: genwear_api::config::DEFAULT_GEMINI_BASE_URL.into(),
    };

    Ok(Some(AppState {
        orm: std::sync::Arc::new(orm),
        config,
        http: reqwest::Client::new(),
    }))
}

async fn seed_admin(state: &AppState, phone: &str) -> anyhow::Result<AuthUser> {
    seed_user(state, phone, Role::Admin).await
}

async fn seed_user(state: &AppState, phone: &str, role: Role) -> anyhow::Result<AuthUser> {
    let registered = auth_service::register_user(
        state,
        RegisterRequest {
            phone_number: phone.into(),
            full_name: "Seeded User".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    let user_id: Uuid = registered.data.unwrap().user_id.parse()?;

    if role == Role::Admin {
        use sea_orm::EntityTrait;
        let user = genwear_api::entity::Users::find_by_id(user_id)
            .one(&*state.orm)
            .await?
            .expect("seeded user");
        let mut active: genwear_api::entity::users::ActiveModel = user.into();
        active.role = Set(Role::Admin);
        active.update(&*state.orm).await?;
    }

    Ok(AuthUser { user_id, role })
}
