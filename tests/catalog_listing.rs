use genwear_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{auth::RegisterRequest, products::CreateProductRequest},
    entity::users::Role,
    middleware::auth::AuthUser,
    routes::params::{ProductQuery, ProductSortBy},
    services::{auth_service, product_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

fn query() -> ProductQuery {
    ProductQuery {
        page: None,
        page_size: None,
        category_id: None,
        collection_id: None,
        tag: None,
        min_price: None,
        max_price: None,
        search: None,
        sort_by: None,
        sort_order: None,
    }
}

#[tokio::test]
async fn product_listing_filters_and_pages() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let admin = seed_admin(&state, "+14155550001").await?;
    for i in 0..5 {
        product_service::create_product(
            &state,
            &admin,
            CreateProductRequest {
                name: format!("Bandana {i}"),
                description: None,
                price: 1000 + i * 100,
                stock: 5,
                category_id: None,
                collection_id: None,
                image_url: None,
                tags: if i % 2 == 0 {
                    vec!["even".into()]
                } else {
                    vec![]
                },
            },
        )
        .await?;
    }

    let page = product_service::list_products(
        &state,
        ProductQuery {
            page: Some(2),
            page_size: Some(2),
            sort_by: Some(ProductSortBy::Price),
            ..query()
        },
    )
    .await?;
    let meta = page.meta.unwrap();
    assert_eq!(meta.total, Some(5));
    assert_eq!(meta.total_pages, Some(3));
    let items = page.data.unwrap().items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].price, 1200);

    let tagged = product_service::list_products(
        &state,
        ProductQuery {
            tag: Some("even".into()),
            ..query()
        },
    )
    .await?;
    assert_eq!(tagged.meta.unwrap().total, Some(3));

    let priced = product_service::list_products(
        &state,
        ProductQuery {
            min_price: Some(1300),
            ..query()
        },
    )
    .await?;
    assert_eq!(priced.meta.unwrap().total, Some(2));

    let searched = product_service::list_products(
        &state,
        ProductQuery {
            search: Some("bandana 3".into()),
            ..query()
        },
    )
    .await?;
    assert_eq!(searched.meta.unwrap().total, Some(1));

    let missing_tag = product_service::list_products(
        &state,
        ProductQuery {
            tag: Some("no-such-tag".into()),
            ..query()
        },
    )
    .await?;
    assert_eq!(missing_tag.meta.unwrap().total, Some(0));

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
    let registered = auth_service::register_user(
        state,
        RegisterRequest {
            phone_number: phone.into(),
            full_name: "Catalog Admin".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    let user_id: Uuid = registered.data.unwrap().user_id.parse()?;

    let user = genwear_api::entity::Users::find_by_id(user_id)
        .one(&*state.orm)
        .await?
        .expect("seeded user");
    let mut active: genwear_api::entity::users::ActiveModel = user.into();
    active.role = Set(Role::Admin);
    active.update(&*state.orm).await?;

    Ok(AuthUser {
        user_id,
        role: Role::Admin,
    })
}
