use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use genwear_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Categories, Collections, ProductTags, Products, Tags, Users,
        categories::{ActiveModel as CategoryActive, Column as CategoryCol},
        collections::{ActiveModel as CollectionActive, Column as CollectionCol},
        product_tags::{ActiveModel as ProductTagActive, Column as ProductTagCol},
        products::{ActiveModel as ProductActive, Column as ProdCol},
        tags::{ActiveModel as TagActive, Column as TagCol},
        users::{ActiveModel as UserActive, Column as UserCol, Role},
    },
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm, &config.migrations_dir).await?;

    let admin_id = ensure_user(&orm, "+84900000001", "Store Admin", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&orm, "+84900000002", "Demo Customer", "user123", Role::User).await?;

    let classic = ensure_category(&orm, "Classic", "Traditional paisley and solid designs").await?;
    let graphic = ensure_category(&orm, "Graphic", "Bold illustrated patterns").await?;
    let summer = ensure_collection(&orm, "Summer 2026", Some("summer"), Some(2026)).await?;

    let products = [
        (
            "Paisley Classic Bandana",
            "Timeless paisley print on soft cotton",
            990_i64,
            120,
            classic,
            Some(summer),
            vec!["paisley", "cotton"],
        ),
        (
            "Wave Rider Bandana",
            "Stylized ocean waves, square repeat",
            1290,
            80,
            graphic,
            Some(summer),
            vec!["waves", "blue"],
        ),
        (
            "Night Garden Bandana",
            "Dark floral pattern with high contrast",
            1490,
            60,
            graphic,
            None,
            vec!["floral"],
        ),
    ];
    for (name, desc, price, stock, category_id, collection_id, tag_names) in products {
        ensure_product(
            &orm,
            name,
            desc,
            price,
            stock,
            category_id,
            collection_id,
            &tag_names,
        )
        .await?;
    }

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    phone_number: &str,
    full_name: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(user) = Users::find()
        .filter(UserCol::PhoneNumber.eq(phone_number))
        .one(orm)
        .await?
    {
        println!("User {phone_number} already present");
        return Ok(user.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        phone_number: Set(phone_number.to_string()),
        full_name: Set(full_name.to_string()),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;
    println!("Created user {phone_number} (role={role:?})");
    Ok(user.id)
}

async fn ensure_category(
    orm: &DatabaseConnection,
    name: &str,
    description: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(CategoryCol::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some(description.to_string())),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;
    Ok(category.id)
}

async fn ensure_collection(
    orm: &DatabaseConnection,
    name: &str,
    season: Option<&str>,
    year: Option<i32>,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Collections::find()
        .filter(CollectionCol::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }
    let collection = CollectionActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        season: Set(season.map(str::to_string)),
        year: Set(year),
        image_url: Set(None),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;
    Ok(collection.id)
}

#[allow(clippy::too_many_arguments)]
async fn ensure_product(
    orm: &DatabaseConnection,
    name: &str,
    description: &str,
    price: i64,
    stock: i32,
    category_id: Uuid,
    collection_id: Option<Uuid>,
    tag_names: &[&str],
) -> anyhow::Result<()> {
    if Products::find()
        .filter(ProdCol::Name.eq(name))
        .one(orm)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some(description.to_string())),
        price: Set(price),
        stock: Set(stock),
        category_id: Set(Some(category_id)),
        collection_id: Set(collection_id),
        image_url: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(orm)
    .await?;

    for tag_name in tag_names {
        let tag = match Tags::find()
            .filter(TagCol::Name.eq(*tag_name))
            .one(orm)
            .await?
        {
            Some(tag) => tag,
            None => {
                TagActive {
                    id: Set(Uuid::new_v4()),
                    name: Set(tag_name.to_string()),
                }
                .insert(orm)
                .await?
            }
        };
        let linked = ProductTags::find()
            .filter(ProductTagCol::ProductId.eq(product.id))
            .filter(ProductTagCol::TagId.eq(tag.id))
            .one(orm)
            .await?;
        if linked.is_none() {
            ProductTagActive {
                product_id: Set(product.id),
                tag_id: Set(tag.id),
            }
            .insert(orm)
            .await?;
        }
    }

    println!("Seeded product {name}");
    Ok(())
}
