use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{UpdateOrderStatusRequest, UpdateUserRoleRequest, UserList},
        auth::{
            ChangePasswordRequest, LoginRequest, RegisterRequest, RegisterResponse, TokenResponse,
            UpdateProfileRequest,
        },
        cart::{AddCartItemRequest, CartItemDto, CartProduct, CartResponse, UpdateCartItemRequest},
        generation::{GenerateRequest, GenerationResponse, RegionEditRequest, RegionEditResponse},
        orders::{CreateOrderRequest, OrderItemInput, OrderList, OrderWithItems},
        products::{
            CategoryList, CollectionList, CreateCategoryRequest, CreateCollectionRequest,
            CreateProductRequest, CreateTagRequest, ProductList, TagList, UpdateCategoryRequest,
            UpdateCollectionRequest, UpdateProductRequest, UpdateTagRequest,
        },
    },
    entity::{orders::OrderStatus, users::Role},
    models::{Category, Collection, Order, OrderItem, Product, Tag, User},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, categories, collections, generation, health, orders, params, products,
        tags,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        auth::update_me,
        auth::change_password,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        collections::list_collections,
        collections::get_collection,
        collections::create_collection,
        collections::update_collection,
        collections::delete_collection,
        tags::list_tags,
        tags::create_tag,
        tags::update_tag,
        tags::delete_tag,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        orders::create_order,
        orders::list_my_orders,
        orders::get_order,
        orders::list_all_orders,
        orders::update_order_status,
        admin::list_users,
        admin::update_user_role,
        admin::delete_user,
        generation::generate_pattern,
        generation::edit_region,
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            Category,
            Collection,
            Tag,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            TokenResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateCollectionRequest,
            UpdateCollectionRequest,
            CollectionList,
            CreateTagRequest,
            UpdateTagRequest,
            TagList,
            AddCartItemRequest,
            UpdateCartItemRequest,
            CartProduct,
            CartItemDto,
            CartResponse,
            CreateOrderRequest,
            OrderItemInput,
            OrderWithItems,
            OrderList,
            UpdateUserRoleRequest,
            UpdateOrderStatusRequest,
            UserList,
            GenerateRequest,
            GenerationResponse,
            RegionEditRequest,
            RegionEditResponse,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::UserListQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<TokenResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<UserList>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Catalog", description = "Category, collection, and tag endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Generation", description = "Design generation endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
