pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod collections;
pub mod order_items;
pub mod orders;
pub mod product_tags;
pub mod products;
pub mod tags;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use collections::Entity as Collections;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_tags::Entity as ProductTags;
pub use products::Entity as Products;
pub use tags::Entity as Tags;
pub use users::Entity as Users;
