// storefront/src/models/mod.rs

//! Database entities and the request payloads that create or change them.

pub mod address;
pub mod category;
pub mod coupon;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod user;

pub use address::{Address, NewAddress};
pub use category::{slugify, Category, CategoryInput};
pub use coupon::{normalize_code, Coupon, CouponKind, NewCoupon};
pub use order::{new_reference, Order, OrderStatus};
pub use order_item::{OrderItem, OrderItemDetail};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use product::{NewProduct, Product, ProductUpdate};
pub use user::{normalize_email, User, UserRole};
