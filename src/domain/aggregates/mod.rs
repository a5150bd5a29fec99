//! Aggregates module
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use cart::{Cart, CartItem, CartLine, CartView};
pub use category::{Category, CategoryInput};
pub use order::{NewOrder, NewOrderItem, Order, OrderDetail, OrderItem, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, UnknownVariant};
pub use product::{Product, ProductInput, ProductListing};
pub use user::{NewUser, PostalAddress, User};
