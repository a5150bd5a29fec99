//! Application services. Each one is built once with its collaborators
//! (store, payment gateway, event publisher) and cloned into request handlers.

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub use account::{AccountService, AddressForm, ProfileForm};
pub use admin::AdminService;
pub use auth::{Admin, AuthService, AuthSettings, Claims, CurrentUser, LoginForm, RegisterForm, Session};
pub use cart::CartManager;
pub use catalog::{CatalogService, CategoryPage};
pub use checkout::{CheckoutForm, CheckoutOrchestrator, CheckoutOutcome, Completion, DirectOrder, DirectOrderItem};
