// vitrine/src/models/mod.rs

//! Entities and value types shared by stores, services and pipelines.

pub mod address;
pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod reference;
pub mod shipping;
pub mod user;

pub use address::{Address, AddressInput, AddressSnapshot};
pub use cart::{Cart, CartLineItem, CartOwner};
pub use order::{Order, OrderLineItem, OrderStatus, OrderTransition};
pub use payment::{GatewayPayment, GatewayStatus, NextSteps, PaymentKind, PaymentPreference, PreferenceItem, PreferenceRequest};
pub use product::{Dimensions, Product, ProductStatus};
pub use reference::ExternalReference;
pub use shipping::{CarrierToken, QuoteRequest, ShippingQuote, TrackingData, TrackingEvent};
pub use user::{Role, User};
