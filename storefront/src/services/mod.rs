// vitrine/src/services/mod.rs

pub mod cart_session;
pub mod inflight;
pub mod order_feed;
pub mod payment_gateway;
pub mod postal_code;
pub mod quotes;
pub mod shipping;

pub use cart_session::CartSession;
pub use inflight::{CheckoutPermit, InFlightCheckouts};
pub use order_feed::{OrderEvent, OrderFeed, OrderSubscription};
pub use payment_gateway::{MercadoPagoClient, PaymentGateway};
pub use postal_code::{PostalAddress, PostalCodeResolver, ViaCepClient};
pub use quotes::QuoteService;
pub use shipping::{MelhorEnvioClient, ShippingCarrier};
