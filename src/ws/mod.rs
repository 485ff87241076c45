// WebSocket push layer: subscriber hub, socket handler, routes.
pub mod handler;
pub mod hub;
pub mod messages;
pub mod routes;

pub use hub::{EventSender, SubscriberHub};
pub use routes::create_ws_routes;
