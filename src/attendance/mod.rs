pub mod aggregate;
pub mod correction;
pub mod qr;
pub mod registry;
pub mod state;
pub mod store;
pub mod trust;
