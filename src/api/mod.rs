pub mod attendance;
pub mod correction;
pub mod office_network;
pub mod qr;
pub mod report;
