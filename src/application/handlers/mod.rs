pub mod ocpp_v16;
pub mod ocpp_v16_handler;

pub use ocpp_v16_handler::OcppHandlerV16;
