//! 도메인 모델.

pub mod returns;
pub mod stock;

pub use returns::ReturnsTable;
pub use stock::StockInput;
