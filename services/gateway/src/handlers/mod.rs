pub mod trades;
pub mod tv;
