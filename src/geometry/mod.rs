pub mod bounds;
pub mod projection;
pub mod ring;

pub use bounds::Bounds;
pub use projection::{wgs84_to_lv03, wgs84_to_lv95};
pub use ring::Ring;
