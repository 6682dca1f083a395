pub mod fixtures;
pub mod order;
pub mod validate;

pub use order::{Delivery, Item, Order, Payment};
pub use validate::{ValidationError, Violation};
