pub mod amount;
pub mod category;
pub mod transaction;

pub use amount::Amount;
pub use category::{Category, UnknownCategory};
pub use transaction::{ParseStatus, Transaction, UNKNOWN_MERCHANT};
