mod extended_number;

pub use extended_number::{ExtendedNumber, NotReal};
