pub mod bits;
pub mod header;

pub use bits::{bcd, Bits};
pub use header::CartHeader;
