pub mod config;
pub mod error;

pub mod utils;
pub use utils::*;

pub mod mem;
pub use mem::*;

pub mod dev;
pub use dev::*;

pub mod state;
pub use state::*;

pub use error::Error;
