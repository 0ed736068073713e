pub mod error;
pub mod line_items;
pub mod traits;
pub mod types;

pub use error::*;
pub use traits::*;
pub use types::*;
