pub mod battery;
pub mod forecast;
pub mod grid;
pub mod load;
pub mod plan;

pub use battery::*;
pub use forecast::*;
pub use grid::*;
pub use load::*;
pub use plan::*;
