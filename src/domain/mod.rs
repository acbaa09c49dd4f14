mod expense;
mod money;
mod settlement;
mod trip;

pub use expense::*;
pub use money::*;
pub use settlement::*;
pub use trip::*;
