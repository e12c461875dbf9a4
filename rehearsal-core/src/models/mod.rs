mod attempt;
mod case;
mod progress;

pub use attempt::*;
pub use case::*;
pub use progress::*;
