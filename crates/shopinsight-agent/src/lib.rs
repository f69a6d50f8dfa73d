pub mod agent;
pub mod parsing;
pub mod stage;

pub use agent::*;
pub use parsing::*;
pub use stage::*;
