mod learning;
mod study;
mod transcript;
mod user;

pub use learning::*;
pub use study::*;
pub use transcript::*;
pub use user::*;
