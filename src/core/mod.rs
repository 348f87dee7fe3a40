pub mod message;

pub use message::{DataLine, ReplayMessage, SOURCE_ID};
