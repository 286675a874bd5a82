pub mod meeting;
pub mod message;
pub mod participant;
pub mod processing_job;
pub mod recording;
pub mod user;
pub mod whiteboard;

pub use meeting::*;
pub use message::*;
pub use participant::*;
pub use processing_job::*;
pub use recording::*;
pub use user::*;
pub use whiteboard::*;
