pub mod base;
pub mod meeting;
pub mod message;
pub mod recording;
pub mod user;
pub mod whiteboard;

pub use base::{BaseDao, DaoError, DaoResult, LimitOffset};
pub use meeting::{MeetingDao, NewMeeting};
pub use message::MessageDao;
pub use recording::{FinishedRecording, RecordingDao};
pub use user::UserDao;
pub use whiteboard::WhiteboardDao;
