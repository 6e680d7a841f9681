pub mod channel;
pub mod completion_queue;
pub mod objects;
pub mod submission_queue;

pub use channel::ChannelDefault;
pub use completion_queue::CompletionQueue;
pub use objects::{EnforcementObject, EnforcementObjectType, ObjectConfiguration};
pub use submission_queue::SubmissionQueue;
