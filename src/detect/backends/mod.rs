pub mod scripted;
pub mod synthetic;

pub use scripted::{ScriptedLandmarkSource, ScriptedResponse, SubmittedFrame};
pub use synthetic::SyntheticLandmarkSource;
