mod backends;
mod loader;
mod registry;
mod source;

pub use backends::{
    ScriptedLandmarkSource, ScriptedResponse, SubmittedFrame, SyntheticLandmarkSource,
};
pub use loader::{load_with_timeout, ModelLoadError, ModelLoader, SyntheticModelLoader};
pub use registry::LoaderRegistry;
pub use source::{
    Delegate, DetectionPoll, LandmarkSource, LandmarkerOptions, RunningMode, SharedLandmarker,
};
