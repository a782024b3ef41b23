use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use super::backends::SyntheticLandmarkSource;
use super::source::{LandmarkerOptions, SharedLandmarker};

/// Creates landmark sources from a model asset.
pub trait ModelLoader: Send + Sync {
    /// Loader identifier.
    fn name(&self) -> &'static str;

    /// Returns true when this loader can open `model_asset_path`.
    fn handles(&self, model_asset_path: &str) -> bool;

    /// Load the model and build a landmark source. May block.
    fn load(&self, options: &LandmarkerOptions) -> Result<SharedLandmarker>;
}

/// Loader for `stub://` model paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntheticModelLoader;

impl ModelLoader for SyntheticModelLoader {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn handles(&self, model_asset_path: &str) -> bool {
        model_asset_path.starts_with("stub://")
    }

    fn load(&self, options: &LandmarkerOptions) -> Result<SharedLandmarker> {
        log::info!(
            "SyntheticModelLoader: loaded {} ({:?}, {} poses)",
            options.model_asset_path,
            options.delegate,
            options.num_poses
        );
        Ok(Arc::new(Mutex::new(SyntheticLandmarkSource::new(options))))
    }
}

/// Landmark source initialization failure. Terminal for the application
/// session; reloading is the only recovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelLoadError {
    /// No registered loader accepts the model path.
    NoLoader(String),
    Timeout(Duration),
    Initialization(String),
}

impl ModelLoadError {
    /// Message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ModelLoadError::Timeout(_) => {
                "Failed to load the pose model. Please check your connection and try again."
            }
            ModelLoadError::NoLoader(_) | ModelLoadError::Initialization(_) => {
                "Failed to initialize the pose landmarker model."
            }
        }
    }
}

impl std::fmt::Display for ModelLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelLoadError::NoLoader(path) => write!(f, "no model loader handles {}", path),
            ModelLoadError::Timeout(after) => {
                write!(f, "model loading timed out after {}s", after.as_secs())
            }
            ModelLoadError::Initialization(message) => {
                write!(f, "model initialization failed: {}", message)
            }
        }
    }
}

impl std::error::Error for ModelLoadError {}

/// Run `loader` on a worker thread, giving up after `timeout`.
///
/// A loader that outlives the timeout keeps running; its landmark source is
/// dropped when it finishes.
pub fn load_with_timeout(
    loader: Arc<dyn ModelLoader>,
    options: &LandmarkerOptions,
    timeout: Duration,
) -> Result<SharedLandmarker, ModelLoadError> {
    let (tx, rx) = mpsc::channel();
    let options = options.clone();
    let loader_name = loader.name();
    std::thread::Builder::new()
        .name(format!("model-load-{}", loader_name))
        .spawn(move || {
            let _ = tx.send(loader.load(&options));
        })
        .map_err(|e| ModelLoadError::Initialization(format!("spawn loader thread: {}", e)))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(landmarker)) => Ok(landmarker),
        Ok(Err(err)) => {
            log::error!("model loader {} failed: {:#}", loader_name, err);
            Err(ModelLoadError::Initialization(format!("{:#}", err)))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            log::error!(
                "model loader {} timed out after {:?}",
                loader_name,
                timeout
            );
            Err(ModelLoadError::Timeout(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ModelLoadError::Initialization(
            format!("model loader {} exited without a result", loader_name),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct SlowLoader;

    impl ModelLoader for SlowLoader {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn handles(&self, _model_asset_path: &str) -> bool {
            true
        }

        fn load(&self, options: &LandmarkerOptions) -> Result<SharedLandmarker> {
            std::thread::sleep(Duration::from_millis(500));
            SyntheticModelLoader.load(options)
        }
    }

    struct BrokenLoader;

    impl ModelLoader for BrokenLoader {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn handles(&self, _model_asset_path: &str) -> bool {
            true
        }

        fn load(&self, _options: &LandmarkerOptions) -> Result<SharedLandmarker> {
            Err(anyhow!("model file truncated"))
        }
    }

    #[test]
    fn synthetic_loader_produces_source() {
        let options = LandmarkerOptions::default();
        let landmarker =
            load_with_timeout(Arc::new(SyntheticModelLoader), &options, Duration::from_secs(5))
                .expect("load");
        let guard = landmarker.lock().expect("lock");
        assert_eq!(guard.name(), "synthetic");
    }

    #[test]
    fn slow_loader_times_out() {
        let err = load_with_timeout(
            Arc::new(SlowLoader),
            &LandmarkerOptions::default(),
            Duration::from_millis(20),
        )
        .err();
        assert_eq!(err, Some(ModelLoadError::Timeout(Duration::from_millis(20))));
    }

    #[test]
    fn loader_error_is_initialization_failure() {
        let err = load_with_timeout(
            Arc::new(BrokenLoader),
            &LandmarkerOptions::default(),
            Duration::from_secs(5),
        )
        .err()
        .expect("error");
        assert_eq!(
            err,
            ModelLoadError::Initialization("model file truncated".to_string())
        );
        assert_eq!(
            err.user_message(),
            "Failed to initialize the pose landmarker model."
        );
    }
}
