use std::path::PathBuf;

/// Default resource directory of a React Native Android project.
pub const DEFAULT_OUTPUT_PATH: &str = "./android/app/src/main/res";

/// Where and how Android resources are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidConfig {
    /// The `res` directory.
    pub output_path: PathBuf,
    pub force: bool,
}

impl AndroidConfig {
    pub fn new(output_path: Option<PathBuf>, force: bool) -> Self {
        Self {
            output_path: output_path.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            force,
        }
    }
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self::new(None, false)
    }
}
