//! Model file layout and pretrained-encoder resolution.
//!
//! Two kinds of files are managed here:
//!
//! - the artifacts written after training ([`ModelFiles`]), all sharing one
//!   file stem inside the model directory;
//! - the pretrained RoBERTa files ([`PretrainedFiles`]) the classifier and
//!   tokenizer are built from. They are read from a local directory or, with
//!   the `auto-download` feature, fetched from the Hugging Face hub.
//!
//! # Examples
//!
//! ```no_run
//! use lda_roberta::model_loader::ModelFiles;
//!
//! let files = ModelFiles::in_dir(None);
//! if files.exists() {
//!     println!("Trained model found in {}", files.dir.display());
//! }
//! ```

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_DIR: &str = "saved_model_roberta";
pub const DEFAULT_MODEL_PREFIX: &str = "lda_roberta_model";
pub const CONFIG_FILE: &str = "model_config.json";
pub const ENCODER_CONFIG_FILE: &str = "encoder_config.json";

const PRETRAINED_CONFIG: &str = "config.json";
const PRETRAINED_VOCAB: &str = "vocab.json";
const PRETRAINED_MERGES: &str = "merges.txt";
const PRETRAINED_WEIGHTS: &str = "rust_model.ot";

/// Artifacts of a trained classifier.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub dir: PathBuf,
    pub weights: PathBuf,
    pub lda: PathBuf,
    pub dictionary: PathBuf,
    pub label_encoder: PathBuf,
    pub config: PathBuf,
    /// Encoder configuration copied from the pretrained checkpoint
    pub encoder_config: PathBuf,
    pub vocab: PathBuf,
    pub merges: PathBuf,
}

impl ModelFiles {
    pub fn new(model_dir: impl AsRef<Path>, prefix: &str) -> Self {
        let dir = model_dir.as_ref().to_path_buf();
        Self {
            weights: dir.join(format!("{prefix}.ot")),
            lda: dir.join(format!("{prefix}_lda.json")),
            dictionary: dir.join(format!("{prefix}_dictionary.json")),
            label_encoder: dir.join(format!("{prefix}_label_encoder.json")),
            config: dir.join(CONFIG_FILE),
            encoder_config: dir.join(ENCODER_CONFIG_FILE),
            vocab: dir.join(PRETRAINED_VOCAB),
            merges: dir.join(PRETRAINED_MERGES),
            dir,
        }
    }

    /// Default file names inside `model_dir` (or `saved_model_roberta/`).
    pub fn in_dir(model_dir: Option<&str>) -> Self {
        Self::new(model_dir.unwrap_or(DEFAULT_MODEL_DIR), DEFAULT_MODEL_PREFIX)
    }

    fn all(&self) -> [&PathBuf; 8] {
        [
            &self.weights,
            &self.lda,
            &self.dictionary,
            &self.label_encoder,
            &self.config,
            &self.encoder_config,
            &self.vocab,
            &self.merges,
        ]
    }

    /// Check if all required files exist
    pub fn exists(&self) -> bool {
        self.all().iter().all(|p| p.exists())
    }

    pub fn missing(&self) -> Vec<&Path> {
        self.all()
            .into_iter()
            .filter(|p| !p.exists())
            .map(|p| p.as_path())
            .collect()
    }

    /// Error unless every artifact is present.
    pub fn ensure_exists(&self) -> Result<()> {
        let missing = self.missing();
        if missing.is_empty() {
            return Ok(());
        }
        let listing: Vec<String> = missing
            .iter()
            .map(|p| format!("  - {}", p.display()))
            .collect();
        Err(Error::MissingFiles(format!(
            "{}\n\nTrain the model first: lda-roberta train",
            listing.join("\n")
        )))
    }
}

/// Files of a pretrained RoBERTa checkpoint in `rust-bert` format.
#[derive(Debug, Clone)]
pub struct PretrainedFiles {
    pub config: PathBuf,
    pub vocab: PathBuf,
    pub merges: PathBuf,
    pub weights: PathBuf,
}

impl PretrainedFiles {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            config: dir.join(PRETRAINED_CONFIG),
            vocab: dir.join(PRETRAINED_VOCAB),
            merges: dir.join(PRETRAINED_MERGES),
            weights: dir.join(PRETRAINED_WEIGHTS),
        }
    }

    pub fn exists(&self) -> bool {
        [&self.config, &self.vocab, &self.merges, &self.weights]
            .iter()
            .all(|p| p.exists())
    }

    /// Tokenizer and encoder configuration stored alongside a trained model.
    /// `weights` points at the fine-tuned weights.
    pub fn from_model_files(files: &ModelFiles) -> Self {
        Self {
            config: files.encoder_config.clone(),
            vocab: files.vocab.clone(),
            merges: files.merges.clone(),
            weights: files.weights.clone(),
        }
    }
}

/// Locate the pretrained files for `model_name`.
///
/// With `local_dir` set, the files are expected there; missing files are
/// downloaded into it when `auto_download` is on. Without `local_dir`, files
/// come from the Hugging Face cache.
pub fn resolve_pretrained(
    model_name: &str,
    local_dir: Option<&str>,
    auto_download: bool,
) -> Result<PretrainedFiles> {
    if let Some(dir) = local_dir {
        let files = PretrainedFiles::in_dir(dir);
        if files.exists() {
            return Ok(files);
        }
        if !auto_download {
            return Err(Error::MissingFiles(format!(
                "pretrained files for {model_name} not found in {dir}\n\
                 Expected {PRETRAINED_CONFIG}, {PRETRAINED_VOCAB}, {PRETRAINED_MERGES} \
                 and {PRETRAINED_WEIGHTS}"
            )));
        }
    } else if !auto_download {
        return Err(Error::MissingFiles(format!(
            "no local directory configured for {model_name} and downloads are disabled"
        )));
    }

    download_pretrained(model_name, local_dir)
}

#[cfg(feature = "auto-download")]
fn download_pretrained(model_name: &str, local_dir: Option<&str>) -> Result<PretrainedFiles> {
    use hf_hub::api::sync::Api;
    use std::fs;
    use tracing::info;

    info!(model = model_name, "fetching pretrained files from Hugging Face");
    let api = Api::new()?;
    let repo = api.model(model_name.to_string());

    let fetch = |name: &str| -> Result<PathBuf> {
        let cached = repo.get(name)?;
        match local_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                let target = Path::new(dir).join(name);
                fs::copy(&cached, &target)?;
                Ok(target)
            }
            None => Ok(cached),
        }
    };

    Ok(PretrainedFiles {
        config: fetch(PRETRAINED_CONFIG)?,
        vocab: fetch(PRETRAINED_VOCAB)?,
        merges: fetch(PRETRAINED_MERGES)?,
        weights: fetch(PRETRAINED_WEIGHTS)?,
    })
}

#[cfg(not(feature = "auto-download"))]
fn download_pretrained(model_name: &str, _local_dir: Option<&str>) -> Result<PretrainedFiles> {
    Err(Error::MissingFiles(format!(
        "pretrained files for {model_name} are not available locally and the \
         auto-download feature is not enabled"
    )))
}

/// Configuration for loading a trained model
pub struct ModelLoaderConfig {
    pub model_dir: Option<String>,
    /// File stem shared by the artifacts
    pub model_prefix: String,
    /// "auto", "cpu" or "cuda"
    pub device: String,
}

impl Default for ModelLoaderConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            model_prefix: DEFAULT_MODEL_PREFIX.to_string(),
            device: "auto".to_string(),
        }
    }
}

impl ModelLoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_dir(mut self, dir: impl Into<String>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    pub fn with_model_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.model_prefix = prefix.into();
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn get_model_files(&self) -> ModelFiles {
        ModelFiles::new(
            self.model_dir.as_deref().unwrap_or(DEFAULT_MODEL_DIR),
            &self.model_prefix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_files_paths() {
        let files = ModelFiles::in_dir(None);
        assert_eq!(files.weights, PathBuf::from("saved_model_roberta/lda_roberta_model.ot"));
        assert_eq!(
            files.lda,
            PathBuf::from("saved_model_roberta/lda_roberta_model_lda.json")
        );
        assert_eq!(files.config, PathBuf::from("saved_model_roberta/model_config.json"));
    }

    #[test]
    fn test_custom_model_dir_and_prefix() {
        let files = ModelFiles::new("/tmp/models", "run1");
        assert_eq!(files.dictionary, PathBuf::from("/tmp/models/run1_dictionary.json"));
        assert_eq!(
            files.label_encoder,
            PathBuf::from("/tmp/models/run1_label_encoder.json")
        );
    }

    #[test]
    fn test_missing_files_listed() {
        let dir = tempfile::tempdir().unwrap();
        let files = ModelFiles::new(dir.path(), "m");
        std::fs::write(&files.config, "{}").unwrap();

        assert!(!files.exists());
        assert_eq!(files.missing().len(), 7);
        let err = files.ensure_exists().unwrap_err().to_string();
        assert!(err.contains("m.ot"));
        assert!(err.contains(ENCODER_CONFIG_FILE));
        assert!(!err.contains(CONFIG_FILE));
    }

    #[test]
    fn test_local_pretrained_dir() {
        let dir = tempfile::tempdir().unwrap();
        for name in [PRETRAINED_CONFIG, PRETRAINED_VOCAB, PRETRAINED_MERGES, PRETRAINED_WEIGHTS] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let local = dir.path().to_str().unwrap();
        let files = resolve_pretrained("roberta-base", Some(local), false).unwrap();
        assert_eq!(files.vocab, dir.path().join(PRETRAINED_VOCAB));
    }

    #[test]
    fn test_missing_pretrained_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().to_str().unwrap();
        assert!(matches!(
            resolve_pretrained("roberta-base", Some(local), false),
            Err(Error::MissingFiles(_))
        ));
        assert!(resolve_pretrained("roberta-base", None, false).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ModelLoaderConfig::new()
            .with_model_dir("custom_models")
            .with_device("cpu");

        assert_eq!(config.model_dir, Some("custom_models".to_string()));
        assert_eq!(config.device, "cpu");
        assert_eq!(
            config.get_model_files().weights,
            PathBuf::from("custom_models/lda_roberta_model.ot")
        );
        assert_eq!(
            config.with_model_prefix("run2").get_model_files().lda,
            PathBuf::from("custom_models/run2_lda.json")
        );
    }
}
