//! High-level API for clickbait prediction
//!
//! This module loads a trained model directory and classifies text.
//!
//! # Quick Start
//!
//! ```no_run
//! use lda_roberta::api::Predictor;
//!
//! let predictor = Predictor::new()?;
//! let result = predictor.predict("You won't believe what this dog did next")?;
//! println!("{}", result.label); // e.g. "clickbait"
//! # Ok::<(), lda_roberta::Error>(())
//! ```
//!
//! # Examples
//!
//! ## Batch Predictions
//!
//! ```no_run
//! # use lda_roberta::api::Predictor;
//! # fn main() -> Result<(), lda_roberta::Error> {
//! let predictor = Predictor::new()?;
//! let texts = vec!["Text 1", "Text 2", "Text 3"];
//! let results = predictor.predict_batch(&texts)?;
//!
//! for (text, result) in texts.iter().zip(results.iter()) {
//!     println!("{}: {}", text, result.label);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Model Directory
//!
//! ```no_run
//! use lda_roberta::api::{Predictor, PredictorConfig};
//!
//! let config = PredictorConfig::new()
//!     .with_model_dir("/custom/path")
//!     .with_device("cpu");
//!
//! let predictor = Predictor::with_config(config)?;
//! # Ok::<(), lda_roberta::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::hybrid::dataset::TextEncoder;
use crate::hybrid::dictionary::Dictionary;
use crate::hybrid::evaluate::Metrics;
use crate::hybrid::label_encoder::LabelEncoder;
use crate::hybrid::lda::LdaModel;
use crate::hybrid::model::{probabilities, HybridModel};
use crate::hybrid::save::SavedModelConfig;
use crate::model_loader::{ModelFiles, PretrainedFiles};
use crate::roberta::{load_encoder_config, select_device, RobertaTextTokenizer};
use std::path::Path;
use tch::Device;
use tracing::info;

pub use crate::model_loader::ModelLoaderConfig as PredictorConfig;

/// Texts encoded and run together in `predict_batch`.
const PREDICT_BATCH_SIZE: usize = 16;

/// Main predictor interface: the trained classifier with its topic model,
/// dictionary, tokenizer and label encoder.
pub struct Predictor {
    model: HybridModel,
    tokenizer: RobertaTextTokenizer,
    dictionary: Dictionary,
    lda: LdaModel,
    label_encoder: LabelEncoder,
    config: SavedModelConfig,
    device: Device,
}

/// Prediction result with per-class probabilities
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// The predicted label (e.g. "clickbait")
    pub label: String,

    /// Softmax probability of every class, in label-encoder order
    pub probabilities: Vec<(String, f64)>,
}

impl PredictionResult {
    /// Probability of the predicted label
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .iter()
            .find(|(label, _)| *label == self.label)
            .map_or(0.0, |(_, p)| *p)
    }
}

impl Predictor {
    /// Load the model from `saved_model_roberta/` on the best available device
    pub fn new() -> Result<Self> {
        Self::with_config(PredictorConfig::default())
    }

    /// Create a new predictor with custom configuration
    pub fn with_config(config: PredictorConfig) -> Result<Self> {
        let files = config.get_model_files();
        Self::from_files(&files, select_device(&config.device))
    }

    /// Load a trained model directory with default file names.
    pub fn load(model_dir: impl AsRef<Path>, device: Device) -> Result<Self> {
        let dir = model_dir.as_ref().to_string_lossy().into_owned();
        Self::from_files(&ModelFiles::in_dir(Some(&dir)), device)
    }

    pub fn from_files(files: &ModelFiles, device: Device) -> Result<Self> {
        files.ensure_exists()?;

        let config = SavedModelConfig::load(&files.config)?;
        let label_encoder = LabelEncoder::load(&files.label_encoder)?;
        let dictionary = Dictionary::load(&files.dictionary)?;
        let lda = LdaModel::load(&files.lda)?;
        if lda.num_topics != config.num_lda_topics {
            return Err(Error::InvalidArgument(format!(
                "topic model has {} topics but the classifier expects {}",
                lda.num_topics, config.num_lda_topics
            )));
        }

        let stored = PretrainedFiles::from_model_files(files);
        let tokenizer = RobertaTextTokenizer::from_pretrained(&stored)?;
        let encoder_config = load_encoder_config(&stored);
        let mut model = HybridModel::new(
            &encoder_config,
            lda.num_topics,
            label_encoder.len(),
            config.model_architecture.dropout_rate,
            device,
        );
        model.load(&files.weights)?;
        info!(dir = %files.dir.display(), ?device, "model loaded");

        Ok(Self {
            model,
            tokenizer,
            dictionary,
            lda,
            label_encoder,
            config,
            device,
        })
    }

    fn encoder(&self) -> TextEncoder<'_, RobertaTextTokenizer> {
        TextEncoder::new(
            &self.dictionary,
            &self.lda,
            &self.tokenizer,
            self.config.max_length,
        )
    }

    /// Classify one text
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use lda_roberta::api::Predictor;
    /// let predictor = Predictor::new().unwrap();
    /// let result = predictor.predict("Scientists publish annual climate report").unwrap();
    /// assert_eq!(result.probabilities.len(), 2);
    /// ```
    pub fn predict(&self, text: &str) -> Result<PredictionResult> {
        let mut results = self.predict_chunk(&[text])?;
        results
            .pop()
            .ok_or_else(|| Error::InvalidArgument("no prediction produced".to_string()))
    }

    /// Classify several texts, batching the forward passes.
    pub fn predict_batch(&self, texts: &[&str]) -> Result<Vec<PredictionResult>> {
        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(PREDICT_BATCH_SIZE) {
            results.extend(self.predict_chunk(chunk)?);
        }
        Ok(results)
    }

    fn predict_chunk(&self, texts: &[&str]) -> Result<Vec<PredictionResult>> {
        let batch = self.encoder().batch_for_texts(texts, self.device)?;
        let probs = tch::no_grad(|| -> Result<_> {
            let logits = self.model.forward_t(
                &batch.input_ids,
                &batch.attention_mask,
                &batch.lda_features,
                false,
            )?;
            Ok(probabilities(&logits).to(Device::Cpu))
        })?;

        let num_classes = self.label_encoder.len();
        let flat = Vec::<f32>::try_from(&probs.flatten(0, -1))?;
        flat.chunks(num_classes.max(1))
            .map(|row| self.to_result(row))
            .collect()
    }

    fn to_result(&self, row: &[f32]) -> Result<PredictionResult> {
        let best = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i);
        let label = self.label_encoder.inverse_transform(best as i64)?.to_string();
        let probabilities = self
            .label_encoder
            .classes
            .iter()
            .zip(row)
            .map(|(class, &p)| (class.clone(), p as f64))
            .collect();
        Ok(PredictionResult {
            label,
            probabilities,
        })
    }

    /// Get information about the loaded model
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            device: format!("{:?}", self.device),
            base_model: self.config.model_architecture.base_model.clone(),
            num_topics: self.lda.num_topics,
            max_length: self.config.max_length,
            classes: self.label_encoder.classes.clone(),
            vocabulary_size: self.dictionary.len(),
            parameters: self.model.num_parameters(),
            performance: self.config.model_performance,
        }
    }
}

/// Information about the loaded model
#[derive(Debug)]
pub struct ModelInfo {
    pub device: String,
    pub base_model: String,
    pub num_topics: usize,
    pub max_length: usize,
    pub classes: Vec<String>,
    /// Terms known to the topic model's dictionary
    pub vocabulary_size: usize,
    pub parameters: i64,
    pub performance: Metrics,
}

impl std::fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Prediction: {}", self.label)?;
        writeln!(f, "Confidence: {:.2}%", self.confidence() * 100.0)?;
        writeln!(f, "\nProbabilities:")?;
        for (label, p) in &self.probabilities {
            writeln!(f, "  {:<16} {:.2}%", label, p * 100.0)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Encoder: {} (max length {})", self.base_model, self.max_length)?;
        writeln!(f, "LDA topics: {}", self.num_topics)?;
        writeln!(f, "Vocabulary: {} terms", self.vocabulary_size)?;
        writeln!(f, "Classes: {}", self.classes.join(", "))?;
        writeln!(f, "Parameters: {}", self.parameters)?;
        writeln!(f, "Device: {}", self.device)?;
        writeln!(
            f,
            "Test accuracy: {:.2}%  F1: {:.4}",
            self.performance.accuracy * 100.0,
            self.performance.f1
        )
    }
}
