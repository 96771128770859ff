//! Model saving functionality for trained models.

use super::config::Config;
use super::dictionary::Dictionary;
use super::evaluate::Metrics;
use super::label_encoder::LabelEncoder;
use super::lda::LdaModel;
use super::model::HybridModel;
use crate::error::Result;
use crate::model_loader::{ModelFiles, PretrainedFiles};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub batch_size: usize,
    pub initial_learning_rate: f64,
    pub num_epochs: usize,
    pub accumulation_steps: usize,
    pub max_grad_norm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArchitecture {
    pub base_model: String,
    pub dropout_rate: f64,
    pub hidden_size: i64,
}

/// Contents of `model_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModelConfig {
    pub model_performance: Metrics,
    pub training_params: TrainingParams,
    pub tokenizer_name: String,
    pub max_length: usize,
    pub num_lda_topics: usize,
    pub model_architecture: ModelArchitecture,
}

impl SavedModelConfig {
    pub fn new(config: &Config, metrics: Metrics, hidden_size: i64) -> Self {
        Self {
            model_performance: metrics,
            training_params: TrainingParams {
                batch_size: config.training.batch_size,
                initial_learning_rate: config.training.learning_rate,
                num_epochs: config.training.epochs,
                accumulation_steps: config.training.accumulation_steps,
                max_grad_norm: config.training.max_grad_norm,
            },
            tokenizer_name: config.model.base_model.clone(),
            max_length: config.model.max_length,
            num_lda_topics: config.topics.num_topics,
            model_architecture: ModelArchitecture {
                base_model: config.model.base_model.clone(),
                dropout_rate: config.model.dropout_rate,
                hidden_size,
            },
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Trained components written together.
pub struct Artifacts<'a> {
    pub model: &'a HybridModel,
    pub lda: &'a LdaModel,
    pub dictionary: &'a Dictionary,
    pub label_encoder: &'a LabelEncoder,
    pub pretrained: &'a PretrainedFiles,
    pub config: &'a SavedModelConfig,
}

/// Write every artifact into the model directory.
///
/// The tokenizer vocabulary and encoder configuration are copied along, so
/// the directory is enough to rebuild a predictor.
pub fn save_model(artifacts: &Artifacts<'_>, files: &ModelFiles) -> Result<()> {
    fs::create_dir_all(&files.dir)?;
    info!(dir = %files.dir.display(), "saving model");

    artifacts.model.save(&files.weights)?;
    artifacts.lda.save(&files.lda)?;
    artifacts.dictionary.save(&files.dictionary)?;
    artifacts.label_encoder.save(&files.label_encoder)?;
    artifacts.config.save(&files.config)?;
    save_tokenizer_files(artifacts.pretrained, files)?;

    println!("\n✓ Model saved:");
    for path in [
        &files.weights,
        &files.lda,
        &files.dictionary,
        &files.label_encoder,
        &files.config,
    ] {
        println!("  - {}", path.display());
    }
    Ok(())
}

fn save_tokenizer_files(pretrained: &PretrainedFiles, files: &ModelFiles) -> Result<()> {
    for (from, to) in [
        (&pretrained.config, &files.encoder_config),
        (&pretrained.vocab, &files.vocab),
        (&pretrained.merges, &files.merges),
    ] {
        if from != to {
            fs::copy(from, to)?;
        }
    }
    Ok(())
}
