//! Configuration structures for the LDA + RoBERTa classifier.
//!
//! This module provides strongly-typed configuration management using TOML files.
//! The configuration covers the labelled corpora, the topic model, the
//! transformer classifier, training hyperparameters, and output paths.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data loading configuration
    pub data: DataConfig,
    /// Topic model configuration
    pub topics: TopicConfig,
    /// Classifier architecture configuration
    pub model: ModelConfig,
    /// Training hyperparameters
    pub training: TrainingConfig,
    /// Output paths configuration
    pub output: OutputConfig,
}

/// One label-partitioned text file: every line is an example with `label`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: String,
    pub label: String,
}

/// Data loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Corpora in load order
    pub sources: Vec<SourceConfig>,
    /// Lines accumulated per read chunk
    pub chunk_size: usize,
    /// Fraction of examples held out for evaluation
    pub test_size: f64,
    /// Seed for the train/test shuffle
    pub random_state: u64,
}

/// LDA configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub num_topics: usize,
    pub passes: usize,
    /// One M-step per pass over the whole corpus; online updates per chunk
    /// when false
    pub batch: bool,
    /// Documents per E-step chunk
    pub chunksize: usize,
    /// Maximum E-step iterations per document
    pub iterations: usize,
    pub gamma_threshold: f64,
    /// Topics below this probability are dropped from a document's features
    pub minimum_probability: f64,
    pub decay: f64,
    pub offset: f64,
    pub random_state: u64,
}

/// Classifier architecture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hugging Face model id of the pretrained encoder and tokenizer
    pub base_model: String,
    /// Local directory holding `config.json`, `vocab.json`, `merges.txt`
    /// and `rust_model.ot`; downloaded when unset
    pub pretrained_dir: Option<String>,
    /// Token sequence length after padding/truncation
    pub max_length: usize,
    pub dropout_rate: f64,
    /// "auto", "cpu" or "cuda"
    pub device: String,
}

/// Training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Batches per optimizer step
    pub accumulation_steps: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub max_grad_norm: f64,
    /// Debug log cadence in batches
    pub log_every: usize,
    /// Seed for the per-epoch batch shuffle
    pub seed: u64,
}

/// Output paths configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the final model artifacts
    pub model_dir: String,
    /// Directory receiving per-epoch checkpoints
    pub checkpoint_dir: String,
    /// File stem shared by the model artifacts
    pub model_prefix: String,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Sections or fields missing from the file keep their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            sources: vec![
                SourceConfig {
                    path: "articlesClickbait.txt".to_string(),
                    label: "clickbait".to_string(),
                },
                SourceConfig {
                    path: "articlesNotClickbait.txt".to_string(),
                    label: "not clickbait".to_string(),
                },
            ],
            chunk_size: 1000,
            test_size: 0.2,
            random_state: 42,
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        TopicConfig {
            num_topics: 10,
            passes: 1,
            batch: true,
            chunksize: 2000,
            iterations: 50,
            gamma_threshold: 0.001,
            minimum_probability: 0.01,
            decay: 0.5,
            offset: 1.0,
            random_state: 42,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            base_model: "roberta-base".to_string(),
            pretrained_dir: None,
            max_length: 256,
            dropout_rate: 0.1,
            device: "auto".to_string(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 10,
            batch_size: 4,
            accumulation_steps: 4,
            learning_rate: 1e-5,
            weight_decay: 0.01,
            max_grad_norm: 1.0,
            log_every: 100,
            seed: 42,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            model_dir: "saved_model_roberta".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            model_prefix: "lda_roberta_model".to_string(),
        }
    }
}
