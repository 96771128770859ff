//! Hybrid LDA + RoBERTa Clickbait Classifier
//!
//! This module implements the training pipeline and its components. The
//! classifier combines:
//!
//! - **LDA** (Latent Dirichlet Allocation) topic distributions computed from a
//!   bag-of-words view of each text
//! - **RoBERTa** contextual embeddings from a pretrained encoder fine-tuned on
//!   the task
//!
//! ## Architecture
//!
//! - The `<s>` hidden state of RoBERTa (768 dims for `roberta-base`) goes
//!   through dropout
//! - It is concatenated with the topic vector (10 dims by default)
//! - A linear layer maps the result to the class logits
//!
//! ## Training
//!
//! - AdamW with weight decay, cosine annealing stepped per epoch
//! - Gradient accumulation with norm clipping at each optimizer step
//! - Batches that fail are logged and skipped
//! - A checkpoint after every epoch; runs can resume from one
//!
//! ## Usage
//!
//! ```bash
//! lda-roberta train --config config.toml
//! lda-roberta predict "You won't believe what happened next"
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use lda_roberta::hybrid::config::Config;
//! use lda_roberta::hybrid::train::train_model;
//!
//! let config = Config::default();
//! let metrics = train_model(&config, None).expect("Training failed");
//! println!("F1: {:.4}", metrics.f1);
//! ```
//!
//! ## Configuration
//!
//! Create a `config.toml` file to customize the pipeline; every field is
//! optional:
//!
//! ```toml
//! [[data.sources]]
//! path = "articlesClickbait.txt"
//! label = "clickbait"
//!
//! [[data.sources]]
//! path = "articlesNotClickbait.txt"
//! label = "not clickbait"
//!
//! [topics]
//! num_topics = 10
//!
//! [model]
//! base_model = "roberta-base"
//! max_length = 256
//!
//! [training]
//! epochs = 10
//! batch_size = 4
//! accumulation_steps = 4
//! learning_rate = 1e-5
//!
//! [output]
//! model_dir = "saved_model_roberta"
//! ```
//!
//! ## Module Structure
//!
//! - [`config`] - Configuration structures and loading
//! - [`data`] - Corpus loading and train/test split
//! - [`label_encoder`] - Label string to class index mapping
//! - [`dictionary`] - Term dictionary and bag-of-words
//! - [`lda`] - Variational Bayes LDA, batch or online updates
//! - [`dataset`] - Example encoding and batching
//! - [`model`] - RoBERTa + topic feature classifier
//! - [`schedule`] - Cosine annealing learning rate
//! - [`checkpoint`] - Per-epoch checkpoints and resume
//! - [`train`] - Model training pipeline
//! - [`evaluate`] - Model evaluation and metrics
//! - [`save`] - Model persistence
//! - [`predict`] - Single text prediction
//! - `cli` - Command-line interface (`cli` feature)

pub mod checkpoint;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod dictionary;
pub mod evaluate;
pub mod label_encoder;
pub mod lda;
pub mod model;
pub mod predict;
pub mod save;
pub mod schedule;
pub mod train;

// Re-export commonly used items for external use
pub use config::Config;
pub use train::train_model;
