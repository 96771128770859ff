//! # lda-roberta - Clickbait Classifier
//!
//! Clickbait detection that combines LDA topic features with a fine-tuned
//! RoBERTa encoder, in Rust on the libtorch backend.
//!
//! ## Features
//!
//! - **Hybrid Features**: LDA topic distribution (10 dims) + RoBERTa `<s>` embedding (768 dims)
//! - **Fine-Tuning**: AdamW, gradient accumulation, cosine annealing, per-epoch checkpoints
//! - **Auto-Download**: Fetch the pretrained `roberta-base` files from Hugging Face
//! - **Self-Contained Models**: A trained model directory carries everything needed to predict
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! lda-roberta = "0.1"
//!
//! # Or without the CLI and downloads
//! lda-roberta = { version = "0.1", default-features = false }
//! ```
//!
//! ### Basic Usage
//!
//! ```no_run
//! use lda_roberta::api::Predictor;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let predictor = Predictor::new()?;
//!
//!     let result = predictor.predict("This one weird trick will change your life")?;
//!
//!     println!("Label: {}", result.label);
//!     println!("Confidence: {:.1}%", result.confidence() * 100.0);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Training
//!
//! ```bash
//! lda-roberta train --config config.toml
//! lda-roberta train --resume checkpoints/
//! lda-roberta info
//! ```
//!
//! ## Cargo Features
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `cli` | Include CLI binary | ✓ |
//! | `auto-download` | Download pretrained RoBERTa files from Hugging Face | ✓ |
//!
//! ## Pretrained Encoder Files
//!
//! Without `auto-download`, place the `rust-bert` conversion of
//! `roberta-base` in a directory and set `model.pretrained_dir`:
//!
//! ```text
//! config.json  vocab.json  merges.txt  rust_model.ot
//! ```
//!
//! ## Requirements
//!
//! - **libtorch**: required by `tch`. With a Python install:
//!   ```bash
//!   export LIBTORCH_USE_PYTORCH=1
//!   ```
//! - **CUDA** (optional): used automatically when available
//!
//! ## Logging
//!
//! The binary logs through `tracing`; set `RUST_LOG=lda_roberta=debug` for
//! per-batch progress.

// Public API modules
pub mod api;
pub mod error;
pub mod model_loader;

// Core modules
pub mod hybrid;
pub mod roberta;

pub use error::{Error, Result};
