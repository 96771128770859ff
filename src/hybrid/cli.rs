//! Command-line interface for the clickbait classifier.

use super::config::Config;
use super::predict::{predict_single, show_info};
use super::train::train_model;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

/// LDA + RoBERTa clickbait classifier.
///
/// Combines LDA topic distributions with a fine-tuned RoBERTa encoder.
#[derive(Parser)]
#[command(name = "lda-roberta", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a new model (saves to saved_model_roberta/)
    Train {
        /// Configuration file; defaults apply when it is missing
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,

        /// Override the number of training epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Resume from a checkpoint file or the latest one in a directory
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Classify a single text (requires a trained model)
    Predict {
        /// Text to classify
        text: String,

        /// Directory holding the trained model
        #[arg(long)]
        model_dir: Option<String>,

        /// File stem of the model artifacts (`output.model_prefix` at training)
        #[arg(long)]
        model_prefix: Option<String>,

        /// Device: auto, cpu or cuda
        #[arg(long, default_value = "auto")]
        device: String,
    },

    /// Show configuration and metrics of a trained model
    Info {
        /// Directory holding the trained model
        #[arg(long)]
        model_dir: Option<String>,

        /// File stem of the model artifacts
        #[arg(long)]
        model_prefix: Option<String>,
    },
}

/// Load `path`, falling back to defaults with a warning.
fn load_config(path: &PathBuf) -> Config {
    Config::load(path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "could not load config, using defaults");
        Config::default()
    })
}

/// Run a parsed command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train {
            config,
            epochs,
            resume,
        } => {
            let mut config = load_config(&config);
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
                println!("ℹ️  Epochs overridden by command-line flag: {}\n", epochs);
            }
            train_model(&config, resume.as_deref())?;
            Ok(())
        }
        Commands::Predict {
            text,
            model_dir,
            model_prefix,
            device,
        } => Ok(predict_single(
            &text,
            model_dir.as_deref(),
            model_prefix.as_deref(),
            &device,
        )?),
        Commands::Info {
            model_dir,
            model_prefix,
        } => Ok(show_info(model_dir.as_deref(), model_prefix.as_deref())?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_flags() {
        let cli = Cli::try_parse_from([
            "lda-roberta",
            "train",
            "--epochs",
            "3",
            "--resume",
            "checkpoints",
        ])
        .unwrap();
        match cli.command {
            Commands::Train {
                config,
                epochs,
                resume,
            } => {
                assert_eq!(config, PathBuf::from("config.toml"));
                assert_eq!(epochs, Some(3));
                assert_eq!(resume, Some(PathBuf::from("checkpoints")));
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_parse_predict() {
        let cli =
            Cli::try_parse_from(["lda-roberta", "predict", "Ten tricks", "--model-dir", "m"])
                .unwrap();
        match cli.command {
            Commands::Predict {
                text,
                model_dir,
                model_prefix,
                device,
            } => {
                assert_eq!(text, "Ten tricks");
                assert_eq!(model_dir.as_deref(), Some("m"));
                assert_eq!(model_prefix, None);
                assert_eq!(device, "auto");
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_parse_model_prefix() {
        let cli = Cli::try_parse_from(["lda-roberta", "info", "--model-prefix", "headlines"])
            .unwrap();
        match cli.command {
            Commands::Info {
                model_dir,
                model_prefix,
            } => {
                assert_eq!(model_dir, None);
                assert_eq!(model_prefix.as_deref(), Some("headlines"));
            }
            _ => panic!("expected info"),
        }
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_config(&PathBuf::from("/nonexistent/config.toml"));
        assert_eq!(config.training.epochs, 10);
    }
}
