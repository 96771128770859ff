//! Single text prediction and model summary for the command line.

use super::save::SavedModelConfig;
use crate::api::{Predictor, PredictorConfig};
use crate::error::Result;
use crate::model_loader::{ModelFiles, DEFAULT_MODEL_DIR, DEFAULT_MODEL_PREFIX};
use std::time::Instant;

/// Load the model in `model_dir` and classify `text`.
pub fn predict_single(
    text: &str,
    model_dir: Option<&str>,
    model_prefix: Option<&str>,
    device: &str,
) -> Result<()> {
    println!("\n===================================================================");
    println!("  Clickbait Classifier: Prediction");
    println!("===================================================================\n");

    println!("Loading model...");
    let mut config = PredictorConfig::new().with_device(device);
    if let Some(dir) = model_dir {
        config = config.with_model_dir(dir);
    }
    if let Some(prefix) = model_prefix {
        config = config.with_model_prefix(prefix);
    }
    let predictor = Predictor::with_config(config)?;
    println!("  ✓ Model loaded\n");

    println!("Input text:");
    let display = match text.char_indices().nth(100) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    };
    println!("  {}\n", display);

    let start = Instant::now();
    let result = predictor.predict(text)?;

    println!("===================================================================");
    print!("{}", result);
    println!("Time: {:.3}s", start.elapsed().as_secs_f64());
    println!("===================================================================\n");

    Ok(())
}

/// Print the saved configuration and metrics without loading the weights.
pub fn show_info(model_dir: Option<&str>, model_prefix: Option<&str>) -> Result<()> {
    let files = ModelFiles::new(
        model_dir.unwrap_or(DEFAULT_MODEL_DIR),
        model_prefix.unwrap_or(DEFAULT_MODEL_PREFIX),
    );
    files.ensure_exists()?;
    let saved = SavedModelConfig::load(&files.config)?;

    println!("Model directory: {}", files.dir.display());
    println!(
        "  Encoder: {} (hidden size {}, dropout {})",
        saved.model_architecture.base_model,
        saved.model_architecture.hidden_size,
        saved.model_architecture.dropout_rate
    );
    println!("  Tokenizer: {} (max length {})", saved.tokenizer_name, saved.max_length);
    println!("  LDA topics: {}", saved.num_lda_topics);

    let params = &saved.training_params;
    println!(
        "  Training: {} epochs, batch {} x {} accumulation, lr {:.1e}, clip {}",
        params.num_epochs,
        params.batch_size,
        params.accumulation_steps,
        params.initial_learning_rate,
        params.max_grad_norm
    );

    let m = &saved.model_performance;
    println!(
        "  Test: accuracy {:.4}, precision {:.4}, recall {:.4}, F1 {:.4}, loss {:.4}",
        m.accuracy, m.precision, m.recall, m.f1, m.test_loss
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid::config::Config;
    use crate::hybrid::evaluate::Metrics;
    use std::fs;

    #[test]
    fn test_info_reads_custom_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().to_string_lossy().into_owned();
        let files = ModelFiles::new(dir.path(), "headlines");
        for path in [
            &files.weights,
            &files.lda,
            &files.dictionary,
            &files.label_encoder,
            &files.encoder_config,
            &files.vocab,
            &files.merges,
        ] {
            fs::write(path, "").unwrap();
        }
        SavedModelConfig::new(&Config::default(), Metrics::default(), 768)
            .save(&files.config)
            .unwrap();

        assert!(show_info(Some(&model_dir), Some("headlines")).is_ok());
        assert!(matches!(
            show_info(Some(&model_dir), None),
            Err(crate::Error::MissingFiles(_))
        ));
    }
}
