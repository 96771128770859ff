//! Model training pipeline for the LDA + RoBERTa classifier.

use super::checkpoint::{
    load_checkpoint, resolve_resume, save_checkpoint, CheckpointState, FINAL_MODEL_STEM,
};
use super::config::{Config, TopicConfig, TrainingConfig};
use super::data::{gather, load_corpus, train_test_split};
use super::dataset::{ClickbaitDataset, TextEncoder};
use super::dictionary::{tokenize, BagOfWords, Dictionary};
use super::evaluate::{evaluate_model, print_results, Metrics};
use super::label_encoder::LabelEncoder;
use super::lda::LdaModel;
use super::model::{cross_entropy, HybridModel};
use super::save::{save_model, Artifacts, SavedModelConfig};
use super::schedule::CosineAnnealingLr;
use crate::model_loader::{resolve_pretrained, ModelFiles};
use crate::roberta::{load_encoder_config, select_device, RobertaTextTokenizer, SequenceTokenizer};
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tch::nn::{self, OptimizerConfig};
use tracing::{debug, info, warn};

/// Number of terms printed per topic after fitting.
const TOPIC_TERMS: usize = 10;

/// Train the classifier and write every artifact.
///
/// This function orchestrates the entire training pipeline:
/// 1. Load the labelled corpora and split them
/// 2. Fit the dictionary and LDA on the training texts
/// 3. Fine-tune RoBERTa with the topic features attached
/// 4. Evaluate on the held-out split and save the model
///
/// `resume` may name a checkpoint file or a checkpoint directory.
pub fn train_model(config: &Config, resume: Option<&Path>) -> Result<Metrics> {
    print_training_header(config);
    tch::manual_seed(config.training.seed as i64);
    let device = select_device(&config.model.device);

    let start = Instant::now();
    let corpus = load_corpus(&config.data).context("failed to load training data")?;
    let label_encoder = LabelEncoder::fit(&corpus.labels);
    let labels = label_encoder.transform_all(&corpus.labels)?;
    let (train_idx, test_idx) =
        train_test_split(corpus.len(), config.data.test_size, config.data.random_state);
    let train_texts = gather(&corpus.texts, &train_idx);
    let train_labels = gather(&labels, &train_idx);
    let test_texts = gather(&corpus.texts, &test_idx);
    let test_labels = gather(&labels, &test_idx);
    drop(corpus);
    info!(
        train = train_texts.len(),
        test = test_texts.len(),
        classes = ?label_encoder.classes,
        elapsed_secs = start.elapsed().as_secs_f64(),
        "data loaded"
    );

    let (dictionary, lda) = build_topic_model(&train_texts, &config.topics)?;

    let pretrained = resolve_pretrained(
        &config.model.base_model,
        config.model.pretrained_dir.as_deref(),
        cfg!(feature = "auto-download"),
    )
    .with_context(|| format!("failed to locate pretrained {}", config.model.base_model))?;
    let tokenizer = RobertaTextTokenizer::from_pretrained(&pretrained)
        .context("failed to load tokenizer")?;
    let encoder_config = load_encoder_config(&pretrained);
    let mut model = HybridModel::new(
        &encoder_config,
        lda.num_topics,
        label_encoder.len(),
        config.model.dropout_rate,
        device,
    );
    model
        .load_pretrained(&pretrained.weights)
        .context("failed to load pretrained encoder weights")?;
    info!(parameters = model.num_parameters(), "classifier ready");

    let max_length = config.model.max_length;
    let train_set = ClickbaitDataset::new(
        &train_texts,
        &train_labels,
        TextEncoder::new(&dictionary, &lda, &tokenizer, max_length),
    )?;
    let test_set = ClickbaitDataset::new(
        &test_texts,
        &test_labels,
        TextEncoder::new(&dictionary, &lda, &tokenizer, max_length),
    )?;

    let training = &config.training;
    let mut scheduler = CosineAnnealingLr::new(training.learning_rate, training.epochs);
    let mut start_epoch = 0;
    if let Some(path) = resume {
        let Some(paths) = resolve_resume(path)? else {
            bail!("no checkpoint found at {}", path.display());
        };
        let state = load_checkpoint(&mut model, &paths)?;
        scheduler = restore_scheduler(state.scheduler, training.epochs);
        start_epoch = state.epoch + 1;
        println!(
            "Resuming after epoch {} (loss {:.4}, lr {:.2e})\n",
            state.epoch + 1,
            state.loss,
            scheduler.lr()
        );
    }

    let mut opt = nn::AdamW::default()
        .wd(training.weight_decay)
        .build(&model.vs, scheduler.lr())
        .context("failed to create AdamW optimizer")?;

    // Epoch shuffles depend only on the seed and the epoch index, so a
    // resumed run sees the same batch order as an uninterrupted one.
    let train_start = Instant::now();
    for epoch in start_epoch..training.epochs {
        let mut rng = StdRng::seed_from_u64(training.seed.wrapping_add(epoch as u64));
        let summary = train_epoch(&model, &mut opt, &train_set, training, epoch, &mut rng);
        if summary.skipped > 0 {
            warn!(epoch, skipped = summary.skipped, batches = summary.batches, "batches skipped");
        }
        let avg_loss = summary.loss;

        let lr = scheduler.step();
        opt.set_lr(lr);
        println!(
            "Epoch [{}/{}], Loss: {:.4}, LR: {:.2e}",
            epoch + 1,
            training.epochs,
            avg_loss,
            lr
        );

        let state = CheckpointState {
            epoch,
            loss: avg_loss,
            scheduler: scheduler.clone(),
        };
        save_checkpoint(&model, &config.output.checkpoint_dir, &state)?;
    }
    println!(
        "\nTotal training time: {:.2}s\n",
        train_start.elapsed().as_secs_f64()
    );

    println!("Evaluating...");
    let evaluation = evaluate_model(&model, &test_set, training.batch_size)
        .context("evaluation failed")?;
    print_results(&evaluation, &label_encoder);
    let metrics = evaluation.metrics;

    save_final_model(&model, &config.output.checkpoint_dir, &metrics)?;

    let files = ModelFiles::new(&config.output.model_dir, &config.output.model_prefix);
    let saved_config = SavedModelConfig::new(config, metrics, model.hidden_size);
    save_model(
        &Artifacts {
            model: &model,
            lda: &lda,
            dictionary: &dictionary,
            label_encoder: &label_encoder,
            pretrained: &pretrained,
            config: &saved_config,
        },
        &files,
    )
    .context("failed to save model")?;

    println!("\n===================================================================\n");
    println!("Training complete!\n");
    println!("To predict: lda-roberta predict \"your text here\"\n");

    Ok(metrics)
}

/// Build the term dictionary and fit LDA over the training texts.
pub fn build_topic_model(
    texts: &[String],
    config: &TopicConfig,
) -> crate::error::Result<(Dictionary, LdaModel)> {
    println!("Building LDA topic model ({} topics)...", config.num_topics);
    let start = Instant::now();
    let documents: Vec<Vec<&str>> = texts.iter().map(|t| tokenize(t)).collect();
    let dictionary = Dictionary::from_documents(&documents);
    let corpus: Vec<BagOfWords> = documents.iter().map(|d| dictionary.doc2bow(d)).collect();
    drop(documents);

    let lda = LdaModel::fit(&corpus, dictionary.len(), config)?;
    println!(
        "  Vocabulary size: {} ({:.2}s)",
        dictionary.len(),
        start.elapsed().as_secs_f64()
    );
    for topic in 0..lda.num_topics {
        info!(
            topic,
            terms = %lda.format_topic(topic, TOPIC_TERMS, &dictionary),
            "topic"
        );
    }
    Ok((dictionary, lda))
}

/// Continue a checkpointed schedule over `epochs`.
///
/// A checkpoint written for a different epoch count keeps its step but anneals
/// over the new horizon.
fn restore_scheduler(mut saved: CosineAnnealingLr, epochs: usize) -> CosineAnnealingLr {
    if saved.t_max != epochs {
        warn!(
            checkpoint_epochs = saved.t_max,
            epochs, "checkpoint schedule used a different epoch count, annealing over the new one"
        );
        saved.t_max = epochs;
    }
    saved
}

/// Outcome of one training epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
struct EpochSummary {
    /// Unscaled loss summed over successful batches, divided by all batches
    loss: f64,
    batches: usize,
    skipped: usize,
    optimizer_steps: usize,
}

/// One pass over the training set with gradient accumulation.
///
/// A batch that fails is logged and skipped; it still counts towards the
/// mean's denominator. Gradients left over when the batch count is not a
/// multiple of the accumulation steps are dropped.
fn train_epoch<T: SequenceTokenizer>(
    model: &HybridModel,
    opt: &mut nn::Optimizer,
    dataset: &ClickbaitDataset<'_, T>,
    training: &TrainingConfig,
    epoch: usize,
    rng: &mut StdRng,
) -> EpochSummary {
    let batches = dataset.batches(training.batch_size, Some(rng));
    let accumulation = training.accumulation_steps.max(1);
    let log_every = training.log_every.max(1);

    let pb = ProgressBar::new(batches.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {msg} {bar:30.green/black} {pos}/{len} [{elapsed}<{eta}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(format!("Epoch {}/{}", epoch + 1, training.epochs));

    let mut running_loss = 0.0;
    let mut skipped = 0;
    let mut optimizer_steps = 0;
    opt.zero_grad();
    for (i, indices) in batches.iter().enumerate() {
        pb.inc(1);
        let loss = match guarded_step(model, dataset, indices, accumulation) {
            Ok(loss) => loss,
            Err(e) => {
                pb.suspend(|| warn!(batch = i, error = %e, "error in batch, skipping"));
                skipped += 1;
                continue;
            }
        };

        if (i + 1) % accumulation == 0 {
            opt.clip_grad_norm(training.max_grad_norm);
            opt.step();
            opt.zero_grad();
            optimizer_steps += 1;
        }
        running_loss += loss;

        if i % log_every == 0 {
            debug!(epoch, batch = i, loss, "training progress");
        }
    }
    pb.finish_and_clear();
    opt.zero_grad();

    EpochSummary {
        loss: if batches.is_empty() {
            0.0
        } else {
            running_loss / batches.len() as f64
        },
        batches: batches.len(),
        skipped,
        optimizer_steps,
    }
}

/// `train_step` with libtorch panics (out of memory, bad indices) turned
/// into errors.
fn guarded_step<T: SequenceTokenizer>(
    model: &HybridModel,
    dataset: &ClickbaitDataset<'_, T>,
    indices: &[usize],
    accumulation: usize,
) -> crate::error::Result<f64> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        train_step(model, dataset, indices, accumulation)
    }))
    .unwrap_or_else(|payload| Err(crate::Error::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Forward and backward for one batch; returns the unscaled loss.
fn train_step<T: SequenceTokenizer>(
    model: &HybridModel,
    dataset: &ClickbaitDataset<'_, T>,
    indices: &[usize],
    accumulation: usize,
) -> crate::error::Result<f64> {
    let batch = dataset.batch(indices, model.device())?;
    let logits = model.forward_t(
        &batch.input_ids,
        &batch.attention_mask,
        &batch.lda_features,
        true,
    )?;
    let loss = cross_entropy(&logits, &batch.labels)?;
    let scaled = loss.f_div_scalar(accumulation as f64)?;
    scaled.f_backward()?;
    Ok(loss.f_double_value(&[])?)
}

/// Write `lda_roberta_final_model.ot` and its metrics next to the checkpoints.
fn save_final_model(model: &HybridModel, dir: &str, metrics: &Metrics) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let weights = Path::new(dir).join(format!("{FINAL_MODEL_STEM}.ot"));
    model.save(&weights)?;
    let summary = serde_json::json!({ "metrics": metrics });
    std::fs::write(
        weights.with_extension("json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    info!(path = %weights.display(), "final model saved");
    Ok(())
}

/// Print training header with configuration details.
fn print_training_header(config: &Config) {
    println!("\n===================================================================");
    println!("  Clickbait Classifier: LDA + RoBERTa");
    println!("===================================================================\n");

    println!("Configuration:");
    for source in &config.data.sources {
        println!("  Data: {} ({})", source.path, source.label);
    }
    println!(
        "  Train/Test split: {:.0}%/{:.0}%",
        (1.0 - config.data.test_size) * 100.0,
        config.data.test_size * 100.0
    );
    println!("  LDA topics: {}", config.topics.num_topics);
    println!(
        "  Encoder: {} (max length {})",
        config.model.base_model, config.model.max_length
    );
    println!("  Dropout: {}", config.model.dropout_rate);
    println!("  Learning rate: {}", config.training.learning_rate);
    println!("  Epochs: {}", config.training.epochs);
    println!(
        "  Batch size: {} x {} accumulation steps",
        config.training.batch_size, config.training.accumulation_steps
    );
    println!("===================================================================\n");
}
