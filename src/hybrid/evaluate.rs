//! Model evaluation and results reporting.

use super::dataset::ClickbaitDataset;
use super::label_encoder::LabelEncoder;
use super::model::{cross_entropy, HybridModel};
use crate::error::Result;
use crate::roberta::SequenceTokenizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tch::Device;
use tracing::info;

/// Accuracy and F1 must both exceed this for a run to count as successful.
pub const SUCCESS_THRESHOLD: f64 = 0.8;

/// Test-set metrics; precision, recall and F1 are support-weighted averages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub test_loss: f64,
}

impl Metrics {
    pub fn is_successful(&self) -> bool {
        self.accuracy > SUCCESS_THRESHOLD && self.f1 > SUCCESS_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    pub label: i64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Occurrences in the true labels
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn accuracy(truth: &[i64], predicted: &[i64]) -> f64 {
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    ratio(correct, truth.len())
}

/// Per-class scores over every label seen in either sequence, sorted by label.
/// Undefined ratios are reported as 0.
pub fn per_class_scores(truth: &[i64], predicted: &[i64]) -> Vec<ClassScores> {
    let labels: BTreeSet<i64> = truth.iter().chain(predicted).copied().collect();
    labels
        .into_iter()
        .map(|label| {
            let mut tp = 0;
            let mut predicted_count = 0;
            let mut support = 0;
            for (&t, &p) in truth.iter().zip(predicted) {
                if p == label {
                    predicted_count += 1;
                    if t == label {
                        tp += 1;
                    }
                }
                if t == label {
                    support += 1;
                }
            }
            let precision = ratio(tp, predicted_count);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassScores {
                label,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

/// Support-weighted (precision, recall, f1).
pub fn weighted_scores(truth: &[i64], predicted: &[i64]) -> (f64, f64, f64) {
    let scores = per_class_scores(truth, predicted);
    let total: usize = scores.iter().map(|s| s.support).sum();
    if total == 0 {
        return (0.0, 0.0, 0.0);
    }
    let weighted = |f: fn(&ClassScores) -> f64| {
        scores
            .iter()
            .map(|s| f(s) * s.support as f64)
            .sum::<f64>()
            / total as f64
    };
    (
        weighted(|s| s.precision),
        weighted(|s| s.recall),
        weighted(|s| s.f1),
    )
}

pub fn compute_metrics(truth: &[i64], predicted: &[i64], total_loss: f64, num_batches: usize) -> Metrics {
    let (precision, recall, f1) = weighted_scores(truth, predicted);
    Metrics {
        accuracy: accuracy(truth, predicted),
        precision,
        recall,
        f1,
        test_loss: if num_batches == 0 {
            0.0
        } else {
            total_loss / num_batches as f64
        },
    }
}

/// Predictions and true labels for a dataset, with the metrics over them.
pub struct Evaluation {
    pub metrics: Metrics,
    pub truth: Vec<i64>,
    pub predicted: Vec<i64>,
}

/// Run the model over `dataset` in order, without gradients and in eval mode.
pub fn evaluate_model<T: SequenceTokenizer>(
    model: &HybridModel,
    dataset: &ClickbaitDataset<'_, T>,
    batch_size: usize,
) -> Result<Evaluation> {
    let device = model.device();
    tch::no_grad(|| -> Result<Evaluation> {
        let mut truth = Vec::with_capacity(dataset.len());
        let mut predicted = Vec::with_capacity(dataset.len());
        let mut total_loss = 0.0;
        let batches = dataset.batches(batch_size, None);

        for indices in &batches {
            let batch = dataset.batch(indices, device)?;
            let logits = model.forward_t(
                &batch.input_ids,
                &batch.attention_mask,
                &batch.lda_features,
                false,
            )?;
            let loss = cross_entropy(&logits, &batch.labels)?;
            total_loss += loss.f_double_value(&[])?;

            let preds = logits.argmax(-1, false).to(Device::Cpu);
            predicted.extend(Vec::<i64>::try_from(&preds)?);
            truth.extend(Vec::<i64>::try_from(&batch.labels.to(Device::Cpu))?);
        }

        let metrics = compute_metrics(&truth, &predicted, total_loss, batches.len());
        Ok(Evaluation {
            metrics,
            truth,
            predicted,
        })
    })
}

/// Print the metrics table and the per-class breakdown.
pub fn print_results(evaluation: &Evaluation, encoder: &LabelEncoder) {
    let m = &evaluation.metrics;
    info!(
        accuracy = m.accuracy,
        precision = m.precision,
        recall = m.recall,
        f1 = m.f1,
        test_loss = m.test_loss,
        "evaluation finished"
    );

    println!("===================================================================\n");
    println!("Final Results\n");
    println!("  Test Accuracy:  {:.4}", m.accuracy);
    println!("  Precision:      {:.4}", m.precision);
    println!("  Recall:         {:.4}", m.recall);
    println!("  F1 Score:       {:.4}", m.f1);
    println!("  Test Loss:      {:.4}\n", m.test_loss);

    println!("+----------------------+-----------+--------+--------+---------+");
    println!("| Class                | Precision | Recall |   F1   | Support |");
    println!("+----------------------+-----------+--------+--------+---------+");
    for scores in per_class_scores(&evaluation.truth, &evaluation.predicted) {
        let name = encoder
            .inverse_transform(scores.label)
            .map(str::to_string)
            .unwrap_or_else(|_| scores.label.to_string());
        println!(
            "| {:<20} | {:>9.4} | {:>6.4} | {:>6.4} | {:>7} |",
            name, scores.precision, scores.recall, scores.f1, scores.support
        );
    }
    println!("+----------------------+-----------+--------+--------+---------+\n");

    if m.is_successful() {
        println!("✅ Training successful! Accuracy and F1 are both above 0.8.");
    } else {
        println!("📝 Model needs improvement: accuracy or F1 at or below 0.8.");
    }
    println!("\n===================================================================\n");
}
