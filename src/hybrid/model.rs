//! RoBERTa encoder with topic features concatenated before the output layer.

use crate::error::Result;
use rust_bert::bert::{BertConfig, BertModel};
use rust_bert::roberta::RobertaEmbeddings;
use std::borrow::Borrow;
use std::path::Path;
use tch::{nn, Device, Kind, Tensor};
use tracing::{debug, info};

/// Classification head over the `<s>` hidden state and the topic vector.
pub struct LdaRobertaClassifier {
    roberta: BertModel<RobertaEmbeddings>,
    classifier: nn::Linear,
    dropout_rate: f64,
}

impl LdaRobertaClassifier {
    pub fn new<'p, P>(
        p: P,
        config: &BertConfig,
        num_topics: i64,
        num_labels: i64,
        dropout_rate: f64,
    ) -> Self
    where
        P: Borrow<nn::Path<'p>>,
    {
        let p = p.borrow();
        let roberta =
            BertModel::<RobertaEmbeddings>::new_with_optional_pooler(p / "roberta", config, false);
        let classifier = nn::linear(
            p / "classifier",
            config.hidden_size + num_topics,
            num_labels,
            Default::default(),
        );
        Self {
            roberta,
            classifier,
            dropout_rate,
        }
    }

    /// Logits `[B, num_labels]`.
    pub fn forward_t(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        lda_features: &Tensor,
        train: bool,
    ) -> Result<Tensor> {
        let output = self.roberta.forward_t(
            Some(input_ids),
            Some(attention_mask),
            None,
            None,
            None,
            None,
            None,
            train,
        )?;
        let pooled = output
            .hidden_state
            .select(1, 0)
            .dropout(self.dropout_rate, train);
        let topics = lda_features.to_kind(pooled.kind());
        let combined = Tensor::f_cat(&[&pooled, &topics], 1)?;
        Ok(combined.apply(&self.classifier))
    }
}

/// Classifier together with the variable store owning its weights.
pub struct HybridModel {
    pub vs: nn::VarStore,
    pub net: LdaRobertaClassifier,
    pub hidden_size: i64,
}

impl HybridModel {
    pub fn new(
        config: &BertConfig,
        num_topics: usize,
        num_labels: usize,
        dropout_rate: f64,
        device: Device,
    ) -> Self {
        let vs = nn::VarStore::new(device);
        let net = LdaRobertaClassifier::new(
            vs.root(),
            config,
            num_topics as i64,
            num_labels as i64,
            dropout_rate,
        );
        Self {
            vs,
            net,
            hidden_size: config.hidden_size,
        }
    }

    /// Load encoder weights from a pretrained checkpoint; the output layer
    /// keeps its fresh initialisation.
    pub fn load_pretrained(&mut self, weights: impl AsRef<Path>) -> Result<()> {
        let missing = self.vs.load_partial(weights.as_ref())?;
        info!(
            path = %weights.as_ref().display(),
            missing = missing.len(),
            "loaded pretrained encoder weights"
        );
        for name in &missing {
            debug!(variable = %name, "not in pretrained checkpoint");
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.vs.save(path)?;
        Ok(())
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.vs.load(path)?;
        Ok(())
    }

    pub fn device(&self) -> Device {
        self.vs.device()
    }

    pub fn forward_t(
        &self,
        input_ids: &Tensor,
        attention_mask: &Tensor,
        lda_features: &Tensor,
        train: bool,
    ) -> Result<Tensor> {
        self.net
            .forward_t(input_ids, attention_mask, lda_features, train)
    }

    pub fn num_parameters(&self) -> i64 {
        self.vs
            .trainable_variables()
            .iter()
            .map(|t| t.numel() as i64)
            .sum()
    }
}

/// Softmax probabilities over the last dimension.
pub fn probabilities(logits: &Tensor) -> Tensor {
    logits.softmax(-1, Kind::Float)
}

/// Mean cross-entropy of `logits` `[B, C]` against class indices `[B]`.
pub fn cross_entropy(logits: &Tensor, labels: &Tensor) -> Result<Tensor> {
    let log_probs = logits.f_log_softmax(-1, Kind::Float)?;
    Ok(log_probs.f_nll_loss(labels, None::<Tensor>, tch::Reduction::Mean, -100)?)
}
