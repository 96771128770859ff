//! Dataset adapter: turns texts into transformer input plus topic features.
//!
//! Examples are encoded lazily when a batch is assembled, so only the
//! current batch's token ids live in memory.

use super::dictionary::Dictionary;
use super::lda::LdaModel;
use crate::error::{Error, Result};
use crate::roberta::SequenceTokenizer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tch::{Device, Tensor};

/// One encoded example.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedExample {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub topic_features: Vec<f32>,
    pub label: i64,
}

/// Everything needed to turn raw text into model input.
pub struct TextEncoder<'a, T: SequenceTokenizer> {
    pub dictionary: &'a Dictionary,
    pub lda: &'a LdaModel,
    pub tokenizer: &'a T,
    pub max_length: usize,
}

impl<'a, T: SequenceTokenizer> TextEncoder<'a, T> {
    pub fn new(
        dictionary: &'a Dictionary,
        lda: &'a LdaModel,
        tokenizer: &'a T,
        max_length: usize,
    ) -> Self {
        Self {
            dictionary,
            lda,
            tokenizer,
            max_length,
        }
    }

    pub fn num_topics(&self) -> usize {
        self.lda.num_topics
    }

    pub fn encode(&self, text: &str, label: i64) -> EncodedExample {
        let bow = self.dictionary.text2bow(text);
        let topic_features = self.lda.topic_features(&bow);
        let encoded = self.tokenizer.encode(text, self.max_length);
        EncodedExample {
            input_ids: encoded.input_ids,
            attention_mask: encoded.attention_mask,
            topic_features,
            label,
        }
    }

    /// Encode unlabelled texts into a batch (labels are zero).
    pub fn batch_for_texts<S: AsRef<str>>(&self, texts: &[S], device: Device) -> Result<Batch> {
        let examples: Vec<EncodedExample> =
            texts.iter().map(|t| self.encode(t.as_ref(), 0)).collect();
        Batch::from_examples(&examples, device)
    }
}

/// Labelled texts paired with an encoder.
pub struct ClickbaitDataset<'a, T: SequenceTokenizer> {
    texts: &'a [String],
    labels: &'a [i64],
    encoder: TextEncoder<'a, T>,
}

impl<'a, T: SequenceTokenizer> ClickbaitDataset<'a, T> {
    pub fn new(texts: &'a [String], labels: &'a [i64], encoder: TextEncoder<'a, T>) -> Result<Self> {
        if texts.len() != labels.len() {
            return Err(Error::InvalidArgument(format!(
                "{} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }
        Ok(Self {
            texts,
            labels,
            encoder,
        })
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn get(&self, index: usize) -> EncodedExample {
        self.encoder.encode(&self.texts[index], self.labels[index])
    }

    /// Encode the examples at `indices` and stack them on `device`.
    pub fn batch(&self, indices: &[usize], device: Device) -> Result<Batch> {
        let examples: Vec<EncodedExample> = indices.iter().map(|&i| self.get(i)).collect();
        Batch::from_examples(&examples, device)
    }

    /// Batch index lists covering the dataset once; shuffled when `rng` is given.
    pub fn batches(&self, batch_size: usize, rng: Option<&mut StdRng>) -> Vec<Vec<usize>> {
        batch_indices(self.len(), batch_size, rng)
    }
}

/// Split `0..n` into consecutive batches of `batch_size`; the last may be short.
pub fn batch_indices(n: usize, batch_size: usize, rng: Option<&mut StdRng>) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n).collect();
    if let Some(rng) = rng {
        order.shuffle(rng);
    }
    order
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Stacked model input for one batch.
#[derive(Debug)]
pub struct Batch {
    /// `[B, L]` int64
    pub input_ids: Tensor,
    /// `[B, L]` int64
    pub attention_mask: Tensor,
    /// `[B, K]` float32
    pub lda_features: Tensor,
    /// `[B]` int64
    pub labels: Tensor,
}

impl Batch {
    pub fn from_examples(examples: &[EncodedExample], device: Device) -> Result<Self> {
        let first = examples
            .first()
            .ok_or_else(|| Error::InvalidArgument("cannot build an empty batch".to_string()))?;
        let batch = examples.len() as i64;
        let seq_len = first.input_ids.len() as i64;
        let num_topics = first.topic_features.len() as i64;

        let ids: Vec<i64> = examples.iter().flat_map(|e| e.input_ids.iter().copied()).collect();
        let mask: Vec<i64> = examples
            .iter()
            .flat_map(|e| e.attention_mask.iter().copied())
            .collect();
        let topics: Vec<f32> = examples
            .iter()
            .flat_map(|e| e.topic_features.iter().copied())
            .collect();
        let labels: Vec<i64> = examples.iter().map(|e| e.label).collect();

        Ok(Batch {
            input_ids: Tensor::from_slice(&ids)
                .f_reshape([batch, seq_len])?
                .to_device(device),
            attention_mask: Tensor::from_slice(&mask)
                .f_reshape([batch, seq_len])?
                .to_device(device),
            lda_features: Tensor::from_slice(&topics)
                .f_reshape([batch, num_topics])?
                .to_device(device),
            labels: Tensor::from_slice(&labels).to_device(device),
        })
    }

    pub fn size(&self) -> i64 {
        self.labels.size()[0]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::hybrid::config::TopicConfig;
    use crate::hybrid::dictionary::tokenize;
    use rand::SeedableRng;
    use tch::Kind;

    /// Start marker, one id per word (its length plus 3), end marker.
    pub(crate) struct WordTokenizer;

    impl SequenceTokenizer for WordTokenizer {
        fn token_ids(&self, text: &str, max_length: usize) -> Vec<i64> {
            let mut ids = vec![0];
            ids.extend(text.split_whitespace().map(|w| w.len() as i64 + 3));
            ids.truncate(max_length.saturating_sub(1));
            ids.push(2);
            ids
        }

        fn pad_id(&self) -> i64 {
            1
        }
    }

    pub(crate) fn fixture() -> (Vec<String>, Vec<i64>, Dictionary, LdaModel) {
        let texts: Vec<String> = [
            "you will never guess this trick",
            "senate passes annual budget bill",
            "this one trick doctors hate",
            "council approves new budget",
            "what happened next will shock you",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let labels = vec![0, 1, 0, 1, 0];
        let docs: Vec<Vec<&str>> = texts.iter().map(|t| tokenize(t)).collect();
        let dictionary = Dictionary::from_documents(&docs);
        let corpus: Vec<_> = docs.iter().map(|d| dictionary.doc2bow(d)).collect();
        let config = TopicConfig {
            num_topics: 3,
            ..TopicConfig::default()
        };
        let lda = LdaModel::fit(&corpus, dictionary.len(), &config).unwrap();
        (texts, labels, dictionary, lda)
    }

    #[test]
    fn test_encode_example() {
        let (texts, _, dictionary, lda) = fixture();
        let encoder = TextEncoder::new(&dictionary, &lda, &WordTokenizer, 12);
        let example = encoder.encode(&texts[0], 1);

        assert_eq!(example.input_ids.len(), 12);
        assert_eq!(example.attention_mask.iter().sum::<i64>(), 8);
        assert_eq!(example.topic_features.len(), 3);
        assert_eq!(example.label, 1);
    }

    #[test]
    fn test_batch_shapes() {
        let (texts, labels, dictionary, lda) = fixture();
        let encoder = TextEncoder::new(&dictionary, &lda, &WordTokenizer, 10);
        let dataset = ClickbaitDataset::new(&texts, &labels, encoder).unwrap();

        let batch = dataset.batch(&[0, 1, 2], Device::Cpu).unwrap();
        assert_eq!(batch.input_ids.size(), vec![3, 10]);
        assert_eq!(batch.attention_mask.size(), vec![3, 10]);
        assert_eq!(batch.lda_features.size(), vec![3, 3]);
        assert_eq!(batch.lda_features.kind(), Kind::Float);
        assert_eq!(batch.labels.kind(), Kind::Int64);
        assert_eq!(Vec::<i64>::try_from(&batch.labels).unwrap(), vec![0, 1, 0]);
        assert_eq!(batch.size(), 3);
    }

    #[test]
    fn test_batch_indices_cover_dataset() {
        let in_order = batch_indices(5, 2, None);
        assert_eq!(in_order, vec![vec![0, 1], vec![2, 3], vec![4]]);

        let mut rng = StdRng::seed_from_u64(7);
        let mut shuffled: Vec<usize> = batch_indices(5, 2, Some(&mut rng))
            .into_iter()
            .flatten()
            .collect();
        shuffled.sort_unstable();
        assert_eq!(shuffled, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_mismatched_lengths_and_empty_batch() {
        let (texts, _, dictionary, lda) = fixture();
        let encoder = TextEncoder::new(&dictionary, &lda, &WordTokenizer, 8);
        assert!(ClickbaitDataset::new(&texts, &[0], encoder).is_err());
        assert!(Batch::from_examples(&[], Device::Cpu).is_err());
    }
}
