//! RoBERTa tokenizer and device helpers (rust-bert / rust_tokenizers, libtorch backend).

use crate::error::Result;
use crate::model_loader::PretrainedFiles;
use rust_bert::bert::BertConfig;
use rust_bert::Config as _;
use rust_tokenizers::tokenizer::{RobertaTokenizer, Tokenizer, TruncationStrategy};
use rust_tokenizers::vocab::Vocab;
use std::path::Path;
use tch::Device;
use tracing::{info, warn};

pub const PAD_TOKEN: &str = "<pad>";

/// Token ids and attention mask of one text, both `max_length` long.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedText {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
}

/// Converts text into fixed-length transformer input.
pub trait SequenceTokenizer {
    /// Token ids including special tokens, at most `max_length` long.
    fn token_ids(&self, text: &str, max_length: usize) -> Vec<i64>;

    fn pad_id(&self) -> i64;

    /// Tokenize, truncate and pad `text` to exactly `max_length`.
    fn encode(&self, text: &str, max_length: usize) -> EncodedText {
        pad_to_length(self.token_ids(text, max_length), max_length, self.pad_id())
    }
}

/// Pad `ids` with `pad_id` up to `max_length`, truncating longer input.
pub fn pad_to_length(mut ids: Vec<i64>, max_length: usize, pad_id: i64) -> EncodedText {
    ids.truncate(max_length);
    let real = ids.len();
    ids.resize(max_length, pad_id);

    let mut attention_mask = vec![1i64; real];
    attention_mask.resize(max_length, 0);

    EncodedText {
        input_ids: ids,
        attention_mask,
    }
}

/// Byte-level BPE tokenizer of the `roberta-base` family.
pub struct RobertaTextTokenizer {
    tokenizer: RobertaTokenizer,
    pad_id: i64,
}

impl RobertaTextTokenizer {
    pub fn from_files(vocab: impl AsRef<Path>, merges: impl AsRef<Path>) -> Result<Self> {
        let tokenizer = RobertaTokenizer::from_file(vocab, merges, false, false)?;
        let pad_id = tokenizer.vocab().token_to_id(PAD_TOKEN);
        Ok(Self { tokenizer, pad_id })
    }

    pub fn from_pretrained(files: &PretrainedFiles) -> Result<Self> {
        Self::from_files(&files.vocab, &files.merges)
    }
}

impl SequenceTokenizer for RobertaTextTokenizer {
    fn token_ids(&self, text: &str, max_length: usize) -> Vec<i64> {
        self.tokenizer
            .encode(text, None, max_length, &TruncationStrategy::LongestFirst, 0)
            .token_ids
    }

    fn pad_id(&self) -> i64 {
        self.pad_id
    }
}

/// Read the encoder configuration shipped with the pretrained weights.
pub fn load_encoder_config(files: &PretrainedFiles) -> BertConfig {
    BertConfig::from_file(&files.config)
}

/// Resolve `"auto"`, `"cpu"` or `"cuda"` to a torch device.
pub fn select_device(name: &str) -> Device {
    let device = match name {
        "cpu" => Device::Cpu,
        "cuda" | "gpu" => {
            if tch::Cuda::is_available() {
                Device::Cuda(0)
            } else {
                warn!("CUDA requested but not available, using CPU");
                Device::Cpu
            }
        }
        "auto" => Device::cuda_if_available(),
        other => {
            warn!(device = other, "unknown device name, using auto selection");
            Device::cuda_if_available()
        }
    };
    info!(?device, "using device");
    device
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One id per whitespace token wrapped in start/end markers.
    struct WordTokenizer;

    impl SequenceTokenizer for WordTokenizer {
        fn token_ids(&self, text: &str, max_length: usize) -> Vec<i64> {
            let mut ids = vec![0];
            ids.extend(text.split_whitespace().map(|w| w.len() as i64 + 10));
            ids.truncate(max_length.saturating_sub(1));
            ids.push(2);
            ids
        }

        fn pad_id(&self) -> i64 {
            1
        }
    }

    #[test]
    fn test_pad_short_sequence() {
        let encoded = pad_to_length(vec![0, 42, 2], 6, 1);
        assert_eq!(encoded.input_ids, vec![0, 42, 2, 1, 1, 1]);
        assert_eq!(encoded.attention_mask, vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_truncate_long_sequence() {
        let encoded = pad_to_length((0..10).collect(), 4, 1);
        assert_eq!(encoded.input_ids, vec![0, 1, 2, 3]);
        assert_eq!(encoded.attention_mask, vec![1; 4]);
    }

    #[test]
    fn test_encode_uses_tokenizer_pad_id() {
        let encoded = WordTokenizer.encode("you won't believe", 8);
        assert_eq!(encoded.input_ids.len(), 8);
        assert_eq!(encoded.input_ids[..5], [0, 13, 15, 17, 2]);
        assert_eq!(encoded.input_ids[5..], [1, 1, 1]);
        assert_eq!(encoded.attention_mask.iter().sum::<i64>(), 5);
    }

    #[test]
    fn test_cpu_device() {
        assert_eq!(select_device("cpu"), Device::Cpu);
    }
}
