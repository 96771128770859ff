//! Label-partitioned corpus loading and the train/test split.

use super::config::DataConfig;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Texts with their (string) labels, index-aligned.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    pub texts: Vec<String>,
    pub labels: Vec<String>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Append the lines of one file, all tagged with `label`.
    pub fn extend_from_file(
        &mut self,
        path: impl AsRef<Path>,
        label: &str,
        chunk_size: usize,
    ) -> Result<()> {
        let (texts, labels) = load_data_in_chunks(path, label, chunk_size)?;
        self.texts.extend(texts);
        self.labels.extend(labels);
        Ok(())
    }
}

/// Read `path` line by line, accumulating `chunk_size` lines before moving
/// them into the output lists.
///
/// Every line is trimmed and tagged with `label`; empty lines are kept.
pub fn load_data_in_chunks(
    path: impl AsRef<Path>,
    label: &str,
    chunk_size: usize,
) -> Result<(Vec<String>, Vec<String>)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
    })?;
    let reader = BufReader::new(file);
    let chunk_size = chunk_size.max(1);

    let mut texts = Vec::new();
    let mut labels = Vec::new();
    let mut chunk: Vec<String> = Vec::with_capacity(chunk_size);
    let mut chunks = 0usize;

    for line in reader.lines() {
        chunk.push(line?.trim().to_string());
        if chunk.len() >= chunk_size {
            labels.extend(std::iter::repeat(label.to_string()).take(chunk.len()));
            texts.append(&mut chunk);
            chunks += 1;
        }
    }
    if !chunk.is_empty() {
        labels.extend(std::iter::repeat(label.to_string()).take(chunk.len()));
        texts.append(&mut chunk);
        chunks += 1;
    }

    debug!(path = %path.display(), lines = texts.len(), chunks, "read corpus file");
    Ok((texts, labels))
}

/// Load every configured source in order.
pub fn load_corpus(config: &DataConfig) -> Result<Corpus> {
    let mut corpus = Corpus::default();
    for source in &config.sources {
        let before = corpus.len();
        corpus.extend_from_file(&source.path, &source.label, config.chunk_size)?;
        info!(
            path = %source.path,
            label = %source.label,
            examples = corpus.len() - before,
            "loaded source"
        );
    }
    if corpus.is_empty() {
        return Err(Error::EmptyCorpus(
            "no lines found in any configured source".to_string(),
        ));
    }
    Ok(corpus)
}

/// Shuffled split of `0..n` into (train, test) index lists.
///
/// The test side receives `ceil(n * test_size)` indices. The same seed always
/// yields the same split.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_size.clamp(0.0, 1.0)).ceil() as usize;
    let n_test = n_test.min(n);
    let train = indices[n_test..].to_vec();
    indices.truncate(n_test);
    (train, indices)
}

/// Pick the elements of `items` at `indices`.
pub fn gather<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid::config::SourceConfig;
    use std::collections::HashSet;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> String {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_chunked_load_keeps_every_line() {
        let dir = tempdir().unwrap();
        let lines: Vec<String> = (0..7).map(|i| format!("  headline {}  ", i)).collect();
        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let path = write_lines(dir.path(), "cb.txt", &refs);

        let (texts, labels) = load_data_in_chunks(&path, "clickbait", 3).unwrap();
        assert_eq!(texts.len(), 7);
        assert_eq!(texts[0], "headline 0");
        assert_eq!(texts[6], "headline 6");
        assert!(labels.iter().all(|l| l == "clickbait"));
    }

    #[test]
    fn test_empty_lines_are_kept() {
        let dir = tempdir().unwrap();
        let path = write_lines(dir.path(), "x.txt", &["a", "", "b"]);
        let (texts, _) = load_data_in_chunks(&path, "x", 1000).unwrap();
        assert_eq!(texts, vec!["a", "", "b"]);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_data_in_chunks("no/such/file.txt", "x", 10).unwrap_err();
        assert!(err.to_string().contains("no/such/file.txt"));
    }

    #[test]
    fn test_load_corpus_in_source_order() {
        let dir = tempdir().unwrap();
        let a = write_lines(dir.path(), "a.txt", &["you won't believe", "shocking"]);
        let b = write_lines(dir.path(), "b.txt", &["council approves budget"]);
        let config = DataConfig {
            sources: vec![
                SourceConfig { path: a, label: "clickbait".into() },
                SourceConfig { path: b, label: "not clickbait".into() },
            ],
            ..DataConfig::default()
        };

        let corpus = load_corpus(&config).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.labels, vec!["clickbait", "clickbait", "not clickbait"]);
    }

    #[test]
    fn test_empty_corpus_is_error() {
        let dir = tempdir().unwrap();
        let a = write_lines(dir.path(), "a.txt", &[]);
        let config = DataConfig {
            sources: vec![SourceConfig { path: a, label: "x".into() }],
            ..DataConfig::default()
        };
        assert!(matches!(load_corpus(&config), Err(Error::EmptyCorpus(_))));
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(101, 0.2, 42);
        assert_eq!(test.len(), 21);
        assert_eq!(train.len(), 80);

        let all: HashSet<usize> = train.iter().chain(test.iter()).copied().collect();
        assert_eq!(all.len(), 101);
    }

    #[test]
    fn test_split_is_deterministic() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
        assert_ne!(train_test_split(50, 0.2, 42).1, train_test_split(50, 0.2, 7).1);
    }
}
