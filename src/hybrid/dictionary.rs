//! Term dictionary and bag-of-words conversion for the topic model.
//!
//! Documents are tokenized by splitting on whitespace with no further
//! normalisation, so `"Shocking"` and `"shocking"` are distinct terms.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Sparse document: `(term id, count)` pairs sorted by term id.
pub type BagOfWords = Vec<(usize, u32)>;

/// Split a text into the tokens the dictionary works with.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Mapping between tokens and integer ids with corpus statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    /// Token to id mapping
    pub token2id: HashMap<String, usize>,
    /// Id to token mapping
    pub id2token: Vec<String>,
    /// Number of documents each term appears in, indexed by id
    pub dfs: Vec<usize>,
    /// Documents processed
    pub num_docs: usize,
    /// Tokens processed
    pub num_pos: usize,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary over already-tokenized documents.
    pub fn from_documents<D, S>(documents: &[D]) -> Self
    where
        D: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut dictionary = Dictionary::new();
        for doc in documents {
            dictionary.add_document(doc.as_ref());
        }
        dictionary
    }

    /// Register the tokens of one document.
    ///
    /// Tokens new to the dictionary receive ids in sorted token order.
    pub fn add_document<S: AsRef<str>>(&mut self, tokens: &[S]) {
        let unique: BTreeSet<&str> = tokens.iter().map(|t| t.as_ref()).collect();

        for token in &unique {
            if !self.token2id.contains_key(*token) {
                let id = self.id2token.len();
                self.token2id.insert((*token).to_string(), id);
                self.id2token.push((*token).to_string());
                self.dfs.push(0);
            }
        }
        for token in &unique {
            self.dfs[self.token2id[*token]] += 1;
        }

        self.num_docs += 1;
        self.num_pos += tokens.len();
    }

    /// Count known tokens; unknown tokens are ignored.
    pub fn doc2bow<S: AsRef<str>>(&self, tokens: &[S]) -> BagOfWords {
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token.as_ref()) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: BagOfWords = counts.into_iter().collect();
        bow.sort_unstable_by_key(|&(id, _)| id);
        bow
    }

    /// Tokenize `text` and convert it to a bag of words.
    pub fn text2bow(&self, text: &str) -> BagOfWords {
        self.doc2bow(&tokenize(text))
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.id2token.get(id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }

    /// Save the dictionary to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a dictionary from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
