//! Latent Dirichlet Allocation fitted with variational Bayes.
//!
//! The model keeps the topic-word sufficient statistics `sstats` (K x V);
//! the variational topic-word parameter is `lambda = eta + sstats`. The
//! corpus is processed in chunks, each document running an E-step against
//! `lambda`. Two update modes exist:
//!
//! - **batch** (default): every chunk of a pass sees the same `lambda`, the
//!   statistics of the whole pass are summed, and one M-step blends them in
//!   with weight `rho`. The result does not depend on `chunksize`.
//! - **online**: each chunk is blended in as soon as it is processed, its
//!   statistics scaled up to the corpus size.
//!
//! Reference: Hoffman, Blei & Bach, "Online Learning for Latent Dirichlet
//! Allocation", NIPS 2010.

use super::config::TopicConfig;
use super::dictionary::{BagOfWords, Dictionary};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Shape/scale of the Gamma used to initialise statistics and E-step gammas.
const GAMMA_SHAPE: f64 = 100.0;
const GAMMA_SCALE: f64 = 1.0 / 100.0;

/// Guards `phinorm` against division by zero.
const PHI_EPSILON: f64 = 1e-100;

/// Fitted topic model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdaModel {
    pub num_topics: usize,
    pub num_terms: usize,
    /// Document-topic Dirichlet prior, one entry per topic
    pub alpha: Vec<f64>,
    /// Topic-word Dirichlet prior (symmetric)
    pub eta: f64,
    /// Topic-word sufficient statistics (num_topics x num_terms)
    pub sstats: Array2<f64>,
    pub iterations: usize,
    pub gamma_threshold: f64,
    pub minimum_probability: f64,
    pub decay: f64,
    pub offset: f64,
    /// Documents seen by online updates
    pub num_updates: usize,
    /// Seed used for inference on unseen documents
    pub random_state: u64,
}

/// Result of the per-document E-step.
struct DocumentInference {
    gamma: Array1<f64>,
    /// Contribution to the sufficient statistics for the document's term ids
    /// (num_topics x len(bow)), before multiplication by exp(E[log beta]).
    sstats: Array2<f64>,
}

impl LdaModel {
    /// Create an untrained model with random statistics.
    pub fn new(num_terms: usize, config: &TopicConfig) -> Result<Self> {
        if config.num_topics == 0 {
            return Err(Error::InvalidArgument("num_topics must be positive".to_string()));
        }
        let k = config.num_topics;
        let prior = 1.0 / k as f64;
        let mut rng = StdRng::seed_from_u64(config.random_state);
        let gamma = gamma_distribution();
        let sstats = Array2::from_shape_fn((k, num_terms), |_| gamma.sample(&mut rng));

        Ok(LdaModel {
            num_topics: k,
            num_terms,
            alpha: vec![prior; k],
            eta: prior,
            sstats,
            iterations: config.iterations,
            gamma_threshold: config.gamma_threshold,
            minimum_probability: config.minimum_probability,
            decay: config.decay,
            offset: config.offset,
            num_updates: 0,
            random_state: config.random_state,
        })
    }

    /// Fit a model over a bag-of-words corpus.
    pub fn fit(corpus: &[BagOfWords], num_terms: usize, config: &TopicConfig) -> Result<Self> {
        if corpus.is_empty() || num_terms == 0 {
            return Err(Error::EmptyCorpus(
                "cannot fit a topic model on an empty corpus".to_string(),
            ));
        }
        let mut model = LdaModel::new(num_terms, config)?;
        let mut rng = StdRng::seed_from_u64(config.random_state.wrapping_add(1));
        let chunksize = config.chunksize.max(1);

        info!(
            documents = corpus.len(),
            terms = num_terms,
            topics = model.num_topics,
            passes = config.passes,
            "fitting LDA"
        );

        for pass in 0..config.passes.max(1) {
            if config.batch {
                let rho = model.batch_update(corpus, pass, chunksize, &mut rng);
                debug!(pass, rho, "LDA batch update");
            } else {
                for (chunk_no, chunk) in corpus.chunks(chunksize).enumerate() {
                    let rho = model.online_update(chunk, corpus.len(), pass, chunksize, &mut rng);
                    debug!(pass, chunk = chunk_no, rho, "LDA online update");
                }
            }
        }
        Ok(model)
    }

    /// One pass in batch mode: E-step over every chunk against the same
    /// `lambda`, then a single M-step. Returns the blend weight used.
    fn batch_update(
        &mut self,
        corpus: &[BagOfWords],
        pass: usize,
        chunksize: usize,
        rng: &mut StdRng,
    ) -> f64 {
        let exp_elog_beta = self.exp_elog_beta();
        let mut pass_sstats = Array2::<f64>::zeros(self.sstats.raw_dim());
        for chunk in corpus.chunks(chunksize) {
            self.accumulate(chunk, &exp_elog_beta, &mut pass_sstats, rng);
        }
        pass_sstats *= &exp_elog_beta;

        let rho = self.rho(pass, chunksize);
        self.blend(&pass_sstats, rho, 1.0);
        self.num_updates += corpus.len();
        rho
    }

    /// One online update over `chunk`; returns the blend weight used.
    fn online_update(
        &mut self,
        chunk: &[BagOfWords],
        total_docs: usize,
        pass: usize,
        chunksize: usize,
        rng: &mut StdRng,
    ) -> f64 {
        let exp_elog_beta = self.exp_elog_beta();
        let mut chunk_sstats = Array2::<f64>::zeros(self.sstats.raw_dim());
        self.accumulate(chunk, &exp_elog_beta, &mut chunk_sstats, rng);
        chunk_sstats *= &exp_elog_beta;

        let rho = self.rho(pass, chunksize);
        self.blend(&chunk_sstats, rho, total_docs as f64 / chunk.len() as f64);
        self.num_updates += chunk.len();
        rho
    }

    /// Add the E-step statistics of `chunk` into `sstats`, column per term id.
    fn accumulate(
        &self,
        chunk: &[BagOfWords],
        exp_elog_beta: &Array2<f64>,
        sstats: &mut Array2<f64>,
        rng: &mut StdRng,
    ) {
        for bow in chunk {
            let inference = self.infer(bow, exp_elog_beta, rng);
            for (j, &(id, _)) in bow.iter().enumerate() {
                let mut column = sstats.column_mut(id);
                column += &inference.sstats.column(j);
            }
        }
    }

    fn rho(&self, pass: usize, chunksize: usize) -> f64 {
        (self.offset + pass as f64 + self.num_updates as f64 / chunksize as f64).powf(-self.decay)
    }

    /// `sstats = (1 - rho) * sstats + rho * scale * update`
    fn blend(&mut self, update: &Array2<f64>, rho: f64, scale: f64) {
        Zip::from(&mut self.sstats)
            .and(update)
            .for_each(|s, &u| *s = (1.0 - rho) * *s + rho * scale * u);
    }

    /// Variational topic-word parameter.
    pub fn lambda(&self) -> Array2<f64> {
        &self.sstats + self.eta
    }

    fn exp_elog_beta(&self) -> Array2<f64> {
        dirichlet_expectation_2d(&self.lambda()).mapv(f64::exp)
    }

    /// Per-document E-step: iterate `gamma` to a fixed point.
    fn infer(
        &self,
        bow: &[(usize, u32)],
        exp_elog_beta: &Array2<f64>,
        rng: &mut StdRng,
    ) -> DocumentInference {
        let k = self.num_topics;
        let alpha = Array1::from(self.alpha.clone());

        if bow.is_empty() {
            return DocumentInference {
                gamma: alpha,
                sstats: Array2::zeros((k, 0)),
            };
        }

        let ids: Vec<usize> = bow.iter().map(|&(id, _)| id).collect();
        let counts: Array1<f64> = bow.iter().map(|&(_, c)| c as f64).collect();
        let exp_elog_betad = exp_elog_beta.select(Axis(1), &ids);

        let dist = gamma_distribution();
        let mut gamma: Array1<f64> = (0..k).map(|_| dist.sample(&mut *rng)).collect();
        let mut exp_elog_thetad = dirichlet_expectation_1d(gamma.view()).mapv(f64::exp);
        let mut phinorm = exp_elog_thetad.dot(&exp_elog_betad) + PHI_EPSILON;

        for _ in 0..self.iterations {
            let last = gamma.clone();
            let weighted = &counts / &phinorm;
            gamma = &alpha + &(&exp_elog_thetad * &exp_elog_betad.dot(&weighted));
            exp_elog_thetad = dirichlet_expectation_1d(gamma.view()).mapv(f64::exp);
            phinorm = exp_elog_thetad.dot(&exp_elog_betad) + PHI_EPSILON;

            let mean_change = (&gamma - &last).mapv(f64::abs).mean().unwrap_or(0.0);
            if mean_change < self.gamma_threshold {
                break;
            }
        }

        let weighted = &counts / &phinorm;
        let sstats = outer(&exp_elog_thetad, &weighted);
        DocumentInference { gamma, sstats }
    }

    /// Topic distribution of a document, dropping topics below
    /// `minimum_probability`.
    ///
    /// Inference is seeded from the model, so the same document always gets
    /// the same distribution.
    pub fn get_document_topics(&self, bow: &[(usize, u32)]) -> Vec<(usize, f64)> {
        let bow: Vec<(usize, u32)> = bow
            .iter()
            .copied()
            .filter(|&(id, _)| id < self.num_terms)
            .collect();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let exp_elog_beta = self.exp_elog_beta();
        let gamma = self.infer(&bow, &exp_elog_beta, &mut rng).gamma;

        let total = gamma.sum();
        gamma
            .iter()
            .enumerate()
            .map(|(topic, &g)| (topic, g / total))
            .filter(|&(_, p)| p >= self.minimum_probability)
            .collect()
    }

    /// Dense topic-probability vector; dropped topics are zero.
    pub fn topic_features(&self, bow: &[(usize, u32)]) -> Vec<f32> {
        let mut features = vec![0.0f32; self.num_topics];
        for (topic, prob) in self.get_document_topics(bow) {
            features[topic] = prob as f32;
        }
        features
    }

    /// The `topn` most probable terms of `topic` with their probabilities.
    pub fn show_topic(&self, topic: usize, topn: usize) -> Vec<(usize, f64)> {
        if topic >= self.num_topics {
            return Vec::new();
        }
        let lambda = self.lambda();
        let row = lambda.row(topic);
        let total = row.sum();
        let mut terms: Vec<(usize, f64)> =
            row.iter().enumerate().map(|(id, &w)| (id, w / total)).collect();
        terms.sort_by(|a, b| b.1.total_cmp(&a.1));
        terms.truncate(topn);
        terms
    }

    /// Human-readable summary of a topic, e.g. `0.031*"you" + 0.020*"this"`.
    pub fn format_topic(&self, topic: usize, topn: usize, dictionary: &Dictionary) -> String {
        self.show_topic(topic, topn)
            .iter()
            .map(|&(id, p)| format!("{:.3}*\"{}\"", p, dictionary.get(id).unwrap_or("?")))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn gamma_distribution() -> Gamma<f64> {
    Gamma::new(GAMMA_SHAPE, GAMMA_SCALE)
        .unwrap_or_else(|_| unreachable!("shape and scale are positive constants"))
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let column = a.view().insert_axis(Axis(1));
    let row = b.view().insert_axis(Axis(0));
    &column * &row
}

/// E[log theta] for theta ~ Dir(alpha).
pub fn dirichlet_expectation_1d(alpha: ArrayView1<f64>) -> Array1<f64> {
    let psi_total = digamma(alpha.sum());
    alpha.mapv(|a| digamma(a) - psi_total)
}

/// Row-wise E[log theta] for each row of `alpha`.
pub fn dirichlet_expectation_2d(alpha: &Array2<f64>) -> Array2<f64> {
    let psi_rows = alpha.sum_axis(Axis(1)).mapv(digamma);
    let mut out = alpha.mapv(digamma);
    for (mut row, psi) in out.axis_iter_mut(Axis(0)).zip(psi_rows.iter()) {
        row -= *psi;
    }
    out
}

/// Digamma function via recurrence and asymptotic expansion.
pub fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid::dictionary::tokenize;

    fn small_config(num_topics: usize) -> TopicConfig {
        TopicConfig {
            num_topics,
            passes: 50,
            chunksize: 4,
            ..TopicConfig::default()
        }
    }

    fn two_theme_corpus() -> (Dictionary, Vec<BagOfWords>) {
        let texts = [
            "goal match striker goal league",
            "league striker match goal",
            "match goal striker league",
            "striker goal league match",
            "vote senate bill vote election",
            "senate election vote bill",
            "bill vote senate election",
            "election bill senate vote",
        ];
        let tokens: Vec<Vec<&str>> = texts.iter().map(|t| tokenize(t)).collect();
        let dictionary = Dictionary::from_documents(&tokens);
        let corpus = tokens.iter().map(|t| dictionary.doc2bow(t)).collect();
        (dictionary, corpus)
    }

    #[test]
    fn test_digamma_known_values() {
        assert!((digamma(1.0) + 0.577_215_664_9).abs() < 1e-8);
        assert!((digamma(0.5) + 1.963_510_026_0).abs() < 1e-8);
        assert!((digamma(10.0) - 2.251_752_589_1).abs() < 1e-8);
    }

    #[test]
    fn test_dirichlet_expectation_rows() {
        let alpha = Array2::from_shape_vec((2, 2), vec![1.0, 1.0, 2.0, 3.0]).unwrap();
        let e = dirichlet_expectation_2d(&alpha);
        let expected = dirichlet_expectation_1d(alpha.row(1));
        assert!((e[[1, 0]] - expected[0]).abs() < 1e-12);
        assert!((e[[0, 0]] - (digamma(1.0) - digamma(2.0))).abs() < 1e-12);
    }

    #[test]
    fn test_document_topics_sum_to_one() {
        let (dictionary, corpus) = two_theme_corpus();
        let model = LdaModel::fit(&corpus, dictionary.len(), &small_config(2)).unwrap();

        let topics = model.get_document_topics(&corpus[0]);
        let total: f64 = topics.iter().map(|&(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(topics.iter().all(|&(_, p)| p >= model.minimum_probability));
    }

    #[test]
    fn test_separates_themes() {
        let (dictionary, corpus) = two_theme_corpus();
        let model = LdaModel::fit(&corpus, dictionary.len(), &small_config(2)).unwrap();

        let dominant = |bow: &BagOfWords| {
            let f = model.topic_features(bow);
            if f[0] >= f[1] {
                0
            } else {
                1
            }
        };
        let sport = dominant(&corpus[0]);
        let politics = dominant(&corpus[4]);
        assert_ne!(sport, politics);
        assert!(corpus[..4].iter().all(|d| dominant(d) == sport));
        assert!(corpus[4..].iter().all(|d| dominant(d) == politics));
    }

    #[test]
    fn test_inference_is_deterministic() {
        let (dictionary, corpus) = two_theme_corpus();
        let model = LdaModel::fit(&corpus, dictionary.len(), &small_config(3)).unwrap();
        assert_eq!(model.topic_features(&corpus[2]), model.topic_features(&corpus[2]));
    }

    #[test]
    fn test_empty_document_uses_prior() {
        let (dictionary, corpus) = two_theme_corpus();
        let model = LdaModel::fit(&corpus, dictionary.len(), &small_config(4)).unwrap();
        let features = model.topic_features(&[]);
        assert_eq!(features.len(), 4);
        assert!(features.iter().all(|&p| (p - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_minimum_probability_zeroes_features() {
        let (dictionary, corpus) = two_theme_corpus();
        let mut model = LdaModel::fit(&corpus, dictionary.len(), &small_config(2)).unwrap();
        model.minimum_probability = 1.1;
        assert!(model.get_document_topics(&corpus[0]).is_empty());
        assert_eq!(model.topic_features(&corpus[0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_out_of_vocabulary_ids_ignored() {
        let (dictionary, corpus) = two_theme_corpus();
        let model = LdaModel::fit(&corpus, dictionary.len(), &small_config(2)).unwrap();
        let mut bow = corpus[0].clone();
        bow.push((dictionary.len() + 5, 3));
        assert_eq!(model.topic_features(&bow), model.topic_features(&corpus[0]));
    }

    #[test]
    fn test_batch_fit_ignores_chunksize() {
        let (dictionary, corpus) = two_theme_corpus();
        let fit = |chunksize| {
            let config = TopicConfig {
                num_topics: 2,
                passes: 3,
                chunksize,
                ..TopicConfig::default()
            };
            LdaModel::fit(&corpus, dictionary.len(), &config).unwrap()
        };
        let whole = fit(100);
        let chunked = fit(2);

        let diff: f64 = (&whole.sstats - &chunked.sstats).mapv(f64::abs).sum();
        assert!(diff < 1e-9, "sstats differ by {}", diff);
        assert_eq!(whole.topic_features(&corpus[0]), chunked.topic_features(&corpus[0]));
    }

    #[test]
    fn test_single_batch_pass_replaces_initial_statistics() {
        let (dictionary, corpus) = two_theme_corpus();
        let config = TopicConfig {
            num_topics: 2,
            passes: 1,
            ..TopicConfig::default()
        };
        let model = LdaModel::fit(&corpus, dictionary.len(), &config).unwrap();

        // rho is 1 on the first pass, so sstats hold exactly the expected
        // word counts of the corpus.
        let total_tokens: f64 = corpus
            .iter()
            .flat_map(|bow| bow.iter().map(|&(_, c)| c as f64))
            .sum();
        assert!((model.sstats.sum() - total_tokens).abs() < 1e-6);
        assert_eq!(model.num_updates, corpus.len());
    }

    #[test]
    fn test_online_mode_separates_themes() {
        let (dictionary, corpus) = two_theme_corpus();
        let config = TopicConfig {
            batch: false,
            ..small_config(2)
        };
        let model = LdaModel::fit(&corpus, dictionary.len(), &config).unwrap();
        let f_sport = model.topic_features(&corpus[0]);
        let f_politics = model.topic_features(&corpus[4]);
        assert_ne!(f_sport[0] >= f_sport[1], f_politics[0] >= f_politics[1]);
    }

    #[test]
    fn test_empty_corpus_rejected() {
        assert!(LdaModel::fit(&[], 10, &TopicConfig::default()).is_err());
    }

    #[test]
    fn test_show_topic_and_save_load() {
        let (dictionary, corpus) = two_theme_corpus();
        let model = LdaModel::fit(&corpus, dictionary.len(), &small_config(2)).unwrap();

        let top = model.show_topic(0, 3);
        assert_eq!(top.len(), 3);
        assert!(top[0].1 >= top[1].1 && top[1].1 >= top[2].1);
        assert!(model.format_topic(0, 2, &dictionary).contains('*'));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lda.json");
        model.save(&path).unwrap();
        let loaded = LdaModel::load(&path).unwrap();
        assert_eq!(loaded.topic_features(&corpus[5]), model.topic_features(&corpus[5]));
    }
}
