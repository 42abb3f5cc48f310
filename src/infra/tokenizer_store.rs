// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and loads the word-level tokenizer used by text
// datasets. The tokenizer lives next to the checkpoints as
// tokenizer.json, so training, evaluation and prediction all see
// the same vocabulary.
//
// In tokenizers 0.15, train_from_files requires Trainer::Model
// to equal ModelWrapper. Instead we write the tokenizer JSON
// ourselves and load it back with Tokenizer::from_file.
//
// Ids are contiguous so every id fits the embedding table:
//   [PAD]=0  [UNK]=1  [CLS]=2  [SEP]=3  then words by frequency
//
// Reference: HuggingFace tokenizers JSON format

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use tokenizers::Tokenizer;

use crate::domain::error::DataError;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const CLS_ID: u32 = 2;
pub const SEP_ID: u32 = 3;

const SPECIAL_TOKENS: [(&str, u32); 4] = [
    ("[PAD]", PAD_ID),
    ("[UNK]", UNK_ID),
    ("[CLS]", CLS_ID),
    ("[SEP]", SEP_ID),
];

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Load the saved tokenizer, or build one from `texts`.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer, DataError> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer, DataError> {
        let path = self.path();
        Tokenizer::from_file(&path).map_err(|e| corrupt(&path, e))
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer, DataError> {
        let path = self.path();
        fs::create_dir_all(&self.dir).map_err(|e| corrupt(&path, e))?;

        // ── Step 1: Count word frequencies ────────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.split_whitespace() {
                let w = word.to_lowercase();
                let w = w.trim_matches(|c: char| !c.is_alphanumeric());
                if !w.is_empty() {
                    *freq.entry(w.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Frequency descending, ties alphabetical, so rebuilds agree
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIAL_TOKENS.len()));

        // ── Step 2: Build the vocabulary ──────────────────────────────────────
        let mut vocab = serde_json::Map::new();
        for (token, id) in SPECIAL_TOKENS {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
        for (next_id, (word, _)) in (SPECIAL_TOKENS.len()..).zip(&words) {
            vocab.insert(word.clone(), serde_json::json!(next_id));
        }

        // ── Step 3: Write tokenizer JSON in HuggingFace format ────────────────
        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .map(|(content, id)| serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let json = serde_json::to_string_pretty(&tokenizer_json).map_err(|e| corrupt(&path, e))?;
        fs::write(&path, json).map_err(|e| corrupt(&path, e))?;

        tracing::info!(
            "Tokenizer built with {} tokens, saved to '{}'",
            words.len() + SPECIAL_TOKENS.len(),
            path.display()
        );
        self.load()
    }
}

fn corrupt(path: &Path, e: impl ToString) -> DataError {
    DataError::Corrupt { path: path.to_path_buf(), message: e.to_string() }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_contiguous_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let texts = vec!["alpha beta beta gamma".to_string(), "delta alpha".to_string()];

        let tokenizer = store.load_or_build(&texts, 6).unwrap();
        assert_eq!(tokenizer.get_vocab_size(true), 6);

        let ids = tokenizer.encode("alpha beta zeta", false).unwrap().get_ids().to_vec();
        assert!(ids.iter().all(|&id| id < 6));
        // "zeta" was never seen
        assert_eq!(*ids.last().unwrap(), UNK_ID);
    }

    #[test]
    fn test_saved_tokenizer_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        store.load_or_build(&["one two".to_string()], 16).unwrap();
        assert!(store.path().exists());

        // A different corpus does not rebuild the saved vocabulary
        let again = store.load_or_build(&["three four".to_string()], 16).unwrap();
        let ids = again.encode("three", false).unwrap().get_ids().to_vec();
        assert_eq!(ids, vec![UNK_ID]);
    }
}
