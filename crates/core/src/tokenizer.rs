//! Tokenizer abstraction (C3): count/encode/decode/trim text to
//! model-specific token budgets. Polymorphic over encoders in the source
//! (BPE, SentencePiece, HF); this crate ships one concrete encoder backed
//! by `tiktoken-rs`, behind the same [`Tokenizer`] trait other adapters
//! (Hugging Face, SentencePiece) could implement.

use cognee_common::{CogneeError, Result};
use tiktoken_rs::CoreBPE;

/// Contract shared by every tokenizer implementation.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens `text` encodes to.
    fn count_tokens(&self, text: &str) -> usize {
        self.extract_tokens(text).len()
    }

    /// Encode `text` into its token ids, in order.
    fn extract_tokens(&self, text: &str) -> Vec<u32>;

    /// Decode a single token id back to its string form.
    fn decode_single_token(&self, id: u32) -> Result<String>;

    /// Return a prefix of `text` whose token length is at most
    /// `max_completion_tokens`. Prefix-preserving: encode, truncate,
    /// decode — never re-orders or rewrites surviving tokens.
    fn trim_to_max(&self, text: &str, max_completion_tokens: usize) -> Result<String> {
        let tokens = self.extract_tokens(text);
        if tokens.len() <= max_completion_tokens {
            return Ok(text.to_string());
        }
        self.decode_tokens(&tokens[..max_completion_tokens])
    }

    /// Decode a run of token ids back to text.
    fn decode_tokens(&self, ids: &[u32]) -> Result<String>;
}

/// BPE tokenizer backed by `tiktoken-rs`, bound to a specific model's
/// encoding (e.g. `cl100k_base` for GPT-4-class models).
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    /// Build a tokenizer for the named model, falling back to `cl100k_base`
    /// if the model isn't recognized by `tiktoken-rs`.
    pub fn for_model(model: &str) -> Self {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .unwrap_or_else(|_| tiktoken_rs::cl100k_base().expect("cl100k_base must load"));
        Self { bpe }
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn extract_tokens(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_with_special_tokens(text)
    }

    fn decode_single_token(&self, id: u32) -> Result<String> {
        self.bpe
            .decode(vec![id])
            .map_err(|e| CogneeError::InvalidValueError(format!("undecodable token {id}: {e}")))
    }

    fn decode_tokens(&self, ids: &[u32]) -> Result<String> {
        self.bpe
            .decode(ids.to_vec())
            .map_err(|e| CogneeError::InvalidValueError(format!("undecodable token run: {e}")))
    }
}
