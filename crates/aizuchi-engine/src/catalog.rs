use serde::{Deserialize, Serialize};

/// Fixed set of backchannel tokens a cue is drawn from.
///
/// Tokens are identifiers for the host's playback assets; the engine never
/// touches audio. Selection is uniform over the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueCatalog {
    tokens: Vec<String>,
}

impl Default for CueCatalog {
    fn default() -> Self {
        Self {
            tokens: vec!["un".into(), "hai".into(), "ee".into()],
        }
    }
}

impl CueCatalog {
    /// An empty token list falls back to the built-in catalog so a cue can
    /// always be drawn.
    pub fn new(tokens: Vec<String>) -> Self {
        if tokens.is_empty() {
            Self::default()
        } else {
            Self { tokens }
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Uniform draw using the supplied rng, keeping selection deterministic
    /// under a seeded generator.
    pub fn pick(&self, rng: &mut fastrand::Rng) -> &str {
        &self.tokens[rng.usize(..self.tokens.len())]
    }
}
