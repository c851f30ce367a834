//! Search-related models for ranked results and assembled context.

use serde::{Deserialize, Serialize};

use super::document::ChunkPayload;

/// Output format for retrieval results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A single ranked hit from the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Insertion id of the matching entry
    pub id: u64,

    /// Cosine similarity to the query, in [-1, 1]
    pub score: f32,

    pub payload: ChunkPayload,
}

/// What a pipeline query hands to the generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// Normalized form of the user's query
    pub query: String,

    /// Ranked passages formatted as one context block
    pub context: String,

    /// Ranked results, best first
    pub results: Vec<SearchResult>,
}

impl RetrievalOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_outcome_serializes_results() {
        let outcome = RetrievalOutcome {
            query: "cats".to_string(),
            context: String::new(),
            results: vec![SearchResult {
                id: 7,
                score: 0.5,
                payload: ChunkPayload {
                    text: "the cat sat".to_string(),
                    source_index: 0,
                    offset: 0,
                },
            }],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["results"][0]["id"], 7);
        assert_eq!(json["results"][0]["payload"]["text"], "the cat sat");
        assert_eq!(outcome.len(), 1);
    }
}
