//! Publish metadata for a finished album video.

use serde::{Deserialize, Serialize};

/// Metadata handed to the video publishing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    /// Platform category id. "10" is Music on YouTube.
    pub category_id: String,
    pub tags: Vec<String>,
    /// Upload visibility. Albums are always uploaded private and
    /// published manually after review.
    pub privacy: String,
}

impl VideoMetadata {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category_id: "10".to_string(),
            tags: vec!["lofi".to_string(), "album".to_string(), "music".to_string()],
            privacy: "private".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let meta = VideoMetadata::new("Sip", "a quiet album");
        assert_eq!(meta.category_id, "10");
        assert_eq!(meta.privacy, "private");
        assert!(meta.tags.contains(&"lofi".to_string()));
    }
}
