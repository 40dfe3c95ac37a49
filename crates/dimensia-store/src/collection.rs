//! Per-collection state shared by every store implementation.

use chrono::{DateTime, Utc};
use dimensia_core::{
    CollectionStats, Document, DocumentId, PendingDocument, SearchQuery, SearchResult,
    StoreError, StoredDocument,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::distance;

/// Longest accepted collection name, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Check that a collection name is non-empty, at most [`MAX_NAME_LEN`] bytes,
/// limited to `[A-Za-z0-9_.-]` and does not start with `.`.
///
/// Names double as snapshot file stems, so they must be safe path components.
pub fn validate_collection_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Documents and bookkeeping for one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionData {
    pub name: String,
    /// Embedding dimensionality, fixed at creation or by the first insert
    pub vector_size: Option<usize>,
    /// Model of the first embedded document
    pub embedding_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Id handed to the next inserted document
    next_id: DocumentId,
    documents: BTreeMap<DocumentId, StoredDocument>,
}

impl CollectionData {
    /// Create an empty collection.
    pub fn new(name: &str, vector_size: Option<usize>) -> Result<Self, StoreError> {
        validate_collection_name(name)?;
        if vector_size == Some(0) {
            return Err(StoreError::Init("vector size must be positive".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            vector_size,
            embedding_model: None,
            created_at: Utc::now(),
            updated_at: None,
            next_id: 1,
            documents: BTreeMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Insert documents, assigning consecutive ids in input order.
    ///
    /// The whole batch is rejected if any vector has the wrong size.
    pub fn insert(&mut self, documents: Vec<PendingDocument>) -> Result<Vec<DocumentId>, StoreError> {
        let Some(first) = documents.first() else {
            return Ok(Vec::new());
        };

        let expected = self.vector_size.unwrap_or(first.embedding.len());
        if expected == 0 {
            return Err(StoreError::Insert("empty embedding vector".to_string()));
        }
        if let Some(bad) = documents.iter().find(|d| d.embedding.len() != expected) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        self.vector_size = Some(expected);
        if self.embedding_model.is_none() {
            self.embedding_model = first.embedding_model.clone();
        }

        let now = Utc::now();
        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = self.next_id;
            self.next_id += 1;
            self.documents.insert(
                id,
                StoredDocument {
                    id,
                    content: doc.content,
                    metadata: doc.metadata,
                    embedding: doc.embedding,
                    embedding_model: doc.embedding_model,
                    created_at: now,
                },
            );
            ids.push(id);
        }
        self.updated_at = Some(now);

        Ok(ids)
    }

    /// Brute-force ranking: non-increasing score, ties by ascending id.
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, StoreError> {
        if query.top_k == 0 || self.documents.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(expected) = self.vector_size {
            if query.embedding.len() != expected {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: query.embedding.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &StoredDocument)> = self
            .documents
            .values()
            .map(|doc| {
                let score = distance::score(query.metric, &query.embedding, &doc.embedding);
                let score = if score.is_nan() { f32::MIN } else { score };
                (score, doc)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        Ok(scored
            .into_iter()
            .take(query.top_k)
            .map(|(score, doc)| SearchResult {
                score,
                document: doc.to_document(),
            })
            .collect())
    }

    pub fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents.get(&id).map(StoredDocument::to_document)
    }

    /// Every document in id order.
    pub fn documents(&self) -> Vec<Document> {
        self.documents.values().map(StoredDocument::to_document).collect()
    }

    pub fn stats(&self) -> CollectionStats {
        let metadata_keys: BTreeSet<String> = self
            .documents
            .values()
            .flat_map(|doc| doc.metadata.keys().cloned())
            .collect();

        CollectionStats {
            name: self.name.clone(),
            document_count: self.documents.len() as u64,
            vector_size: self.vector_size,
            embedding_model: self.embedding_model.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            first_id: self.documents.keys().next().copied(),
            last_id: self.documents.keys().next_back().copied(),
            metadata_keys,
        }
    }

    /// Consistency check for state loaded from disk.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_collection_name(&self.name)?;

        for (id, doc) in &self.documents {
            if *id != doc.id {
                return Err(StoreError::Init(format!(
                    "document keyed {id} carries id {}",
                    doc.id
                )));
            }
            if *id >= self.next_id {
                return Err(StoreError::Init(format!(
                    "document id {id} not below next id {}",
                    self.next_id
                )));
            }
            if let Some(expected) = self.vector_size {
                if doc.embedding.len() != expected {
                    return Err(StoreError::DimensionMismatch {
                        expected,
                        actual: doc.embedding.len(),
                    });
                }
            }
        }

        if self.vector_size.is_none() && !self.documents.is_empty() {
            return Err(StoreError::Init(
                "documents present but vector size unset".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimensia_core::{DistanceMetric, Metadata};
    use serde_json::json;

    fn pending(content: &str, embedding: Vec<f32>) -> PendingDocument {
        PendingDocument {
            content: content.to_string(),
            metadata: Metadata::new(),
            embedding,
            embedding_model: Some("test-model".to_string()),
        }
    }

    fn query(embedding: Vec<f32>, top_k: usize) -> SearchQuery {
        SearchQuery {
            embedding,
            top_k,
            metric: DistanceMetric::Cosine,
        }
    }

    // ==================== Name Validation ====================

    #[test]
    fn test_valid_names() {
        for name in ["research_articles", "a", "v1.2-notes", "ABC123"] {
            assert!(validate_collection_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_invalid_names() {
        let too_long = "x".repeat(MAX_NAME_LEN + 1);
        for name in ["", ".hidden", "a/b", "..", "with space", "naïve", too_long.as_str()] {
            assert!(
                matches!(validate_collection_name(name), Err(StoreError::InvalidName(_))),
                "{name}"
            );
        }
    }

    // ==================== Insert ====================

    #[test]
    fn test_ids_start_at_one_and_follow_input_order() {
        let mut data = CollectionData::new("c", None).unwrap();
        let ids = data
            .insert(vec![
                pending("a", vec![1.0, 0.0]),
                pending("b", vec![0.0, 1.0]),
                pending("c", vec![1.0, 1.0]),
            ])
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(data.get(2).unwrap().content, "b");

        let more = data.insert(vec![pending("d", vec![1.0, 0.0])]).unwrap();
        assert_eq!(more, vec![4]);
    }

    #[test]
    fn test_first_insert_fixes_vector_size_and_model() {
        let mut data = CollectionData::new("c", None).unwrap();
        assert_eq!(data.vector_size, None);

        data.insert(vec![pending("a", vec![1.0, 0.0, 0.0])]).unwrap();
        assert_eq!(data.vector_size, Some(3));
        assert_eq!(data.embedding_model.as_deref(), Some("test-model"));
    }

    #[test]
    fn test_dimension_mismatch_rejects_whole_batch() {
        let mut data = CollectionData::new("c", Some(2)).unwrap();
        let err = data
            .insert(vec![pending("ok", vec![1.0, 0.0]), pending("bad", vec![1.0])])
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(data.is_empty());
        assert!(data.updated_at.is_none());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut data = CollectionData::new("c", None).unwrap();
        assert!(data.insert(Vec::new()).unwrap().is_empty());
        assert_eq!(data.vector_size, None);
    }

    #[test]
    fn test_empty_vector_rejected() {
        let mut data = CollectionData::new("c", None).unwrap();
        assert!(matches!(
            data.insert(vec![pending("a", vec![])]),
            Err(StoreError::Insert(_))
        ));
    }

    #[test]
    fn test_zero_vector_size_rejected() {
        assert!(CollectionData::new("c", Some(0)).is_err());
    }

    // ==================== Search ====================

    #[test]
    fn test_search_orders_by_score() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert(vec![
            pending("x", vec![1.0, 0.0, 0.0]),
            pending("y", vec![0.0, 1.0, 0.0]),
            pending("xy", vec![1.0, 1.0, 0.0]),
        ])
        .unwrap();

        let results = data.search(&query(vec![1.0, 0.0, 0.0], 3)).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.document.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert!((results[0].score - 1.0).abs() < 0.001);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_search_ties_break_by_id() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert(vec![
            pending("a", vec![0.0, 1.0]),
            pending("b", vec![0.0, 1.0]),
            pending("c", vec![0.0, 1.0]),
        ])
        .unwrap();

        let results = data.search(&query(vec![0.0, 1.0], 10)).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.document.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_search_respects_top_k() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert((0..5).map(|i| pending(&i.to_string(), vec![1.0, i as f32])).collect())
            .unwrap();

        assert_eq!(data.search(&query(vec![1.0, 0.0], 3)).unwrap().len(), 3);
        assert_eq!(data.search(&query(vec![1.0, 0.0], 10)).unwrap().len(), 5);
        assert!(data.search(&query(vec![1.0, 0.0], 0)).unwrap().is_empty());
    }

    #[test]
    fn test_search_empty_collection() {
        let data = CollectionData::new("c", Some(4)).unwrap();
        assert!(data.search(&query(vec![1.0], 3)).unwrap().is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert(vec![pending("a", vec![1.0, 0.0])]).unwrap();
        assert!(matches!(
            data.search(&query(vec![1.0, 0.0, 0.0], 1)),
            Err(StoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_search_l2_prefers_nearest() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert(vec![pending("far", vec![10.0, 0.0]), pending("near", vec![1.0, 0.0])])
            .unwrap();

        let results = data
            .search(&SearchQuery {
                embedding: vec![0.0, 0.0],
                top_k: 2,
                metric: DistanceMetric::L2,
            })
            .unwrap();
        assert_eq!(results[0].document.content, "near");
    }

    #[test]
    fn test_search_dot_prefers_magnitude() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert(vec![pending("small", vec![1.0, 0.0]), pending("large", vec![5.0, 0.0])])
            .unwrap();

        let results = data
            .search(&SearchQuery {
                embedding: vec![1.0, 0.0],
                top_k: 1,
                metric: DistanceMetric::Dot,
            })
            .unwrap();
        assert_eq!(results[0].document.content, "large");
        assert!((results[0].score - 5.0).abs() < 1e-6);
    }

    // ==================== Stats ====================

    #[test]
    fn test_stats_summary() {
        let mut data = CollectionData::new("c", None).unwrap();
        let mut with_meta = pending("a", vec![1.0]);
        with_meta.metadata.insert("year".to_string(), json!(2024));
        with_meta.metadata.insert("author".to_string(), json!("x"));
        data.insert(vec![with_meta, pending("b", vec![2.0])]).unwrap();

        let stats = data.stats();
        assert_eq!(stats.name, "c");
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.vector_size, Some(1));
        assert_eq!(stats.first_id, Some(1));
        assert_eq!(stats.last_id, Some(2));
        assert_eq!(
            stats.metadata_keys.into_iter().collect::<Vec<_>>(),
            vec!["author", "year"]
        );
        assert!(stats.updated_at.is_some());
    }

    #[test]
    fn test_stats_empty() {
        let stats = CollectionData::new("c", Some(8)).unwrap().stats();
        assert_eq!(stats.document_count, 0);
        assert_eq!(stats.vector_size, Some(8));
        assert_eq!(stats.first_id, None);
        assert!(stats.metadata_keys.is_empty());
    }

    // ==================== Snapshot Validation ====================

    #[test]
    fn test_snapshot_round_trip_keeps_next_id() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert(vec![pending("a", vec![1.0, 0.0]), pending("b", vec![0.0, 1.0])])
            .unwrap();

        let json = serde_json::to_string(&data).unwrap();
        let mut restored: CollectionData = serde_json::from_str(&json).unwrap();
        restored.validate().unwrap();

        assert_eq!(restored.documents(), data.documents());
        assert_eq!(restored.insert(vec![pending("c", vec![1.0, 1.0])]).unwrap(), vec![3]);
    }

    #[test]
    fn test_validate_rejects_wrong_vector_size() {
        let mut data = CollectionData::new("c", None).unwrap();
        data.insert(vec![pending("a", vec![1.0, 0.0])]).unwrap();
        data.vector_size = Some(3);
        assert!(data.validate().is_err());
    }
}
