//! In-memory search engine.

use super::{SearchClause, SearchDocument, SearchDriver, SearchHits, SearchQuery};
use crate::backend::ReadOptions;
use crate::error::StorageResult;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A process-local search engine.
///
/// Phrase clauses match a field exactly (numeric values loosely), range
/// clauses use [`Value::compare`], and raw clauses tokenize the query text
/// and require every token to appear in some field of the document.
/// Tokens are lowercased runs of alphanumeric characters.
#[derive(Debug, Default)]
pub struct MemorySearchEngine {
    documents: Vec<SearchDocument>,
    next_id: u64,
}

impl MemorySearchEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(document: &SearchDocument, query: &SearchQuery) -> bool {
        query.clauses.iter().all(|clause| match clause {
            SearchClause::Phrase { field, value } => document
                .fields
                .get(field)
                .is_some_and(|actual| {
                    actual == value || actual.compare(value) == Some(Ordering::Equal)
                }),
            SearchClause::RangeFrom { field, value } => {
                document.fields.get(field).is_some_and(|actual| {
                    matches!(
                        actual.compare(value),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                })
            }
            SearchClause::RangeTo { field, value } => {
                document.fields.get(field).is_some_and(|actual| {
                    matches!(actual.compare(value), Some(Ordering::Less | Ordering::Equal))
                })
            }
            SearchClause::Raw { text } => {
                let document_tokens: Vec<String> = document
                    .fields
                    .values()
                    .flat_map(|value| tokenize(&value.to_string()))
                    .collect();
                tokenize(text)
                    .iter()
                    .all(|token| document_tokens.iter().any(|have| have == token))
            }
        })
    }

    fn sort(documents: &mut [SearchDocument], options: &ReadOptions) {
        if options.order.is_empty() {
            return;
        }
        documents.sort_by(|a, b| {
            let mut ordering = Ordering::Equal;
            for field in &options.order {
                let left = a.fields.get(field).unwrap_or(&Value::Null);
                let right = b.fields.get(field).unwrap_or(&Value::Null);
                ordering = left.compare(right).unwrap_or(Ordering::Equal);
                if ordering != Ordering::Equal {
                    break;
                }
            }
            if options.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

impl SearchDriver for MemorySearchEngine {
    fn search(&mut self, query: &SearchQuery, options: &ReadOptions) -> StorageResult<SearchHits> {
        let mut matched: Vec<SearchDocument> = self
            .documents
            .iter()
            .filter(|document| Self::matches(document, query))
            .cloned()
            .collect();
        let total = matched.len() as u64;

        Self::sort(&mut matched, options);

        let skip = options.offset.unwrap_or(0) as usize;
        let mut page: Vec<SearchDocument> = matched.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit {
            page.truncate(limit as usize);
        }
        Ok(SearchHits {
            total,
            documents: page,
        })
    }

    fn add(&mut self, fields: BTreeMap<String, Value>) -> StorageResult<()> {
        let id = self.next_id;
        self.next_id += 1;
        self.documents.push(SearchDocument { id, fields });
        Ok(())
    }

    fn delete(&mut self, ids: &[u64]) -> StorageResult<()> {
        self.documents.retain(|document| !ids.contains(&document.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed(engine: &mut MemorySearchEngine, subject: &str, owner: i64) {
        let mut fields = BTreeMap::new();
        fields.insert("collection".to_string(), Value::Text("mails".into()));
        fields.insert("subject".to_string(), Value::Text(subject.into()));
        fields.insert("owner".to_string(), Value::Integer(owner));
        engine.add(fields).unwrap();
    }

    fn phrase(field: &str, value: Value) -> SearchClause {
        SearchClause::Phrase {
            field: field.to_string(),
            value,
        }
    }

    #[test]
    fn phrase_and_range_matching() {
        let mut engine = MemorySearchEngine::new();
        indexed(&mut engine, "alpha", 1);
        indexed(&mut engine, "beta", 5);

        let query = SearchQuery {
            clauses: vec![
                phrase("collection", Value::Text("mails".into())),
                SearchClause::RangeFrom {
                    field: "owner".to_string(),
                    value: Value::Integer(2),
                },
            ],
        };
        let hits = engine.search(&query, &ReadOptions::none()).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.documents[0].fields["subject"], Value::Text("beta".into()));
    }

    #[test]
    fn raw_clause_requires_every_token() {
        let mut engine = MemorySearchEngine::new();
        indexed(&mut engine, "monthly status report", 1);
        indexed(&mut engine, "status update", 2);

        let query = SearchQuery {
            clauses: vec![SearchClause::Raw {
                text: "Report, Status".to_string(),
            }],
        };
        let hits = engine.search(&query, &ReadOptions::none()).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.documents[0].fields["owner"], Value::Integer(1));
    }

    #[test]
    fn zero_limit_reports_total_without_documents() {
        let mut engine = MemorySearchEngine::new();
        for owner in 0..4 {
            indexed(&mut engine, "hi", owner);
        }
        let options = ReadOptions {
            limit: Some(0),
            ..ReadOptions::none()
        };
        let hits = engine.search(&SearchQuery::default(), &options).unwrap();
        assert_eq!(hits.total, 4);
        assert!(hits.documents.is_empty());
    }

    #[test]
    fn sorted_paging() {
        let mut engine = MemorySearchEngine::new();
        for owner in [3, 1, 2] {
            indexed(&mut engine, "hi", owner);
        }
        let options = ReadOptions {
            order: vec!["owner".into()],
            ascending: true,
            limit: Some(2),
            offset: Some(1),
        };
        let hits = engine.search(&SearchQuery::default(), &options).unwrap();
        assert_eq!(hits.total, 3);
        assert_eq!(hits.documents[0].fields["owner"], Value::Integer(2));
        assert_eq!(hits.documents[1].fields["owner"], Value::Integer(3));
    }

    #[test]
    fn delete_by_id() {
        let mut engine = MemorySearchEngine::new();
        indexed(&mut engine, "a", 1);
        indexed(&mut engine, "b", 2);

        let hits = engine
            .search(&SearchQuery::default(), &ReadOptions::none())
            .unwrap();
        let first = hits.documents[0].id;
        engine.delete(&[first]).unwrap();

        let hits = engine
            .search(&SearchQuery::default(), &ReadOptions::none())
            .unwrap();
        assert_eq!(hits.total, 1);
        assert_ne!(hits.documents[0].id, first);
    }
}
