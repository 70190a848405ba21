//! In-memory document driver.

use super::{Document, DocumentDriver, DocumentId, Filter, FilterOp, ID_FIELD};
use crate::backend::ReadOptions;
use crate::error::StorageResult;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// A process-local document store.
///
/// Collections are created on first write. Filter evaluation follows the
/// loose comparison rules of [`Value::compare`], so an `Integer` criterion
/// matches a `Float` field of equal magnitude.
#[derive(Debug, Default)]
pub struct MemoryDocumentDriver {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryDocumentDriver {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(document: &Document, filter: &Filter) -> bool {
        filter.0.iter().all(|(field, op)| {
            if let FilterOp::IdEq(id) = op {
                return document.id == *id;
            }
            let actual = document.fields.get(field).unwrap_or(&Value::Null);
            match op {
                FilterOp::Eq(expected) => loosely_equal(actual, expected),
                FilterOp::Lt(bound) => actual.compare(bound) == Some(Ordering::Less),
                FilterOp::Gt(bound) => actual.compare(bound) == Some(Ordering::Greater),
                FilterOp::Le(bound) => {
                    matches!(actual.compare(bound), Some(Ordering::Less | Ordering::Equal))
                }
                FilterOp::Ge(bound) => matches!(
                    actual.compare(bound),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                FilterOp::Pattern(pattern) => {
                    !actual.is_null() && pattern.matches(&actual.to_string())
                }
                FilterOp::IdEq(_) => unreachable!(),
            }
        })
    }

    fn sort(documents: &mut [Document], options: &ReadOptions) {
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

fn loosely_equal(a: &Value, b: &Value) -> bool {
    a == b || a.compare(b) == Some(Ordering::Equal)
}

impl DocumentDriver for MemoryDocumentDriver {
    fn find(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &ReadOptions,
    ) -> StorageResult<Vec<Document>> {
        let mut matched: Vec<Document> = self
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| Self::matches(document, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Self::sort(&mut matched, options);

        let skip = options.offset.unwrap_or(0) as usize;
        let mut page: Vec<Document> = matched.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit {
            page.truncate(limit as usize);
        }
        Ok(page)
    }

    fn insert(
        &mut self,
        collection: &str,
        mut fields: BTreeMap<String, Value>,
    ) -> StorageResult<DocumentId> {
        let id = match fields.remove(ID_FIELD) {
            Some(value) => DocumentId::new(value.to_string()),
            None => DocumentId::generate(),
        };
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    fn update(
        &mut self,
        collection: &str,
        filter: &Filter,
        changes: &BTreeMap<String, Value>,
    ) -> StorageResult<()> {
        if let Some(documents) = self.collections.get_mut(collection) {
            for document in documents
                .iter_mut()
                .filter(|document| Self::matches(document, filter))
            {
                for (field, value) in changes {
                    document.fields.insert(field.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn remove(&mut self, collection: &str, filter: &Filter) -> StorageResult<()> {
        if let Some(documents) = self.collections.get_mut(collection) {
            documents.retain(|document| !Self::matches(document, filter));
        }
        Ok(())
    }

    fn count(&mut self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        Ok(self
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| Self::matches(document, filter))
                    .count() as u64
            })
            .unwrap_or(0))
    }
}
