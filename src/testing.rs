// In-memory knowledge base for unit tests

use crate::error::{CompareError, CompareResult};
use crate::model::{Entity, RawStatement, Suggestion};
use crate::wikidata::KnowledgeBase;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct StaticKnowledgeBase {
    entities: HashMap<String, (Entity, Vec<RawStatement>)>,
    labels: HashMap<String, String>,
    suggestions: HashMap<String, Vec<Suggestion>>,
    failures: HashMap<String, CompareError>,
    label_batches: Mutex<Vec<Vec<String>>>,
    entity_requests: Mutex<Vec<String>>,
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: Entity, statements: Vec<RawStatement>) -> Self {
        self.labels.insert(entity.id.clone(), entity.label.clone());
        self.entities.insert(entity.id.clone(), (entity, statements));
        self
    }

    pub fn with_label(mut self, id: &str, label: &str) -> Self {
        self.labels.insert(id.to_string(), label.to_string());
        self
    }

    pub fn with_suggestions(mut self, term: &str, suggestions: Vec<Suggestion>) -> Self {
        self.suggestions.insert(term.to_string(), suggestions);
        self
    }

    pub fn with_failure(mut self, id: &str, error: CompareError) -> Self {
        self.failures.insert(id.to_string(), error);
        self
    }

    pub fn label_batches(&self) -> Vec<Vec<String>> {
        self.label_batches.lock().unwrap().clone()
    }

    pub fn entity_requests(&self) -> Vec<String> {
        self.entity_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    async fn fetch_entity(&self, id: &str) -> CompareResult<(Entity, Vec<RawStatement>)> {
        self.entity_requests.lock().unwrap().push(id.to_string());

        if let Some(error) = self.failures.get(id) {
            return Err(error.clone());
        }
        self.entities
            .get(id)
            .cloned()
            .ok_or_else(|| CompareError::NotFound { id: id.to_string() })
    }

    async fn fetch_labels(&self, ids: &[String]) -> CompareResult<HashMap<String, String>> {
        self.label_batches.lock().unwrap().push(ids.to_vec());

        Ok(ids
            .iter()
            .filter_map(|id| self.labels.get(id).map(|label| (id.clone(), label.clone())))
            .collect())
    }

    async fn search(&self, term: &str) -> CompareResult<Vec<Suggestion>> {
        Ok(self.suggestions.get(term).cloned().unwrap_or_default())
    }
}
