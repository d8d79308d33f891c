use std::collections::BTreeMap;
use std::sync::Arc;

/// One record: field name -> value
pub type Row = BTreeMap<String, String>;

/// Immutable, cheaply clonable sequence of rows in source order
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    rows: Arc<Vec<Row>>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows: Arc::new(rows),
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}
