use std::collections::BTreeMap;
use std::path::Path;

use crate::config::datasets::DatasetConfig;
use crate::data::dataset::Dataset;
use crate::data::loader::load;
use crate::errors::KitError;

/// Every configured dataset, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, Dataset>,
}

impl DatasetRegistry {
    /// Load all datasets; the first required source that fails aborts setup.
    pub fn load_all(configs: &BTreeMap<String, DatasetConfig>) -> Result<Self, KitError> {
        let mut datasets = BTreeMap::new();
        for (name, cfg) in configs {
            let dataset = load(name, Path::new(&cfg.path), &cfg.options)?;
            datasets.insert(name.to_owned(), dataset);
        }
        Ok(Self { datasets })
    }

    pub fn insert(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.name().to_owned(), dataset);
    }

    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(|k| k.as_str())
    }
}
