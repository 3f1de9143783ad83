//! Central directory of registered resources, custom pages, and dashboard
//! charts. Single writer during startup, many readers once serving begins.

use crate::config::AdminConfig;
use crate::dispatch::{AdminResponse, PageContext};
use crate::error::{AdminError, RegistryError};
use crate::resource::Resource;
use crate::schema::Record;
use crate::store::DataStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Handler for a fully custom screen that bypasses the CRUD machinery.
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn run(&self, ctx: PageContext<'_>) -> Result<AdminResponse, AdminError>;
}

/// Label/value data source for one dashboard chart widget.
#[async_trait]
pub trait ChartDataProvider: Send + Sync {
    async fn data(&self, store: &dyn DataStore) -> Result<(Vec<String>, Vec<f64>), AdminError>;
}

#[derive(Clone)]
pub struct Page {
    pub name: String,
    pub group: String,
    pub handler: Arc<dyn PageHandler>,
}

#[derive(Clone)]
pub struct Chart {
    pub label: String,
    pub chart_type: String,
    pub provider: Arc<dyn ChartDataProvider>,
}

#[derive(Default)]
pub struct Registry {
    pub config: AdminConfig,
    resources: HashMap<String, Resource>,
    pages: HashMap<String, Page>,
    charts: Vec<Chart>,
}

impl Registry {
    pub fn new(config: AdminConfig) -> Self {
        Registry {
            config,
            resources: HashMap::new(),
            pages: HashMap::new(),
            charts: Vec::new(),
        }
    }

    /// Register a record type and return its resource builder. The resource
    /// name derives from the type name; registering the same type name again
    /// replaces the earlier entry (last registration wins, by design).
    pub fn register<T: Record>(&mut self) -> Result<&mut Resource, RegistryError> {
        let resource = Resource::from_type::<T>()?;
        let name = resource.name.clone();
        tracing::info!(resource = %name, collection = %resource.collection, "registered resource");
        self.resources.insert(name.clone(), resource);
        Ok(self.resources.get_mut(&name).expect("just inserted"))
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Setup-phase access to a registered resource's builder. Mutating after
    /// the registry is frozen into a context is not possible; the context
    /// takes ownership.
    pub fn resource_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.get_mut(name)
    }

    /// Unordered; iteration order is not a contract.
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn add_page(&mut self, name: &str, group: &str, handler: Arc<dyn PageHandler>) {
        self.pages.insert(
            name.to_string(),
            Page {
                name: name.to_string(),
                group: group.to_string(),
                handler,
            },
        );
    }

    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.get(name)
    }

    pub fn add_chart(&mut self, label: &str, chart_type: &str, provider: Arc<dyn ChartDataProvider>) {
        self.charts.push(Chart {
            label: label.to_string(),
            chart_type: chart_type.to_string(),
            provider,
        });
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    /// Group label -> resources, `"Default"` for ungrouped. Navigation data.
    pub fn grouped_resources(&self) -> HashMap<String, Vec<&Resource>> {
        let mut groups: HashMap<String, Vec<&Resource>> = HashMap::new();
        for res in self.resources.values() {
            let group = if res.group.is_empty() {
                "Default".to_string()
            } else {
                res.group.clone()
            };
            groups.entry(group).or_default().push(res);
        }
        groups
    }

    pub fn grouped_pages(&self) -> HashMap<String, Vec<&Page>> {
        let mut groups: HashMap<String, Vec<&Page>> = HashMap::new();
        for page in self.pages.values() {
            let group = if page.group.is_empty() {
                "Default".to_string()
            } else {
                page.group.clone()
            };
            groups.entry(group).or_default().push(page);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Default)]
    struct Widget {
        id: u64,
        name: String,
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = Registry::new(AdminConfig::default());
        registry.register::<Widget>().unwrap();
        assert!(registry.resource("Widget").is_some());
        assert!(registry.resource("Gizmo").is_none());
        assert_eq!(registry.resource_names(), ["Widget"]);
    }

    #[test]
    fn duplicate_registration_replaces_prior_entry() {
        let mut registry = Registry::new(AdminConfig::default());
        registry
            .register::<Widget>()
            .unwrap()
            .add_field("name", "Name", false)
            .unwrap();
        assert_eq!(registry.resource("Widget").unwrap().fields.len(), 1);
        registry.register::<Widget>().unwrap();
        assert!(registry.resource("Widget").unwrap().fields.is_empty());
    }

    #[test]
    fn grouped_resources_defaults_ungrouped() {
        let mut registry = Registry::new(AdminConfig::default());
        registry.register::<Widget>().unwrap();
        let groups = registry.grouped_resources();
        assert_eq!(groups["Default"].len(), 1);
    }
}
