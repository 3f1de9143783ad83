//! Resource metadata: fields, associations, scopes, and actions for one
//! registered record type. Built during startup through the chainable
//! mutators here and read-only once the server begins serving.

use crate::dispatch::{ActionContext, AdminResponse};
use crate::error::{AdminError, RegistryError};
use crate::schema::{Record, RecordSchema};
use crate::store::StoreQuery;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Pure display transform for one field value. Plain function pointers so
/// decorators stay testable and free of ambient state.
pub type Decorator = fn(&Value) -> Value;

/// Named query-narrowing transform backing a Scope.
pub type ScopeFn = fn(StoreQuery) -> StoreQuery;

/// Handler for member and collection actions.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(&self, ctx: ActionContext<'_>) -> Result<AdminResponse, AdminError>;
}

/// Handler for batch actions over a set of selected record ids.
#[async_trait]
pub trait BatchActionHandler: Send + Sync {
    async fn run(&self, ctx: ActionContext<'_>, ids: &[String]) -> Result<AdminResponse, AdminError>;
}

#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub label: String,
    pub handler: Arc<dyn ActionHandler>,
}

#[derive(Clone)]
pub struct BatchAction {
    pub name: String,
    pub label: String,
    pub handler: Arc<dyn BatchActionHandler>,
}

#[derive(Clone)]
pub struct Scope {
    pub name: String,
    pub label: String,
    pub apply: ScopeFn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationKind {
    HasMany,
    BelongsTo,
}

#[derive(Clone, Debug)]
pub struct Association {
    pub kind: AssociationKind,
    pub name: String,
    pub label: String,
    pub resource_name: String,
    pub foreign_key: String,
}

/// One exposed attribute of a resource.
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub label: String,
    /// Semantic tag consumed by the form/render layer: text, number,
    /// select, image, file, ...
    pub field_type: String,
    pub options: Vec<String>,
    pub readonly: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub search_resource: Option<String>,
    pub decorator: Option<Decorator>,
}

/// Which field subset a render path wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Index,
    Show,
    /// Covers both the edit and new forms.
    Edit,
}

pub struct Resource {
    schema: RecordSchema,
    pub name: String,
    pub path: String,
    pub group: String,
    /// Store collection backing this resource: snake_case type name,
    /// pluralized with a bare `s`.
    pub collection: String,
    pub fields: Vec<Field>,
    index_fields: Vec<String>,
    show_fields: Vec<String>,
    edit_fields: Vec<String>,
    pub member_actions: Vec<Action>,
    pub collection_actions: Vec<Action>,
    pub batch_actions: Vec<BatchAction>,
    pub scopes: Vec<Scope>,
    pub associations: Vec<Association>,
}

impl Resource {
    pub(crate) fn from_type<T: Record>() -> Result<Resource, RegistryError> {
        let schema = RecordSchema::of::<T>()?;
        let name = schema.type_name().to_string();
        Ok(Resource {
            path: format!("/{}", name),
            collection: format!("{}s", to_snake_case(&name)),
            name,
            group: String::new(),
            schema,
            fields: Vec::new(),
            index_fields: Vec::new(),
            show_fields: Vec::new(),
            edit_fields: Vec::new(),
            member_actions: Vec::new(),
            collection_actions: Vec::new(),
            batch_actions: Vec::new(),
            scopes: Vec::new(),
            associations: Vec::new(),
        })
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn set_group(&mut self, group: &str) -> &mut Self {
        self.group = group.to_string();
        self
    }

    /// Expose one record attribute. The name must be addressable on the
    /// record shape; re-adding an existing field updates it in place.
    pub fn add_field(
        &mut self,
        name: &str,
        label: &str,
        readonly: bool,
    ) -> Result<&mut Self, RegistryError> {
        if !self.schema.has_attribute(name) {
            return Err(RegistryError::UnknownField {
                resource: self.name.clone(),
                field: name.to_string(),
            });
        }
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => {
                existing.label = label.to_string();
                existing.readonly = readonly;
            }
            None => self.fields.push(Field {
                name: name.to_string(),
                label: label.to_string(),
                field_type: "text".into(),
                options: Vec::new(),
                readonly,
                sortable: true,
                searchable: false,
                search_resource: None,
                decorator: None,
            }),
        }
        Ok(self)
    }

    pub fn set_field_type(
        &mut self,
        name: &str,
        field_type: &str,
        options: &[&str],
    ) -> Result<&mut Self, RegistryError> {
        let resource = self.name.clone();
        let field = self.field_mut(name, &resource)?;
        field.field_type = field_type.to_string();
        field.options = options.iter().map(|o| o.to_string()).collect();
        Ok(self)
    }

    pub fn set_decorator(&mut self, name: &str, decorator: Decorator) -> Result<&mut Self, RegistryError> {
        let resource = self.name.clone();
        self.field_mut(name, &resource)?.decorator = Some(decorator);
        Ok(self)
    }

    pub fn set_sortable(&mut self, name: &str, sortable: bool) -> Result<&mut Self, RegistryError> {
        let resource = self.name.clone();
        self.field_mut(name, &resource)?.sortable = sortable;
        Ok(self)
    }

    pub fn set_searchable(&mut self, name: &str, target_resource: &str) -> Result<&mut Self, RegistryError> {
        let resource = self.name.clone();
        let field = self.field_mut(name, &resource)?;
        field.searchable = true;
        field.search_resource = Some(target_resource.to_string());
        Ok(self)
    }

    pub fn has_many(&mut self, name: &str, label: &str, target: &str, foreign_key: &str) -> &mut Self {
        self.push_association(AssociationKind::HasMany, name, label, target, foreign_key)
    }

    pub fn belongs_to(&mut self, name: &str, label: &str, target: &str, foreign_key: &str) -> &mut Self {
        self.push_association(AssociationKind::BelongsTo, name, label, target, foreign_key)
    }

    fn push_association(
        &mut self,
        kind: AssociationKind,
        name: &str,
        label: &str,
        target: &str,
        foreign_key: &str,
    ) -> &mut Self {
        let assoc = Association {
            kind,
            name: name.to_string(),
            label: label.to_string(),
            resource_name: target.to_string(),
            foreign_key: foreign_key.to_string(),
        };
        match self.associations.iter_mut().find(|a| a.name == name) {
            Some(existing) => *existing = assoc,
            None => self.associations.push(assoc),
        }
        self
    }

    pub fn add_scope(&mut self, name: &str, label: &str, apply: ScopeFn) -> &mut Self {
        let scope = Scope {
            name: name.to_string(),
            label: label.to_string(),
            apply,
        };
        match self.scopes.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = scope,
            None => self.scopes.push(scope),
        }
        self
    }

    pub fn add_member_action(&mut self, name: &str, label: &str, handler: Arc<dyn ActionHandler>) -> &mut Self {
        upsert_action(&mut self.member_actions, name, label, handler);
        self
    }

    pub fn add_collection_action(
        &mut self,
        name: &str,
        label: &str,
        handler: Arc<dyn ActionHandler>,
    ) -> &mut Self {
        upsert_action(&mut self.collection_actions, name, label, handler);
        self
    }

    pub fn add_batch_action(
        &mut self,
        name: &str,
        label: &str,
        handler: Arc<dyn BatchActionHandler>,
    ) -> &mut Self {
        let action = BatchAction {
            name: name.to_string(),
            label: label.to_string(),
            handler,
        };
        match self.batch_actions.iter_mut().find(|a| a.name == name) {
            Some(existing) => *existing = action,
            None => self.batch_actions.push(action),
        }
        self
    }

    pub fn set_index_fields(&mut self, names: &[&str]) -> Result<&mut Self, RegistryError> {
        self.index_fields = self.checked_names(names)?;
        Ok(self)
    }

    pub fn set_show_fields(&mut self, names: &[&str]) -> Result<&mut Self, RegistryError> {
        self.show_fields = self.checked_names(names)?;
        Ok(self)
    }

    pub fn set_edit_fields(&mut self, names: &[&str]) -> Result<&mut Self, RegistryError> {
        self.edit_fields = self.checked_names(names)?;
        Ok(self)
    }

    /// The configured subset for a view, in configured order, or the full
    /// field list when no subset was set. Every render path depends on the
    /// full-list fallback.
    pub fn fields_for(&self, view: View) -> Result<Vec<Field>, AdminError> {
        let names = match view {
            View::Index => &self.index_fields,
            View::Show => &self.show_fields,
            View::Edit => &self.edit_fields,
        };
        if names.is_empty() {
            return Ok(self.fields.clone());
        }
        let mut result = Vec::with_capacity(names.len());
        for name in names {
            match self.fields.iter().find(|f| &f.name == name) {
                Some(field) => result.push(field.clone()),
                None => {
                    return Err(AdminError::FieldNotFound {
                        resource: self.name.clone(),
                        field: name.clone(),
                    })
                }
            }
        }
        Ok(result)
    }

    pub fn member_action(&self, name: &str) -> Option<&Action> {
        self.member_actions.iter().find(|a| a.name == name)
    }

    pub fn collection_action(&self, name: &str) -> Option<&Action> {
        self.collection_actions.iter().find(|a| a.name == name)
    }

    pub fn batch_action(&self, name: &str) -> Option<&BatchAction> {
        self.batch_actions.iter().find(|a| a.name == name)
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.name == name)
    }

    fn field_mut(&mut self, name: &str, resource: &str) -> Result<&mut Field, RegistryError> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| RegistryError::UnknownField {
                resource: resource.to_string(),
                field: name.to_string(),
            })
    }

    fn checked_names(&self, names: &[&str]) -> Result<Vec<String>, RegistryError> {
        for name in names {
            if !self.fields.iter().any(|f| &f.name == name) {
                return Err(RegistryError::UnknownField {
                    resource: self.name.clone(),
                    field: name.to_string(),
                });
            }
        }
        Ok(names.iter().map(|n| n.to_string()).collect())
    }
}

fn upsert_action(actions: &mut Vec<Action>, name: &str, label: &str, handler: Arc<dyn ActionHandler>) {
    let action = Action {
        name: name.to_string(),
        label: label.to_string(),
        handler,
    };
    match actions.iter_mut().find(|a| a.name == name) {
        Some(existing) => *existing = action,
        None => actions.push(action),
    }
}

fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Default)]
    struct Article {
        id: u64,
        title: String,
        body: String,
        published: bool,
    }

    fn article_resource() -> Resource {
        let mut res = Resource::from_type::<Article>().unwrap();
        res.add_field("title", "Title", false)
            .unwrap()
            .add_field("body", "Body", false)
            .unwrap()
            .add_field("published", "Published", false)
            .unwrap();
        res
    }

    #[test]
    fn name_and_collection_derive_from_type() {
        let res = article_resource();
        assert_eq!(res.name, "Article");
        assert_eq!(res.collection, "articles");
        assert_eq!(res.path, "/Article");
    }

    #[test]
    fn unknown_field_fails_registration() {
        let mut res = article_resource();
        assert!(res.add_field("subtitle", "Subtitle", false).is_err());
        assert!(res.set_sortable("subtitle", false).is_err());
        assert!(res.set_index_fields(&["title", "subtitle"]).is_err());
    }

    #[test]
    fn add_field_is_idempotent() {
        let mut res = article_resource();
        res.add_field("title", "Title", false).unwrap();
        assert_eq!(res.fields.iter().filter(|f| f.name == "title").count(), 1);
    }

    #[test]
    fn fields_for_returns_subset_in_configured_order() {
        let mut res = article_resource();
        res.set_index_fields(&["published", "title"]).unwrap();
        let names: Vec<String> = res
            .fields_for(View::Index)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["published", "title"]);
    }

    #[test]
    fn fields_for_falls_back_to_full_list() {
        let res = article_resource();
        let names: Vec<String> = res
            .fields_for(View::Show)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["title", "body", "published"]);
    }

    #[test]
    fn stale_subset_surfaces_field_not_found() {
        let mut res = article_resource();
        res.set_show_fields(&["title"]).unwrap();
        res.fields.retain(|f| f.name != "title");
        assert!(matches!(
            res.fields_for(View::Show),
            Err(AdminError::FieldNotFound { .. })
        ));
    }
}
