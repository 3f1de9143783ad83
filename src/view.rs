//! View-model building: record projections for the render layer and list
//! query construction from request parameters.

use crate::config::AdminConfig;
use crate::resource::{Field, Resource};
use crate::store::{CompareOp, Order, Predicate, StoreQuery, KEY_ATTR};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Reserved projection key always carrying the primary key, whatever the
/// requested field subset.
pub const ID_KEY: &str = "ID";

/// Project one record into an ordered field-name -> display-value map,
/// applying decorators where configured.
pub fn project_record(fields: &[Field], record: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    for field in fields {
        let Some(raw) = record.get(&field.name) else {
            continue;
        };
        let display = match field.decorator {
            Some(decorate) => decorate(raw),
            None => raw.clone(),
        };
        out.insert(field.name.clone(), display);
    }
    if let Some(key) = record.get(KEY_ATTR) {
        out.insert(ID_KEY.into(), key.clone());
    }
    out
}

/// Project a sequence of records, preserving order.
pub fn project_list(fields: &[Field], records: &[Value]) -> Vec<Map<String, Value>> {
    records.iter().map(|r| project_record(fields, r)).collect()
}

/// A parsed list request: the store query (predicates + order, no paging),
/// the 1-based page, and display echoes for the render layer.
pub struct ListQuery {
    pub base: StoreQuery,
    pub page: u64,
    pub per_page: u64,
    pub current_scope: String,
    /// Non-empty request parameters, echoed back so forms can repopulate.
    pub filters: HashMap<String, String>,
    pub sort_field: String,
    pub sort_order: String,
}

impl ListQuery {
    /// The full store query for the current page.
    pub fn paged(&self) -> StoreQuery {
        let mut q = self.base.clone();
        q.offset = Some((self.page - 1) * self.per_page);
        q.limit = Some(self.per_page);
        q
    }
}

/// Build a list query from request parameters.
///
/// `q_<field>` contributes a case-sensitive contains predicate,
/// `min_<field>`/`max_<field>` inclusive bounds; empty values are ignored
/// entirely. `scope` selects a registered scope by exact name (unknown names
/// are a silent no-op). `order` must be exactly `desc` to sort descending;
/// an absent `sort` falls back to primary-key descending.
pub fn build_list_query(
    resource: &Resource,
    config: &AdminConfig,
    params: &HashMap<String, String>,
) -> ListQuery {
    let mut base = StoreQuery::default();

    let current_scope = params.get("scope").cloned().unwrap_or_default();
    if !current_scope.is_empty() {
        if let Some(scope) = resource.scope(&current_scope) {
            base = (scope.apply)(base);
        }
    }

    let mut filters = HashMap::new();
    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        filters.insert(key.clone(), value.clone());
        if let Some(field) = key.strip_prefix("q_") {
            base.predicates
                .push(Predicate::new(field, CompareOp::Like, Value::from(value.clone())));
        } else if let Some(field) = key.strip_prefix("min_") {
            base.predicates
                .push(Predicate::new(field, CompareOp::Gte, Value::from(value.clone())));
        } else if let Some(field) = key.strip_prefix("max_") {
            base.predicates
                .push(Predicate::new(field, CompareOp::Lte, Value::from(value.clone())));
        }
    }

    let sort_field = params.get("sort").cloned().unwrap_or_default();
    let sort_order = params.get("order").cloned().unwrap_or_default();
    base.order = if sort_field.is_empty() {
        Some(Order {
            field: KEY_ATTR.into(),
            descending: true,
        })
    } else {
        Some(Order {
            field: sort_field.clone(),
            descending: sort_order == "desc",
        })
    };

    let page = params
        .get("page")
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1)
        .max(1) as u64;

    ListQuery {
        base,
        page,
        per_page: config.default_per_page as u64,
        current_scope,
        filters,
        sort_field,
        sort_order,
    }
}

/// Pagination summary for a list view.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Paging {
    pub page: u64,
    pub per_page: u64,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: u64,
    pub next_page: u64,
}

impl Paging {
    pub fn new(page: u64, per_page: u64, total_count: u64) -> Paging {
        let total_pages = if per_page == 0 {
            0
        } else {
            total_count.div_ceil(per_page)
        };
        Paging {
            page,
            per_page,
            total_count,
            total_pages,
            has_prev: page > 1,
            has_next: page < total_pages,
            prev_page: page.saturating_sub(1),
            next_page: page + 1,
        }
    }
}

/// Serializable slice of a Field for the render layer (everything except
/// the decorator, which has already been applied to the values).
#[derive(Clone, Debug, serde::Serialize)]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub options: Vec<String>,
    pub readonly: bool,
    pub sortable: bool,
    pub searchable: bool,
    pub search_resource: Option<String>,
}

impl From<&Field> for FieldView {
    fn from(f: &Field) -> FieldView {
        FieldView {
            name: f.name.clone(),
            label: f.label.clone(),
            field_type: f.field_type.clone(),
            options: f.options.clone(),
            readonly: f.readonly,
            sortable: f.sortable,
            searchable: f.searchable,
            search_resource: f.search_resource.clone(),
        }
    }
}

pub fn field_views(fields: &[Field]) -> Vec<FieldView> {
    fields.iter().map(FieldView::from).collect()
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ScopeView {
    pub name: String,
    pub label: String,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct Stat {
    pub label: String,
    pub value: u64,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ChartWidget {
    pub id: String,
    pub label: String,
    pub chart_type: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct DashboardView {
    pub site_title: String,
    pub stats: Vec<Stat>,
    pub charts: Vec<ChartWidget>,
    /// Group label -> resource names, for navigation.
    pub nav: std::collections::HashMap<String, Vec<String>>,
    pub pages: std::collections::HashMap<String, Vec<String>>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ListView {
    pub resource: String,
    pub fields: Vec<FieldView>,
    pub rows: Vec<Map<String, Value>>,
    pub paging: Paging,
    pub filters: HashMap<String, String>,
    pub scopes: Vec<ScopeView>,
    pub current_scope: String,
    pub sort_field: String,
    pub sort_order: String,
}

/// Related rows fanned out for a HasMany association on the show screen.
#[derive(Clone, Debug, serde::Serialize)]
pub struct AssociationView {
    pub name: String,
    pub label: String,
    pub resource: String,
    pub fields: Vec<FieldView>,
    pub items: Vec<Map<String, Value>>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ShowView {
    pub resource: String,
    pub fields: Vec<FieldView>,
    pub item: Map<String, Value>,
    pub associations: Vec<AssociationView>,
}

/// BelongsTo target on a form: either an inline options list (small
/// targets) or a remote-search flag (targets past the search threshold).
#[derive(Clone, Debug, serde::Serialize)]
pub struct BelongsToView {
    pub name: String,
    pub label: String,
    pub resource: String,
    pub foreign_key: String,
    pub options: Option<Vec<Map<String, Value>>>,
    pub remote_search: bool,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct FormView {
    pub resource: String,
    pub fields: Vec<FieldView>,
    /// Present for edit, absent for new.
    pub item: Option<Map<String, Value>>,
    pub belongs_to: Vec<BelongsToView>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct LoginView {
    pub site_title: String,
    pub error: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SearchHit {
    pub id: Value,
    pub text: String,
}

/// Rendering-ready payload for the (external) template layer, tagged by
/// screen kind.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewModel {
    Dashboard(DashboardView),
    List(ListView),
    Show(ShowView),
    Form(FormView),
    Login(LoginView),
    Search { hits: Vec<SearchHit> },
    /// Custom pages return arbitrary payloads.
    Page(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize, Default)]
    struct Book {
        id: u64,
        title: String,
        pages: i64,
    }

    fn book_resource() -> Resource {
        let mut res = Resource::from_type::<Book>().unwrap();
        res.add_field("title", "Title", false)
            .unwrap()
            .add_field("pages", "Pages", false)
            .unwrap();
        res.add_scope("thick", "Thick books", |mut q| {
            q.predicates
                .push(Predicate::new("pages", CompareOp::Gte, json!(500)));
            q
        });
        res
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn projection_applies_decorator_and_reserved_id() {
        let mut res = book_resource();
        res.set_decorator("title", |v| {
            Value::from(v.as_str().unwrap_or_default().to_uppercase())
        })
        .unwrap();
        let record = json!({"id": 7, "title": "dune", "pages": 412});
        let projected = project_record(&res.fields, &record);
        assert_eq!(projected["title"], json!("DUNE"));
        assert_eq!(projected["pages"], json!(412));
        assert_eq!(projected[ID_KEY], json!(7));
        let keys: Vec<&String> = projected.keys().collect();
        assert_eq!(keys, ["title", "pages", "ID"]);
    }

    #[test]
    fn filter_prefixes_map_to_predicates() {
        let res = book_resource();
        let q = build_list_query(
            &res,
            &AdminConfig::default(),
            &params(&[("q_title", "dune"), ("min_pages", "100"), ("max_pages", ""), ("note", "x")]),
        );
        let ops: Vec<CompareOp> = q.base.predicates.iter().map(|p| p.op).collect();
        assert_eq!(q.base.predicates.len(), 2);
        assert!(ops.contains(&CompareOp::Like));
        assert!(ops.contains(&CompareOp::Gte));
        // Empty values are ignored, non-filter params only echo.
        assert!(!q.filters.contains_key("max_pages"));
        assert!(q.filters.contains_key("note"));
    }

    #[test]
    fn scope_is_applied_by_exact_name_and_unknown_is_noop() {
        let res = book_resource();
        let config = AdminConfig::default();
        let q = build_list_query(&res, &config, &params(&[("scope", "thick")]));
        assert_eq!(q.base.predicates.len(), 1);
        let q = build_list_query(&res, &config, &params(&[("scope", "thin")]));
        assert!(q.base.predicates.is_empty());
    }

    #[test]
    fn sort_defaults_and_desc_keyword() {
        let res = book_resource();
        let config = AdminConfig::default();

        let q = build_list_query(&res, &config, &params(&[]));
        let order = q.base.order.unwrap();
        assert_eq!(order.field, "id");
        assert!(order.descending);

        let q = build_list_query(&res, &config, &params(&[("sort", "title"), ("order", "desc")]));
        assert!(q.base.order.unwrap().descending);

        // Anything other than the exact keyword sorts ascending.
        let q = build_list_query(&res, &config, &params(&[("sort", "title"), ("order", "DESC")]));
        assert!(!q.base.order.unwrap().descending);
    }

    #[test]
    fn page_clamps_to_one() {
        let res = book_resource();
        let config = AdminConfig::default();
        for bad in ["0", "-3", "junk"] {
            let q = build_list_query(&res, &config, &params(&[("page", bad)]));
            assert_eq!(q.page, 1);
        }
        let q = build_list_query(&res, &config, &params(&[("page", "4")]));
        assert_eq!(q.page, 4);
        assert_eq!(q.paged().offset, Some(30));
    }

    #[test]
    fn paging_math() {
        let p = Paging::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next && !p.has_prev);

        let p = Paging::new(2, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_prev && p.has_next);

        let p = Paging::new(3, 10, 25);
        assert!(!p.has_next);
    }
}
