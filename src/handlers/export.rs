//! CSV export of all rows for a resource. Exempt from the permission table.

use crate::dispatch::AdminResponse;
use crate::error::AdminError;
use crate::resource::Resource;
use crate::service::CrudService;
use crate::state::AdminContext;
use serde_json::Value;

pub async fn csv(ctx: &AdminContext, resource: &Resource) -> Result<AdminResponse, AdminError> {
    let rows = CrudService::list(ctx.store.as_ref(), resource).await?;

    let mut body = String::new();
    let header: Vec<String> = resource.fields.iter().map(|f| quote(&f.label)).collect();
    body.push_str(&header.join(","));
    body.push('\n');
    for row in &rows {
        let cells: Vec<String> = resource
            .fields
            .iter()
            .map(|f| quote(&cell_text(row.get(&f.name))))
            .collect();
        body.push_str(&cells.join(","));
        body.push('\n');
    }

    Ok(AdminResponse::Csv {
        filename: format!("{}_export.csv", resource.name),
        body,
    })
}

fn cell_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_embedded_delimiters() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
