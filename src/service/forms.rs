//! Field-by-field form application for save paths.
//!
//! Contract, kept deliberately lenient: only non-readonly fields are
//! populated; image/file fields take the uploaded bytes when present and are
//! otherwise left untouched; numeric and boolean inputs that fail to parse
//! become the zero value rather than rejecting the write.

use crate::dispatch::FormData;
use crate::error::AdminError;
use crate::files::FileStore;
use crate::resource::Resource;
use crate::schema::FieldKind;
use serde_json::Value;

/// Populate a record from submitted form data. `existing` is the current row
/// for updates; creates start from the schema prototype.
pub async fn apply_form(
    resource: &Resource,
    existing: Option<Value>,
    form: &FormData,
    files: &dyn FileStore,
) -> Result<Value, AdminError> {
    let mut record = existing.unwrap_or_else(|| resource.schema().prototype());
    let obj = record
        .as_object_mut()
        .ok_or_else(|| AdminError::BadRequest("record is not an object".into()))?;

    for field in &resource.fields {
        if field.readonly {
            continue;
        }
        if field.field_type == "image" || field.field_type == "file" {
            if let Some(upload) = form.file(&field.name) {
                let reference = files
                    .store(&upload.bytes, &upload.file_name)
                    .await
                    .map_err(|e| AdminError::BadRequest(format!("upload failed: {}", e)))?;
                obj.insert(field.name.clone(), Value::String(reference));
            }
            continue;
        }
        let raw = form.value(&field.name).unwrap_or("");
        let parsed = match resource.schema().kind_of(&field.name) {
            Some(FieldKind::Integer) => Value::from(raw.parse::<i64>().unwrap_or(0)),
            Some(FieldKind::Float) => Value::from(raw.parse::<f64>().unwrap_or(0.0)),
            Some(FieldKind::Bool) => Value::Bool(matches!(raw, "true" | "on" | "1")),
            Some(FieldKind::String) => Value::String(raw.to_string()),
            // Structured attributes are not form-editable.
            Some(FieldKind::Other) | None => continue,
        };
        obj.insert(field.name.clone(), parsed);
    }
    Ok(record)
}
