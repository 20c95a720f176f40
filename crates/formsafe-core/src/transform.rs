//! Two-direction transform pipeline.
//!
//! Before saving, field hooks run first on raw values and the global hook
//! then sees the field-adjusted record. After restoring, the order is
//! inverted: global first, then field hooks. A failing hook never blocks the
//! rest of the record; its input is kept and the failure is reported.

use crate::error::FormsafeError;
use crate::snapshot::FormFields;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Hook applied to a single field value.
pub type FieldHook = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// Hook applied to the whole record.
pub type GlobalHook = Arc<dyn Fn(FormFields) -> Result<FormFields, String> + Send + Sync>;

/// Marker used in error contexts for the global hook.
const GLOBAL_SCOPE: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformDirection {
    BeforeSave,
    AfterRestore,
}

impl TransformDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformDirection::BeforeSave => "before_save",
            TransformDirection::AfterRestore => "after_restore",
        }
    }
}

fn context(direction: TransformDirection, scope: &str) -> String {
    format!("transform:{}:{}", direction.as_str(), scope)
}

/// Global pre-save / post-restore pair.
#[derive(Clone, Default)]
pub struct TransformHooks {
    pub before_save: Option<GlobalHook>,
    pub after_restore: Option<GlobalHook>,
}

impl TransformHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_save<F>(mut self, hook: F) -> Self
    where
        F: Fn(FormFields) -> Result<FormFields, String> + Send + Sync + 'static,
    {
        self.before_save = Some(Arc::new(hook));
        self
    }

    pub fn after_restore<F>(mut self, hook: F) -> Self
    where
        F: Fn(FormFields) -> Result<FormFields, String> + Send + Sync + 'static,
    {
        self.after_restore = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for TransformHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformHooks")
            .field("before_save", &self.before_save.is_some())
            .field("after_restore", &self.after_restore.is_some())
            .finish()
    }
}

/// Field-scoped pre-save / post-restore pair.
#[derive(Clone, Default)]
pub struct FieldTransform {
    pub before_save: Option<FieldHook>,
    pub after_restore: Option<FieldHook>,
}

impl FieldTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_save<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.before_save = Some(Arc::new(hook));
        self
    }

    pub fn after_restore<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.after_restore = Some(Arc::new(hook));
        self
    }

    fn hook(&self, direction: TransformDirection) -> Option<&FieldHook> {
        match direction {
            TransformDirection::BeforeSave => self.before_save.as_ref(),
            TransformDirection::AfterRestore => self.after_restore.as_ref(),
        }
    }
}

impl fmt::Debug for FieldTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTransform")
            .field("before_save", &self.before_save.is_some())
            .field("after_restore", &self.after_restore.is_some())
            .finish()
    }
}

/// Result of running the pipeline: transformed fields plus every hook
/// failure encountered on the way.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub fields: FormFields,
    pub errors: Vec<FormsafeError>,
}

#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    global: TransformHooks,
    fields: HashMap<String, FieldTransform>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the global hook pair.
    pub fn set_global(&mut self, hooks: TransformHooks) {
        self.global = hooks;
    }

    /// Adds or replaces field hooks. Fields not in `mapping` keep theirs.
    pub fn register_fields(&mut self, mapping: HashMap<String, FieldTransform>) {
        self.fields.extend(mapping);
    }

    pub fn apply_before_save(&self, fields: &FormFields) -> TransformOutput {
        let mut errors = Vec::new();
        let adjusted =
            self.apply_fields(fields.clone(), TransformDirection::BeforeSave, &mut errors);
        let fields = self.apply_global(adjusted, TransformDirection::BeforeSave, &mut errors);
        TransformOutput { fields, errors }
    }

    pub fn apply_after_restore(&self, fields: &FormFields) -> TransformOutput {
        let mut errors = Vec::new();
        let adjusted =
            self.apply_global(fields.clone(), TransformDirection::AfterRestore, &mut errors);
        let fields = self.apply_fields(adjusted, TransformDirection::AfterRestore, &mut errors);
        TransformOutput { fields, errors }
    }

    fn apply_fields(
        &self,
        mut fields: FormFields,
        direction: TransformDirection,
        errors: &mut Vec<FormsafeError>,
    ) -> FormFields {
        for (name, transform) in &self.fields {
            let Some(hook) = transform.hook(direction) else {
                continue;
            };
            let Some(value) = fields.get(name).cloned() else {
                continue;
            };
            match hook(value) {
                Ok(transformed) => {
                    fields.insert(name.clone(), transformed);
                }
                Err(message) => {
                    errors.push(FormsafeError::transform(context(direction, name), message));
                }
            }
        }
        fields
    }

    fn apply_global(
        &self,
        fields: FormFields,
        direction: TransformDirection,
        errors: &mut Vec<FormsafeError>,
    ) -> FormFields {
        let hook = match direction {
            TransformDirection::BeforeSave => self.global.before_save.as_ref(),
            TransformDirection::AfterRestore => self.global.after_restore.as_ref(),
        };
        let Some(hook) = hook else {
            return fields;
        };
        match hook(fields.clone()) {
            Ok(transformed) => transformed,
            Err(message) => {
                errors.push(FormsafeError::transform(
                    context(direction, GLOBAL_SCOPE),
                    message,
                ));
                fields
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FormFields {
        value.as_object().cloned().unwrap()
    }

    fn suffix_pipeline() -> TransformPipeline {
        let mut pipeline = TransformPipeline::new();
        pipeline.register_fields(HashMap::from([(
            "name".to_string(),
            FieldTransform::new()
                .before_save(|v| Ok(json!(v.as_str().unwrap_or_default().to_uppercase())))
                .after_restore(|v| Ok(json!(v.as_str().unwrap_or_default().to_lowercase()))),
        )]));
        pipeline.set_global(
            TransformHooks::new()
                .before_save(|mut m| {
                    if let Some(Value::String(s)) = m.get_mut("name") {
                        s.push_str("_SUFFIX");
                    }
                    Ok(m)
                })
                .after_restore(|mut m| {
                    if let Some(Value::String(s)) = m.get_mut("name") {
                        let stripped = s.strip_suffix("_SUFFIX").map(str::to_string);
                        if let Some(stripped) = stripped {
                            *s = stripped;
                        }
                    }
                    Ok(m)
                }),
        );
        pipeline
    }

    #[test]
    fn test_field_runs_before_global_on_save() {
        let out = suffix_pipeline().apply_before_save(&fields(json!({"name": "x"})));
        assert!(out.errors.is_empty());
        assert_eq!(out.fields["name"], "X_SUFFIX");
    }

    #[test]
    fn test_global_runs_before_field_on_restore() {
        let out = suffix_pipeline().apply_after_restore(&fields(json!({"name": "X_SUFFIX"})));
        assert!(out.errors.is_empty());
        // Global strips "_SUFFIX" first; lowercasing first would leave "x_suffix".
        assert_eq!(out.fields["name"], "x");
    }

    #[test]
    fn test_failing_field_hook_falls_back() {
        let mut pipeline = TransformPipeline::new();
        pipeline.register_fields(HashMap::from([
            (
                "broken".to_string(),
                FieldTransform::new().before_save(|_| Err("nope".to_string())),
            ),
            (
                "ok".to_string(),
                FieldTransform::new().before_save(|_| Ok(json!("changed"))),
            ),
        ]));

        let out = pipeline.apply_before_save(&fields(json!({"broken": 1, "ok": 2})));
        assert_eq!(out.fields["broken"], 1);
        assert_eq!(out.fields["ok"], "changed");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(
            out.errors[0],
            FormsafeError::transform("transform:before_save:broken", "nope")
        );
    }

    #[test]
    fn test_failing_global_hook_keeps_field_adjusted_record() {
        let mut pipeline = TransformPipeline::new();
        pipeline.register_fields(HashMap::from([(
            "n".to_string(),
            FieldTransform::new().before_save(|_| Ok(json!(10))),
        )]));
        pipeline.set_global(TransformHooks::new().before_save(|_| Err("global".to_string())));

        let out = pipeline.apply_before_save(&fields(json!({"n": 1})));
        assert_eq!(out.fields["n"], 10);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].to_string().contains("transform:before_save:*"));
    }

    #[test]
    fn test_field_hook_skips_absent_field() {
        let mut pipeline = TransformPipeline::new();
        pipeline.register_fields(HashMap::from([(
            "missing".to_string(),
            FieldTransform::new().before_save(|_| Err("should not run".to_string())),
        )]));

        let out = pipeline.apply_before_save(&fields(json!({"other": true})));
        assert!(out.errors.is_empty());
        assert!(!out.fields.contains_key("missing"));
    }
}
