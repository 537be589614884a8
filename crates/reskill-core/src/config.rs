use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// ModelSpec
// ---------------------------------------------------------------------------

/// Default model rotation: primary first, cheaper fallback second.
pub const DEFAULT_MODELS: &str = "gemini-2.5-pro,gemini-2.5-flash";

/// An ordered model list, accepted either as a comma-separated string
/// (`"gemini-2.5-pro,gemini-2.5-flash"`) or as an array of identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModelSpec {
    Csv(String),
    List(Vec<String>),
}

impl Default for ModelSpec {
    fn default() -> Self {
        ModelSpec::Csv(DEFAULT_MODELS.to_string())
    }
}

impl ModelSpec {
    /// Resolve to the ordered list of model identifiers, first-to-last
    /// priority. Empty entries (stray commas, blank strings) are dropped.
    pub fn resolve(&self) -> Vec<String> {
        match self {
            ModelSpec::Csv(s) => s
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
            ModelSpec::List(list) => list
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Target / RunnerConfig
// ---------------------------------------------------------------------------

/// A scan target handed to the runner by the discovery layer: a
/// human-readable name plus the logical prompt template to execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    /// Logical template identifier, resolved against the search paths.
    pub prompt: String,
}

/// Runner-facing configuration: the constitution text injected as template
/// variables, the model rotation, and arbitrary extra variables passed
/// through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// Free-form architectural guidelines, opaque to the runner.
    #[serde(default)]
    pub constitution: Value,

    #[serde(default)]
    pub models: ModelSpec,

    /// Extra key/value pairs forwarded verbatim as template variables.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunnerConfig {
    /// Assemble the template variable bag for a target: extra variables
    /// first, then `target` and `constitution` (which win on key collision).
    /// `constitution.patterns` is normalized before rendering.
    pub fn template_variables(&self, target: &Target) -> Map<String, Value> {
        let mut vars = self.extra.clone();
        vars.insert(
            "target".to_string(),
            serde_json::json!({ "name": target.name, "prompt": target.prompt }),
        );
        if !self.constitution.is_null() {
            vars.insert("constitution".to_string(), self.constitution.clone());
        }
        normalize_constitution_patterns(&mut vars);
        vars
    }
}

/// Wrap a scalar `constitution.patterns` into a single-element array so
/// templates can always iterate over it uniformly. Already-array values
/// are left untouched.
pub fn normalize_constitution_patterns(vars: &mut Map<String, Value>) {
    let Some(patterns) = vars
        .get_mut("constitution")
        .and_then(Value::as_object_mut)
        .and_then(|c| c.get_mut("patterns"))
    else {
        return;
    };
    if !patterns.is_array() && !patterns.is_null() {
        let single = patterns.take();
        *patterns = Value::Array(vec![single]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_spec_csv_resolves_in_order() {
        let spec = ModelSpec::Csv("gemini-2.5-pro, gemini-2.5-flash".into());
        assert_eq!(spec.resolve(), vec!["gemini-2.5-pro", "gemini-2.5-flash"]);
    }

    #[test]
    fn model_spec_drops_empty_entries() {
        let spec = ModelSpec::Csv("a,,b,".into());
        assert_eq!(spec.resolve(), vec!["a", "b"]);
    }

    #[test]
    fn model_spec_list_form() {
        let spec = ModelSpec::List(vec!["m1".into(), " m2 ".into()]);
        assert_eq!(spec.resolve(), vec!["m1", "m2"]);
    }

    #[test]
    fn model_spec_deserializes_both_forms() {
        let csv: ModelSpec = serde_json::from_value(json!("a,b")).unwrap();
        let list: ModelSpec = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(csv.resolve(), list.resolve());
    }

    #[test]
    fn default_models_is_a_two_model_rotation() {
        assert_eq!(ModelSpec::default().resolve().len(), 2);
    }

    #[test]
    fn normalize_wraps_scalar_patterns() {
        let mut vars = Map::new();
        vars.insert("constitution".into(), json!({ "patterns": "x" }));
        normalize_constitution_patterns(&mut vars);
        assert_eq!(vars["constitution"]["patterns"], json!(["x"]));
    }

    #[test]
    fn normalize_leaves_array_patterns_alone() {
        let mut vars = Map::new();
        vars.insert("constitution".into(), json!({ "patterns": ["x"] }));
        normalize_constitution_patterns(&mut vars);
        assert_eq!(vars["constitution"]["patterns"], json!(["x"]));
    }

    #[test]
    fn normalize_is_a_noop_without_constitution() {
        let mut vars = Map::new();
        vars.insert("name".into(), json!("World"));
        normalize_constitution_patterns(&mut vars);
        assert_eq!(vars["name"], json!("World"));
    }

    #[test]
    fn template_variables_includes_target_and_constitution() {
        let config = RunnerConfig {
            constitution: json!({ "patterns": "solid" }),
            models: ModelSpec::default(),
            extra: Map::new(),
        };
        let target = Target {
            name: "auth".into(),
            prompt: "audit".into(),
        };
        let vars = config.template_variables(&target);
        assert_eq!(vars["target"]["name"], json!("auth"));
        assert_eq!(vars["constitution"]["patterns"], json!(["solid"]));
    }
}
