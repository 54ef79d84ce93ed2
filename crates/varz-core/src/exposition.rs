//! `/debug/vars` document assembly.
//!
//! The document is one flat JSON object: every registered metric under its
//! own name, plus `cmdline` and `memstats` from the runtime source. Rendering
//! either produces the whole document or an error; nothing partial escapes.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::registry::Registry;
use crate::runtime::RuntimeSource;

/// Build the document as a JSON value.
pub fn document(registry: &Registry, runtime: &dyn RuntimeSource) -> Result<Value> {
    let mut doc: Map<String, Value> = registry.snapshot().into_inner().into_iter().collect();
    doc.insert("cmdline".into(), serde_json::to_value(runtime.cmdline())?);
    doc.insert("memstats".into(), serde_json::to_value(runtime.mem_stats())?);
    Ok(Value::Object(doc))
}

/// Build and encode the document.
pub fn render(registry: &Registry, runtime: &dyn RuntimeSource) -> Result<Vec<u8>> {
    let doc = document(registry, runtime)?;
    Ok(serde_json::to_vec(&doc)?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::runtime::ProcessRuntime;
    use serde_json::json;

    #[test]
    fn document_merges_metrics_and_runtime_keys() {
        let r = Registry::new();
        r.new_counter("num_calls").unwrap();
        r.new_gauge("last_user").unwrap();
        let rt = ProcessRuntime::with_cmdline(vec!["varz".into(), "-v".into()]);

        let doc = document(&r, &rt).unwrap();
        let obj = doc.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["cmdline", "last_user", "memstats", "num_calls"]);
        assert_eq!(doc["num_calls"], json!(0));
        assert_eq!(doc["last_user"], json!(""));
        assert_eq!(doc["cmdline"], json!(["varz", "-v"]));
        assert!(doc["memstats"]["PauseNs"].is_array());
    }

    #[test]
    fn render_is_valid_json() {
        let r = Registry::new();
        r.new_float("ratio").unwrap().set(0.25);
        let rt = ProcessRuntime::with_cmdline(Vec::new());

        let bytes = render(&r, &rt).unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["ratio"], json!(0.25));
    }
}
