//! Stable cache-key derivation for upstream requests.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Derive a stable cache key from an operation name and its parameters.
///
/// Object keys are sorted recursively before hashing, so logically-equal
/// parameter objects derive equal keys regardless of the order their
/// properties were built in. The readable operation prefix is what
/// `RequestCache::clear` substring-matches against; the SHA256 suffix
/// keeps keys fixed-length no matter how large the parameters are.
pub fn derive_key(op: &str, params: &Value) -> String {
  let mut canonical = String::new();
  write_canonical(params, &mut canonical);

  let mut hasher = Sha256::new();
  hasher.update(canonical.as_bytes());
  format!("{}:{}", op, hex::encode(hasher.finalize()))
}

/// Serialize with sorted object keys. Array order is significant and is
/// kept as-is.
fn write_canonical(value: &Value, out: &mut String) {
  match value {
    Value::Object(map) => {
      let mut keys: Vec<&String> = map.keys().collect();
      keys.sort();
      out.push('{');
      for (i, key) in keys.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        out.push_str(&Value::String((*key).clone()).to_string());
        out.push(':');
        write_canonical(&map[key.as_str()], out);
      }
      out.push('}');
    }
    Value::Array(items) => {
      out.push('[');
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_canonical(item, out);
      }
      out.push(']');
    }
    leaf => out.push_str(&leaf.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_key_stable_across_property_order() {
    let a = derive_key("search", &json!({ "a": 1, "b": 2 }));
    let b = derive_key("search", &json!({ "b": 2, "a": 1 }));
    assert_eq!(a, b);
  }

  #[test]
  fn test_key_stable_for_nested_objects() {
    let a = derive_key("search", &json!({ "q": { "x": 1, "y": [1, 2] }, "n": 5 }));
    let b = derive_key("search", &json!({ "n": 5, "q": { "y": [1, 2], "x": 1 } }));
    assert_eq!(a, b);
  }

  #[test]
  fn test_array_order_is_significant() {
    let a = derive_key("search", &json!({ "fields": ["summary", "status"] }));
    let b = derive_key("search", &json!({ "fields": ["status", "summary"] }));
    assert_ne!(a, b);
  }

  #[test]
  fn test_different_params_derive_different_keys() {
    let a = derive_key("boards", &json!({ "project": "ALPHA" }));
    let b = derive_key("boards", &json!({ "project": "BETA" }));
    assert_ne!(a, b);
  }

  #[test]
  fn test_different_ops_derive_different_keys() {
    let params = json!({ "id": 7 });
    assert_ne!(derive_key("boards", &params), derive_key("sprints", &params));
  }

  #[test]
  fn test_op_prefix_is_readable() {
    let key = derive_key("myself", &json!({}));
    assert!(key.starts_with("myself:"));
  }
}
