//! Per-node string attributes.

use std::collections::HashMap;

use crate::error::{EngineError, Result};

/// Attribute name → values indexed by node id.
///
/// Storage is sparse-tolerant: arrays only grow as far as the highest id
/// written, reads pad with empty strings up to the graph's node count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeAttributes {
  values: HashMap<String, Vec<String>>,
}

impl NodeAttributes {
  pub fn new() -> Self {
    Self::default()
  }

  /// Write `values[i]` onto node `ids[i]` under `name`.
  pub fn add<S: AsRef<str>>(&mut self, node_count: usize, ids: &[usize], name: &str, values: &[S]) -> Result<()> {
    if ids.len() != values.len() {
      return Err(EngineError::LengthMismatch {
        what: "attribute ids and values",
        left: ids.len(),
        right: values.len(),
      });
    }
    if let Some(&bad) = ids.iter().find(|&&id| id >= node_count) {
      return Err(EngineError::NodeOutOfRange { id: bad, node_count });
    }

    let column = self.values.entry(name.to_string()).or_default();
    for (&id, value) in ids.iter().zip(values) {
      if column.len() <= id {
        column.resize(id + 1, String::new());
      }
      column[id] = value.as_ref().to_string();
    }
    Ok(())
  }

  /// Dense copy of `name` for `node_count` nodes, `""` where unset.
  ///
  /// Unknown names give an empty vector.
  pub fn get(&self, name: &str, node_count: usize) -> Vec<String> {
    match self.values.get(name) {
      Some(column) => {
        let mut dense = column.clone();
        dense.resize(node_count.max(column.len()), String::new());
        dense
      }
      None => Vec::new(),
    }
  }

  /// Raw value for one node, `None` when unset or empty.
  pub fn value(&self, name: &str, id: usize) -> Option<&str> {
    self
      .values
      .get(name)
      .and_then(|column| column.get(id))
      .map(String::as_str)
      .filter(|v| !v.is_empty())
  }

  /// True if at least one node has a non-empty value for `name`.
  pub fn has_entries(&self, name: &str) -> bool {
    self
      .values
      .get(name)
      .is_some_and(|column| column.iter().any(|v| !v.is_empty()))
  }

  /// Drop every value stored under `name`.
  pub fn clear(&mut self, name: &str) {
    self.values.remove(name);
  }

  /// Attribute names in sorted order.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.values.keys().cloned().collect();
    names.sort();
    names
  }

  pub fn clear_all(&mut self) {
    self.values.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_trip() {
    let mut attrs = NodeAttributes::new();
    attrs.add(3, &[0, 1, 2], "Attr", &["0", "100", "200"]).unwrap();
    assert_eq!(attrs.get("Attr", 3), vec!["0", "100", "200"]);
  }

  /// A node created after the write reads back as empty.
  #[test]
  fn test_pads_new_nodes() {
    let mut attrs = NodeAttributes::new();
    attrs.add(3, &[0, 1, 2], "Attr", &["0", "100", "200"]).unwrap();
    assert_eq!(attrs.get("Attr", 4), vec!["0", "100", "200", ""]);
  }

  #[test]
  fn test_sparse_write() {
    let mut attrs = NodeAttributes::new();
    attrs.add(5, &[3], "kind", &["door"]).unwrap();
    assert_eq!(attrs.get("kind", 5), vec!["", "", "", "door", ""]);
    assert_eq!(attrs.value("kind", 3), Some("door"));
    assert_eq!(attrs.value("kind", 0), None);
  }

  #[test]
  fn test_errors() {
    let mut attrs = NodeAttributes::new();
    assert!(matches!(
      attrs.add(2, &[0, 1], "a", &["x"]),
      Err(EngineError::LengthMismatch { .. })
    ));
    assert!(matches!(
      attrs.add(2, &[5], "a", &["x"]),
      Err(EngineError::NodeOutOfRange { id: 5, node_count: 2 })
    ));
  }

  #[test]
  fn test_clear_and_names() {
    let mut attrs = NodeAttributes::new();
    attrs.add(1, &[0], "b", &["1"]).unwrap();
    attrs.add(1, &[0], "a", &["2"]).unwrap();
    assert_eq!(attrs.names(), vec!["a", "b"]);
    attrs.clear("a");
    assert!(!attrs.has_entries("a"));
    assert!(attrs.get("a", 1).is_empty());
    assert!(attrs.has_entries("b"));
  }
}
