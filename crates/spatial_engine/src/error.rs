//! Error types for the analysis engine.
//!
//! Only caller mistakes and fatal conditions are errors. Ray misses, missing
//! paths and empty generation results are ordinary values (`RayResult::MISS`,
//! `None`).

/// Errors reported by engine operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
  /// A mesh had no usable triangles or malformed buffers.
  #[error("invalid mesh '{name}': {reason}")]
  InvalidMesh {
    /// Mesh name as supplied by the caller.
    name: String,
    /// What was wrong with it.
    reason: String,
  },

  /// A batched call received arrays whose lengths cannot be paired.
  #[error("ray batch shape mismatch: {origins} origins against {directions} directions")]
  BatchShapeMismatch {
    /// Number of origins supplied.
    origins: usize,
    /// Number of directions supplied.
    directions: usize,
  },

  /// Two parallel input arrays differ in length.
  #[error("length mismatch: {what} ({left} vs {right})")]
  LengthMismatch {
    /// Which inputs disagree.
    what: &'static str,
    left: usize,
    right: usize,
  },

  /// A node id does not exist in the graph.
  #[error("node id {id} out of range (graph has {node_count} nodes)")]
  NodeOutOfRange { id: usize, node_count: usize },

  /// The named cost set was never populated.
  #[error("no cost set named '{0}'")]
  NoCost(String),

  /// A cost-set write that would violate the shared topology.
  #[error("invalid cost operation on '{cost_set}': {reason}")]
  InvalidCostOperation { cost_set: String, reason: String },

  /// A read that requires compressed topology was made on an open graph.
  #[error("graph must be compressed before this operation")]
  NotCompressed,

  /// The attribute has no entries.
  #[error("node attribute '{0}' has no entries")]
  MissingAttribute(String),

  /// An attribute value could not be read as a number.
  #[error("attribute '{name}' on node {node} is not numeric: '{value}'")]
  InvalidAttributeValue {
    name: String,
    node: usize,
    value: String,
  },

  /// The worker pool could not be created.
  #[error("failed to build worker pool: {0}")]
  ThreadPool(String),
}

impl EngineError {
  /// Stable status code for the handle boundary.
  ///
  /// Codes are negative so they never collide with the success code `1`.
  pub fn status(&self) -> i32 {
    match self {
      EngineError::InvalidMesh { .. } => -2,
      EngineError::NotCompressed => -3,
      EngineError::NoCost(_) => -4,
      EngineError::NodeOutOfRange { .. } => -10,
      EngineError::InvalidCostOperation { .. } => -12,
      EngineError::BatchShapeMismatch { .. } | EngineError::LengthMismatch { .. } => -13,
      EngineError::MissingAttribute(_) | EngineError::InvalidAttributeValue { .. } => -14,
      EngineError::ThreadPool(_) => 0,
    }
  }

  pub(crate) fn invalid_mesh(name: &str, reason: impl Into<String>) -> Self {
    EngineError::InvalidMesh {
      name: name.to_string(),
      reason: reason.into(),
    }
  }

  pub(crate) fn invalid_cost(cost_set: &str, reason: impl Into<String>) -> Self {
    EngineError::InvalidCostOperation {
      cost_set: cost_set.to_string(),
      reason: reason.into(),
    }
  }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
