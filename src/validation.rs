use std::fmt;
use std::rc::Rc;

use crate::model::{Edge, Node};
use crate::plugin::PluginRegistry;

// ============================================================================
// Edge Validation Framework
// ============================================================================

/// Result of edge validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Edge may be committed
    Valid,
    /// Edge is rejected with a reason
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }
}

/// Reasons why an edge was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Source and target are the same node
    SelfLoop,
    /// An edge with the same source and target already exists
    DuplicateEdge,
    /// Another edge already ends at this input port
    TargetOccupied { node_id: String, index: usize },
    /// An endpoint references a node that is not in the graph
    NodeNotFound(String),
    /// A plugin's `validate_edge` voted against the edge
    RejectedByPlugin,
    /// Custom validation failure
    Custom(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfLoop => write!(f, "Cannot connect a node to itself"),
            Self::DuplicateEdge => write!(f, "Edge already exists"),
            Self::TargetOccupied { node_id, index } => {
                write!(f, "Input {} of node {} is already connected", index, node_id)
            }
            Self::NodeNotFound(id) => write!(f, "Node {} not found", id),
            Self::RejectedByPlugin => write!(f, "Rejected by plugin"),
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

/// Graph state an [`EdgeValidator`] sees.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub nodes: &'a [Node],
    pub edges: &'a [Edge],
    pub plugins: &'a PluginRegistry,
}

impl<'a> ValidationContext<'a> {
    pub fn new(nodes: &'a [Node], edges: &'a [Edge], plugins: &'a PluginRegistry) -> Self {
        Self {
            nodes,
            edges,
            plugins,
        }
    }
}

/// Trait for edge validation logic.
///
/// Implement this to add custom rules for connecting ports, and combine
/// rules with [`CompositeValidator`].
///
/// # Example
///
/// ```ignore
/// struct SingleFanOut;
///
/// impl EdgeValidator for SingleFanOut {
///     fn validate(&self, candidate: &Edge, ctx: &ValidationContext<'_>) -> ValidationResult {
///         if ctx.edges.iter().any(|e| e.source == candidate.source) {
///             ValidationResult::Invalid(ValidationError::Custom("one output edge only".into()))
///         } else {
///             ValidationResult::Valid
///         }
///     }
/// }
/// ```
pub trait EdgeValidator {
    fn validate(&self, candidate: &Edge, ctx: &ValidationContext<'_>) -> ValidationResult;
}

/// Decides whether `candidate` may join the edges already ending at its
/// target port. Receives the candidate and those existing edges.
pub type MultiInputPolicy = Rc<dyn Fn(&Edge, &[&Edge]) -> bool>;

/// Default connectability rule.
///
/// 1. Both endpoint nodes must exist
/// 2. Source and target must be different nodes
/// 3. No identical edge may exist
/// 4. The target port must be free, unless the injected multi-input policy
///    or a registered plugin's `validate_edge` explicitly allows sharing it
#[derive(Clone, Default)]
pub struct DefaultEdgeValidator {
    multi_input: Option<MultiInputPolicy>,
}

impl DefaultEdgeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow occupied targets when `policy` returns true.
    pub fn with_multi_input<F>(policy: F) -> Self
    where
        F: Fn(&Edge, &[&Edge]) -> bool + 'static,
    {
        Self {
            multi_input: Some(Rc::new(policy)),
        }
    }

    fn allows_shared_target(&self, candidate: &Edge, occupying: &[&Edge], ctx: &ValidationContext<'_>) -> bool {
        if let Some(policy) = &self.multi_input {
            if policy(candidate, occupying) {
                return true;
            }
        }
        ctx.plugins.validate_edge(candidate, ctx.nodes, ctx.edges) == Some(true)
    }
}

impl fmt::Debug for DefaultEdgeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultEdgeValidator")
            .field("multi_input", &self.multi_input.is_some())
            .finish()
    }
}

impl EdgeValidator for DefaultEdgeValidator {
    fn validate(&self, candidate: &Edge, ctx: &ValidationContext<'_>) -> ValidationResult {
        for endpoint in [&candidate.source, &candidate.target] {
            if !ctx.nodes.iter().any(|n| n.node_id == endpoint.node_id) {
                return ValidationResult::Invalid(ValidationError::NodeNotFound(endpoint.node_id.clone()));
            }
        }

        if candidate.is_self_loop() {
            return ValidationResult::Invalid(ValidationError::SelfLoop);
        }

        if ctx.edges.iter().any(|e| e == candidate) {
            return ValidationResult::Invalid(ValidationError::DuplicateEdge);
        }

        let occupying: Vec<&Edge> = ctx.edges.iter().filter(|e| e.same_target(candidate)).collect();
        if !occupying.is_empty() && !self.allows_shared_target(candidate, &occupying, ctx) {
            return ValidationResult::Invalid(ValidationError::TargetOccupied {
                node_id: candidate.target.node_id.clone(),
                index: candidate.target.index,
            });
        }

        ValidationResult::Valid
    }
}

/// Rejects edges any registered plugin votes against.
#[derive(Clone, Copy, Debug, Default)]
pub struct PluginVetoValidator;

impl EdgeValidator for PluginVetoValidator {
    fn validate(&self, candidate: &Edge, ctx: &ValidationContext<'_>) -> ValidationResult {
        match ctx.plugins.validate_edge(candidate, ctx.nodes, ctx.edges) {
            Some(false) => ValidationResult::Invalid(ValidationError::RejectedByPlugin),
            _ => ValidationResult::Valid,
        }
    }
}

/// Composite validator that combines multiple validators
///
/// All validators must return Valid for the edge to be valid (AND logic).
/// Returns the first error encountered.
///
/// # Example
///
/// ```ignore
/// let validator = CompositeValidator::new()
///     .add(DefaultEdgeValidator::new())
///     .add(PluginVetoValidator);
/// ```
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn EdgeValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validator. Validators run in insertion order and the first
    /// invalid result short-circuits.
    pub fn add<V: EdgeValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// The validator used for interactive edge creation: the default rule
    /// followed by the plugin veto.
    pub fn standard() -> Self {
        Self::new().add(DefaultEdgeValidator::new()).add(PluginVetoValidator)
    }
}

impl EdgeValidator for CompositeValidator {
    fn validate(&self, candidate: &Edge, ctx: &ValidationContext<'_>) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(candidate, ctx);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

impl<F> EdgeValidator for F
where
    F: Fn(&Edge, &ValidationContext<'_>) -> ValidationResult,
{
    fn validate(&self, candidate: &Edge, ctx: &ValidationContext<'_>) -> ValidationResult {
        self(candidate, ctx)
    }
}

/// Convenience function to validate an edge with any validator
pub fn validate_edge<V>(candidate: &Edge, ctx: &ValidationContext<'_>, validator: &V) -> ValidationResult
where
    V: EdgeValidator + ?Sized,
{
    validator.validate(candidate, ctx)
}

/// The default connectability rule without node or plugin context:
/// no candidate, self-loops, duplicates and occupied targets are rejected.
pub fn is_edge_connectable(candidate: Option<&Edge>, edges: &[Edge]) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };
    !candidate.is_self_loop() && !edges.iter().any(|e| e == candidate || e.same_target(candidate))
}

// ============================================================================
// Tests
// ============================================================================
