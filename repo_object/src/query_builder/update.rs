use indexmap::IndexMap;
use serde_json::Value;

/// Type of update operation to perform on a field
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Set field to a specific value: field = $N
    Set(Value),

    /// Increment field by a value: field = field + $N
    Increment(Value),

    /// Decrement field by a value: field = field - $N
    Decrement(Value),

    /// Multiply field by a value: field = field * $N
    Multiply(Value),

    /// Divide field by a value: field = field / $N
    Divide(Value),
}

impl UpdateOperation {
    /// Render the assignment for this operation, e.g. `field = field + $3`
    pub fn to_sql(&self, field_name: &str, operand: &str) -> String {
        match self {
            UpdateOperation::Set(_) => format!("{} = {}", field_name, operand),
            UpdateOperation::Increment(_) => {
                format!("{} = {} + {}", field_name, field_name, operand)
            }
            UpdateOperation::Decrement(_) => {
                format!("{} = {} - {}", field_name, field_name, operand)
            }
            UpdateOperation::Multiply(_) => {
                format!("{} = {} * {}", field_name, field_name, operand)
            }
            UpdateOperation::Divide(_) => {
                format!("{} = {} / {}", field_name, field_name, operand)
            }
        }
    }

    /// Get the value to bind as a parameter
    pub fn value(&self) -> &Value {
        match self {
            UpdateOperation::Set(v)
            | UpdateOperation::Increment(v)
            | UpdateOperation::Decrement(v)
            | UpdateOperation::Multiply(v)
            | UpdateOperation::Divide(v) => v,
        }
    }
}

/// Declarative field mutation applied by bulk updates.
///
/// Operations keep their insertion order; assigning the same field twice
/// replaces the earlier operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    operations: IndexMap<String, UpdateOperation>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to a specific value
    pub fn set(self, field: impl Into<String>, value: Value) -> Self {
        self.with(field, UpdateOperation::Set(value))
    }

    /// Increment a field by a value (atomic: field = field + value)
    pub fn increment(self, field: impl Into<String>, value: Value) -> Self {
        self.with(field, UpdateOperation::Increment(value))
    }

    /// Decrement a field by a value (atomic: field = field - value)
    pub fn decrement(self, field: impl Into<String>, value: Value) -> Self {
        self.with(field, UpdateOperation::Decrement(value))
    }

    /// Multiply a field by a value (atomic: field = field * value)
    pub fn multiply(self, field: impl Into<String>, value: Value) -> Self {
        self.with(field, UpdateOperation::Multiply(value))
    }

    /// Divide a field by a value (atomic: field = field / value)
    pub fn divide(self, field: impl Into<String>, value: Value) -> Self {
        self.with(field, UpdateOperation::Divide(value))
    }

    fn with(mut self, field: impl Into<String>, operation: UpdateOperation) -> Self {
        self.operations.insert(field.into(), operation);
        self
    }

    pub fn operations(&self) -> impl Iterator<Item = (&str, &UpdateOperation)> {
        self.operations
            .iter()
            .map(|(field, operation)| (field.as_str(), operation))
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.operations.contains_key(field)
    }

    /// Check if there are any operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }
}
