//! The per-request classifier value handed to the stage by the application.

/// Selects which closed enumeration `operation_type`/`operation_context` are drawn from.
/// POSIX-specific enumerations are out of core scope; `General` is the only tag this
/// repository ships, sized by [`crate::options::GENERAL_OPERATIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextType {
    General,
}

/// Immutable value attached to each request.
///
/// All four classifier fields must be legal values for the active [`ContextType`]
/// enumeration, or the sentinel [`crate::options::NO_OP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    workflow_id: u32,
    operation_type: u32,
    operation_context: u32,
    operation_size: u64,
    total_operations: i32,
}

impl Context {
    pub fn new(
        workflow_id: u32,
        operation_type: u32,
        operation_context: u32,
        operation_size: u64,
        total_operations: i32,
    ) -> Self {
        Context {
            workflow_id,
            operation_type,
            operation_context,
            operation_size,
            total_operations,
        }
    }

    pub fn workflow_id(&self) -> u32 {
        self.workflow_id
    }

    pub fn operation_type(&self) -> u32 {
        self.operation_type
    }

    pub fn operation_context(&self) -> u32 {
        self.operation_context
    }

    pub fn operation_size(&self) -> u64 {
        self.operation_size
    }

    pub fn total_operations(&self) -> i32 {
        self.total_operations
    }
}
