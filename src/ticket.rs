//! The per-request record built inside a channel.

/// Generated per request inside a channel. Once built, a ticket is immutable except for
/// consumption by exactly one enforcement path.
#[derive(Debug, Clone)]
pub struct Ticket {
    ticket_id: u64,
    total_operations: i32,
    payload: i64,
    operation_type: u32,
    operation_context: u32,
    content: Option<Vec<u8>>,
}

impl Ticket {
    pub fn new(
        ticket_id: u64,
        total_operations: i32,
        payload: i64,
        operation_type: u32,
        operation_context: u32,
    ) -> Self {
        Ticket {
            ticket_id,
            total_operations,
            payload,
            operation_type,
            operation_context,
            content: None,
        }
    }

    pub fn with_content(
        ticket_id: u64,
        total_operations: i32,
        payload: i64,
        operation_type: u32,
        operation_context: u32,
        content: Vec<u8>,
    ) -> Self {
        Ticket {
            ticket_id,
            total_operations,
            payload,
            operation_type,
            operation_context,
            content: Some(content),
        }
    }

    pub fn ticket_id(&self) -> u64 {
        self.ticket_id
    }

    pub fn total_operations(&self) -> i32 {
        self.total_operations
    }

    pub fn payload(&self) -> i64 {
        self.payload
    }

    pub fn operation_type(&self) -> u32 {
        self.operation_type
    }

    pub fn operation_context(&self) -> u32 {
        self.operation_context
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }
}
