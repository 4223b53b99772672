//! Method names and parameter keys understood by a ticket provider.

pub const ADD_TICKET: &str = "cas.addTicket";
pub const GET_TICKET: &str = "cas.getTicket";
pub const UPDATE_TICKET: &str = "cas.updateTicket";
pub const DELETE_TICKET: &str = "cas.deleteTicket";
pub const GET_TICKETS: &str = "cas.getTickets";
pub const GET_PROVIDER_ID: &str = "cas.getProviderId";

/// Named parameter / result key holding the ticket id.
pub const TICKET_ID: &str = "ticket-id";
/// Named parameter / result key holding the base64 ticket blob.
pub const TICKET: &str = "ticket";
/// Result key of `cas.getTickets`.
pub const TICKETS: &str = "tickets";
/// Result key of `cas.getProviderId`.
pub const PROVIDER_ID: &str = "provider-id";
/// Result key carrying a mutation status.
pub const STATUS: &str = "status";
