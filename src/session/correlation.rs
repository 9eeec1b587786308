// ABOUTME: Correlation table matching response PDUs to the request that caused them
// ABOUTME: Also owns sequence number allocation for everything a session sends

use super::error::SessionError;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Highest sequence number a request may carry (SMPP v3.4 section 3.2).
const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

pub(crate) type SubmitResult = Result<String, SessionError>;

#[derive(Debug)]
pub(crate) enum PendingRequest {
    Bind,
    Submit(oneshot::Sender<SubmitResult>),
}

#[derive(Debug)]
pub(crate) struct PendingRequests {
    next_sequence_number: u32,
    pending: HashMap<u32, PendingRequest>,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self {
            next_sequence_number: 1,
            pending: HashMap::new(),
        }
    }

    /// Next number in 1..=0x7FFFFFFF, wrapping back to 1.
    pub(crate) fn next_sequence_number(&mut self) -> u32 {
        let sequence_number = self.next_sequence_number;
        self.next_sequence_number = if sequence_number >= MAX_SEQUENCE_NUMBER {
            1
        } else {
            sequence_number + 1
        };
        sequence_number
    }

    pub(crate) fn register(&mut self, sequence_number: u32, request: PendingRequest) {
        self.pending.insert(sequence_number, request);
    }

    pub(crate) fn take(&mut self, sequence_number: u32) -> Option<PendingRequest> {
        self.pending.remove(&sequence_number)
    }

    /// Resolves every waiting submit with the error from `error`.
    pub(crate) fn fail_all(&mut self, error: impl Fn() -> SessionError) {
        for (_, request) in self.pending.drain() {
            if let PendingRequest::Submit(tx) = request {
                // The caller may have given up already.
                let _ = tx.send(Err(error()));
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
