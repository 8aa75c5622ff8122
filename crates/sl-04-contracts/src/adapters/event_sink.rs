use crate::domain::{ContractFamily, LedgerEvent, LifeCycleKind};
use crate::ports::outbound::EventSink;
use shared_types::{Address, Timestamp};
use std::collections::BTreeSet;

/// Event sink that keeps everything it receives, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    pub events: Vec<LedgerEvent>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn life_cycle(&self, address: &str) -> Vec<LifeCycleKind> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::LifeCycle { kind, address: a, .. } if a == address => Some(*kind),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingEventSink {
    fn add_contract_event(&mut self, address: &str, function: ContractFamily, phase: &str, detail: &str) {
        self.events.push(LedgerEvent::Contract {
            address: address.to_string(),
            function,
            phase: phase.to_string(),
            detail: detail.to_string(),
        });
    }

    fn add_life_cycle_event(&mut self, kind: LifeCycleKind, address: &str, participants: &BTreeSet<Address>) {
        self.events.push(LedgerEvent::LifeCycle {
            kind,
            address: address.to_string(),
            participants: participants.clone(),
        });
    }

    fn add_contract_event_time(&mut self, address: &str, at: Timestamp) {
        self.events.push(LedgerEvent::AddEventTime {
            address: address.to_string(),
            at,
        });
    }

    fn remove_contract_event_time(&mut self, address: &str, at: Timestamp) {
        self.events.push(LedgerEvent::RemoveEventTime {
            address: address.to_string(),
            at,
        });
    }
}
