//! Deterministic opaque byte encoding of governance message payloads. ABI
//! encoding of individual selector payloads is an explicit
//! external-collaborator concern — this crate only needs a stable,
//! self-describing byte blob to hand to the transport, built with an
//! explicit big-endian byte-buffer builder.

use photon_types::{ActorKind, GovMessage, OpaqueAddr, TransmitterId};

struct Writer(Vec<u8>);

impl Writer {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_be_bytes());
    }

    fn bytes(&mut self, b: &[u8]) {
        self.u32(b.len() as u32);
        self.0.extend_from_slice(b);
    }

    fn id32(&mut self, id: &[u8; 32]) {
        self.0.extend_from_slice(id);
    }

    fn addr(&mut self, a: &OpaqueAddr) {
        self.bytes(&a.0);
    }

    fn transmitters(&mut self, ts: &[TransmitterId]) {
        self.u32(ts.len() as u32);
        for t in ts {
            self.0.extend_from_slice(&t.0);
        }
    }

    fn bool(&mut self, b: bool) {
        self.0.push(u8::from(b));
    }

    fn finish(self) -> Vec<u8> {
        self.0
    }
}

/// Encodes a [`GovMessage`] to a self-describing opaque byte blob.
pub fn encode_gov_message(message: &GovMessage) -> Vec<u8> {
    let mut w = Writer::new();
    match message {
        GovMessage::AddAllowedProtocol { protocol_id, consensus_target_rate, transmitters } => {
            w.id32(&protocol_id.0);
            w.u32(*consensus_target_rate);
            w.transmitters(transmitters);
        }
        GovMessage::AddOrRemoveActorAddress { protocol_id, actor_address, kind, add } => {
            w.id32(&protocol_id.0);
            w.addr(actor_address);
            w.bool(matches!(kind, ActorKind::Proposer));
            w.bool(*add);
        }
        GovMessage::AddOrRemoveExecutor { protocol_id, executor, add } => {
            w.id32(&protocol_id.0);
            w.addr(executor);
            w.bool(*add);
        }
        GovMessage::AddOrRemoveTransmitters { protocol_id, transmitters, add } => {
            w.id32(&protocol_id.0);
            w.transmitters(transmitters);
            w.bool(*add);
        }
        GovMessage::UpdateTransmitters { protocol_id, to_add, to_remove } => {
            w.id32(&protocol_id.0);
            w.transmitters(to_add);
            w.transmitters(to_remove);
        }
        GovMessage::SetConsensusTargetRate { protocol_id, consensus_target_rate } => {
            w.id32(&protocol_id.0);
            w.u32(*consensus_target_rate);
        }
        GovMessage::SetDaoProtocolOwner { protocol_id, protocol_owner } => {
            w.id32(&protocol_id.0);
            w.addr(protocol_owner);
        }
    }
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use photon_types::ProtocolId;

    #[test]
    fn encoding_is_deterministic() {
        let msg = GovMessage::SetConsensusTargetRate {
            protocol_id: ProtocolId::from_tag("x"),
            consensus_target_rate: 6000,
        };
        assert_eq!(encode_gov_message(&msg), encode_gov_message(&msg));
    }

    #[test]
    fn encoding_differs_by_payload() {
        let a = GovMessage::SetConsensusTargetRate {
            protocol_id: ProtocolId::from_tag("x"),
            consensus_target_rate: 6000,
        };
        let b = GovMessage::SetConsensusTargetRate {
            protocol_id: ProtocolId::from_tag("x"),
            consensus_target_rate: 7000,
        };
        assert_ne!(encode_gov_message(&a), encode_gov_message(&b));
    }

    #[test]
    fn encoding_differs_by_variant() {
        let pid = ProtocolId::from_tag("x");
        let a = GovMessage::SetConsensusTargetRate { protocol_id: pid, consensus_target_rate: 6000 };
        let b = GovMessage::AddOrRemoveTransmitters { protocol_id: pid, transmitters: vec![], add: true };
        assert_ne!(encode_gov_message(&a), encode_gov_message(&b));
    }
}
