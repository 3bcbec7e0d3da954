//! EndpointEmitter.

use crate::encoding::encode_gov_message;
use crate::error::EndpointEmitterError as Error;
use crate::events::{EndpointEvent, EventSink};
use crate::ports::EndpointTransport;
use photon_types::{
    constants::{ADDRESS_MAX_LEN, PARAMS_MAX_LEN},
    ChainId, FunctionSelector, GovMessage, OpaqueAddr, ProtocolId,
};
use std::sync::Arc;
use tracing::instrument;

pub struct EndpointEmitter {
    transport: Arc<dyn EndpointTransport>,
    events: Arc<dyn EventSink>,
}

impl EndpointEmitter {
    pub fn new(transport: Arc<dyn EndpointTransport>, events: Arc<dyn EventSink>) -> Self {
        Self { transport, events }
    }

    /// `emit(govProtocolId, chainId, destGovAddress, selector, params)`
    ///: encodes `message` to its stable selector and
    /// opaque payload, concatenates them into wire bytes, and hands them to
    /// the injected transport. Every admin change maps to exactly one call.
    #[instrument(skip(self, message))]
    pub fn emit(
        &self,
        gov_protocol_id: ProtocolId,
        chain_id: ChainId,
        dest_gov_address: OpaqueAddr,
        message: GovMessage,
    ) -> Result<(), Error> {
        if dest_gov_address.0.len() > ADDRESS_MAX_LEN {
            return Err(Error::AddressTooBig);
        }
        let selector = message.selector_tag();
        let payload = encode_gov_message(&message);
        if payload.len() > PARAMS_MAX_LEN {
            return Err(Error::PayloadTooBig);
        }

        let mut wire_bytes = FunctionSelector::evm(selector).encode();
        wire_bytes.extend_from_slice(&payload);

        self.transport.send(chain_id, dest_gov_address.clone(), wire_bytes);
        self.events.emit(EndpointEvent::GovMessageEmitted {
            protocol_id: gov_protocol_id,
            chain_id,
            dest_gov_address,
            selector,
        });
        Ok(())
    }
}
