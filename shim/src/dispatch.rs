//! The response dispatcher (§4.7): flushes a handler result's outputs to
//! client connections and its peer sends to datagram addresses, then
//! returns the new state for the reactor to hold onto.

use crate::arrangement::{Arrangement, HandlerResult};
use crate::env::Environment;
use crate::log;
use bytes::Bytes;

pub fn dispatch<A: Arrangement>(
    arrangement: &A,
    env: &mut Environment<A>,
    result: HandlerResult<A>,
) -> A::State {
    let HandlerResult {
        outputs,
        state,
        sends,
    } = result;

    for output in outputs {
        let (client_id, bytes) = arrangement.serialize_output(output);
        let delivered = env
            .writer_for(&client_id)
            .map(|writer| writer.send(Bytes::from(bytes)).is_ok())
            .unwrap_or(false);
        if !delivered {
            log!(
                "[dispatch] could not deliver output to {:?}, retiring its connection",
                client_id
            );
            env.retire_client(&client_id);
        }
    }

    for (dest, msg) in sends {
        if arrangement.debug() {
            arrangement.debug_send(&dest, &msg);
        }
        match env.cluster.addr_of(&dest) {
            Some(addr) => {
                let bytes = arrangement.serialize_msg(&msg);
                if let Err(e) = env.peer_sock.try_send_to(&bytes, addr) {
                    log!("[dispatch] error sending to peer {:?} at {}: {}", dest, addr, e);
                }
            }
            None => {
                log!("[dispatch] no address known for peer {:?}, dropping send", dest);
            }
        }
    }

    state
}
