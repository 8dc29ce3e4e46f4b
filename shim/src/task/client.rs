//! Client read/write tasks (§4.3, §4.5). Mirrors the reference codebase's
//! `reader_task`/`writer_task` split: a reader forwards decoded frames to
//! the reactor over a shared channel, a writer owns the socket's write half
//! and drains a per-connection channel the dispatcher sends encoded outputs
//! into.

use crate::arrangement::Arrangement;
use crate::env::{ConnId, Environment};
use crate::error::Disconnect;
use crate::framing::{FrameReader, FrameWriter};
use crate::log;
use bytes::{Bytes, BytesMut};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// What a client reader forwards to the reactor's fan-in channel.
pub enum ReaderEvent {
    Frame(ConnId, BytesMut),
    Closed(ConnId, Disconnect),
}

/// Reads frames off one client connection until it closes or errors,
/// forwarding each to the reactor (§4.5). Exits after reporting `Closed`;
/// the reactor is the one that actually finalizes the task (§4.7, §9).
pub async fn reader_task(
    conn_id: ConnId,
    mut reader: FrameReader<OwnedReadHalf>,
    events: mpsc::Sender<ReaderEvent>,
) {
    loop {
        match reader.receive_chunk().await {
            Ok(bytes) => {
                if events.send(ReaderEvent::Frame(conn_id, bytes)).await.is_err() {
                    log!("[client reader {}] reactor gone, exiting", conn_id);
                    return;
                }
            }
            Err(disconnect) => {
                log!("[client reader {}] closing: {}", conn_id, disconnect);
                let _ = events.send(ReaderEvent::Closed(conn_id, disconnect)).await;
                return;
            }
        }
    }
}

/// Writes outputs to one client connection as they arrive on its private
/// channel (§4.7). Exits when the channel closes, i.e. once the reactor has
/// dropped this connection's sender during retirement.
pub async fn writer_task(
    conn_id: ConnId,
    mut writer: FrameWriter<OwnedWriteHalf>,
    mut outputs: mpsc::UnboundedReceiver<Bytes>,
) {
    while let Some(bytes) = outputs.recv().await {
        if let Err(e) = writer.send_chunk(bytes.to_vec()).await {
            log!("[client writer {}] error sending output: {}", conn_id, e);
            return;
        }
    }
    log!("[client writer {}] channel closed, exiting", conn_id);
}

/// The acceptor's per-connection setup (§4.3): mint a `ClientId`, split the
/// stream, spawn the reader/writer pair, and register everything in the
/// environment.
pub fn accept_client<A: Arrangement>(
    arrangement: &A,
    env: &mut Environment<A>,
    stream: TcpStream,
    events: mpsc::Sender<ReaderEvent>,
) {
    let conn_id = env.alloc_conn_id();
    let client_id = arrangement.create_client_id();
    let (read_half, write_half) = stream.into_split();
    let reader = FrameReader::new(read_half);
    let writer = FrameWriter::new(write_half);
    let (output_tx, output_rx) = mpsc::unbounded_channel::<Bytes>();

    let reader_handle = tokio::spawn(reader_task(conn_id, reader, events));
    tokio::spawn(writer_task(conn_id, writer, output_rx));

    log!("[acceptor] accepted conn {} as client {:?}", conn_id, client_id);
    env.register_client(conn_id, client_id, output_tx, reader_handle);
}
