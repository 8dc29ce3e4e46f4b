//! The single-threaded event loop (§4.2, §5): the one place that owns both
//! `Environment<A>` and `A::State` at once. Everything else in this crate
//! only ever borrows one or the other for the span of a single call.

use crate::arrangement::Arrangement;
use crate::dispatch::dispatch;
use crate::env::Environment;
use crate::error::Disconnect;
use crate::log;
use crate::task::client::{accept_client, ReaderEvent};
use crate::task::peer::{resolve_sender, MAX_DATAGRAM_SIZE};
use crate::task::timer::ArmedTimer;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::sleep_until;

/// How long the loop waits when no timer is armed (§4.2 step 1: "the
/// earliest-armed timer has elapsed" degrades to this cap when there is
/// none).
const POLLING_CAP: Duration = Duration::from_secs(3600);

/// How many reader events may queue up before a client reader briefly
/// blocks. The reactor itself drains this promptly every iteration, so a
/// small bound is enough to smooth bursts without risking unbounded memory.
const READER_EVENT_BUFFER: usize = 1024;

/// Runs the reactor forever. `arrangement` and `me` are the local node's
/// identity and handler; `env` holds the already-bound sockets and cluster
/// map (§3). Never returns under normal operation — shutdown is a process
/// kill, matching §4.3/§4.4's "shutdown closes the socket" language, which
/// this expansion treats as process exit rather than an in-band message.
pub async fn run<A: Arrangement>(arrangement: A, me: A::Name, mut env: Environment<A>) -> ! {
    let mut state = arrangement.init(&me);

    let mut timers: Vec<ArmedTimer<A>> = arrangement
        .timeout_tasks()
        .into_iter()
        .map(|task| ArmedTimer::new(task, &me, &state))
        .collect();

    let (events_tx, mut events_rx) = mpsc::channel::<ReaderEvent>(READER_EVENT_BUFFER);
    let mut peer_buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        for client_id in env.drain_retirements() {
            log!("[reactor] retired client {:?}", client_id);
        }

        let wake_at = timers
            .iter()
            .map(|t| t.wake_at())
            .min()
            .unwrap_or_else(|| Instant::now() + POLLING_CAP);

        tokio::select! {
            accepted = env.listen_sock.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        log!("[reactor] accepted client connection from {}", addr);
                        accept_client(&arrangement, &mut env, stream, events_tx.clone());
                    }
                    Err(e) => log!("[reactor] accept error: {}", e),
                }
            }

            received = env.peer_sock.recv_from(&mut peer_buf) => {
                match received {
                    Ok((n, from)) => {
                        if let Some(src) = resolve_sender::<A>(&env.cluster, from) {
                            let msg = arrangement.deserialize_msg(&peer_buf[..n]);
                            if arrangement.debug() {
                                arrangement.debug_recv(&src, &msg);
                            }
                            let result = arrangement.on_peer(&me, src, msg, state);
                            state = dispatch(&arrangement, &mut env, result);
                        } else {
                            log!("[reactor] dropping datagram from unknown sender {}", from);
                        }
                    }
                    Err(e) => log!("[reactor] peer recv error: {}", e),
                }
            }

            event = events_rx.recv() => {
                match event {
                    Some(ReaderEvent::Frame(conn_id, bytes)) => {
                        if let Some(client_id) = env.client_id_of(conn_id).cloned() {
                            match arrangement.deserialize_input(&bytes, &client_id) {
                                Some(input) => {
                                    if arrangement.debug() {
                                        arrangement.debug_input(&input);
                                    }
                                    let result = arrangement.on_input(&me, input, state);
                                    state = dispatch(&arrangement, &mut env, result);
                                }
                                None => {
                                    log!("[reactor] conn {} closing: {}", conn_id, Disconnect::BadInput);
                                    env.retire(conn_id);
                                }
                            }
                        }
                    }
                    Some(ReaderEvent::Closed(conn_id, disconnect)) => {
                        log!("[reactor] conn {} closing: {}", conn_id, disconnect);
                        env.retire(conn_id);
                    }
                    None => unreachable!("the reactor holds its own sender clone, so this channel never closes"),
                }
            }

            _ = sleep_until(wake_at) => {
                if let Some(idx) = earliest_index(&timers) {
                    let result = timers[idx].fire(&me, state);
                    state = dispatch(&arrangement, &mut env, result);
                }
            }
        }
    }
}

fn earliest_index<A: Arrangement>(timers: &[ArmedTimer<A>]) -> Option<usize> {
    timers
        .iter()
        .enumerate()
        .min_by_key(|(_, t)| t.wake_at())
        .map(|(idx, _)| idx)
}
