// snapdeck_link — peer-to-peer TCP transport for game sessions.
//
// Provides a non-blocking interface for the main thread to exchange
// `WireEvent`s with the single remote peer. Architecture:
// - `dial()` / `accept()` establish the TCP connection on the calling
//   thread, then spawn a background reader thread.
// - The reader thread calls `read_frame()` in a loop, decodes events, and
//   pushes `LinkEvent`s into an `mpsc` channel.
// - The main thread holds a `BufWriter<TcpStream>` for sending and drains
//   the inbox with `poll()`.
//
// This separation ensures the main thread never blocks on network I/O.
// The reader thread handles the blocking reads, and the writer flushes
// synchronously (acceptable for the small events we send; the one large
// event, a full-snapshot ack, is still well under the frame limit).
//
// Error handling follows the tiered model: an undecodable payload is a
// recoverable fault — it is logged and dropped, and the stream continues
// with the next frame. An I/O or framing failure is unrecoverable and
// ends the reader loop with a final `Disconnected`, leaving reset
// decisions to the session layer.
//
// There is no relay in the middle: whichever endpoint listens is the
// host, the dialer is the guest, and both speak the same symmetric
// protocol once connected.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use snapdeck_protocol::framing::{decode_event, read_frame, write_event};
use snapdeck_protocol::WireEvent;

/// What `poll()` hands back to the session-owning thread.
#[derive(Debug)]
pub enum LinkEvent {
    /// One decoded event from the peer.
    Event(WireEvent),
    /// The stream ended or failed; no further events will arrive.
    Disconnected,
}

/// One live connection to the remote peer.
pub struct PeerLink {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<LinkEvent>,
    _reader_thread: Option<JoinHandle<()>>,
    peer_addr: String,
}

impl PeerLink {
    /// Connect out to a listening host. The caller becomes the guest.
    pub fn dial(addr: &str) -> Result<Self, String> {
        let stream = TcpStream::connect(addr).map_err(|e| format!("connect failed: {e}"))?;
        Self::from_stream(stream)
    }

    /// Accept the next inbound connection. The caller is the host; the
    /// listener can be reused for a replacement connection after a drop.
    pub fn accept(listener: &TcpListener) -> Result<Self, String> {
        let (stream, _) = listener
            .accept()
            .map_err(|e| format!("accept failed: {e}"))?;
        Self::from_stream(stream)
    }

    fn from_stream(stream: TcpStream) -> Result<Self, String> {
        stream
            .set_nodelay(true)
            .map_err(|e| format!("set_nodelay failed: {e}"))?;
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".into());
        let reader_stream = stream
            .try_clone()
            .map_err(|e| format!("clone failed: {e}"))?;
        let writer = BufWriter::new(stream);

        let (tx, rx) = mpsc::channel();
        let reader = BufReader::new(reader_stream);
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(Self {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
            peer_addr,
        })
    }

    /// Address of the remote peer, for display and logs.
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Frame and send one event, flushing immediately.
    pub fn send(&mut self, event: &WireEvent) -> Result<(), String> {
        write_event(&mut self.writer, event).map_err(|e| format!("send failed: {e}"))?;
        self.writer
            .flush()
            .map_err(|e| format!("flush failed: {e}"))
    }

    /// Drain all queued link events (non-blocking).
    pub fn poll(&self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = self.inbox.try_recv() {
            events.push(ev);
        }
        events
    }

    /// Close the connection. The reader thread observes the shutdown as
    /// end-of-stream and reports `Disconnected`.
    pub fn disconnect(&mut self) {
        if let Ok(stream) = self.writer.get_ref().try_clone() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

/// Reader thread: read framed payloads in a loop, decode, push to channel.
/// Decode failures skip the frame; read failures end the loop.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<LinkEvent>) {
    loop {
        let bytes = match read_frame(&mut reader) {
            Ok(bytes) => bytes,
            Err(_) => break, // EOF or stream error
        };
        match decode_event(&bytes) {
            Ok(event) => {
                if tx.send(LinkEvent::Event(event)).is_err() {
                    break; // Main thread dropped the receiver
                }
            }
            Err(e) => {
                eprintln!("[link] dropping undecodable event: {e}");
            }
        }
    }
    let _ = tx.send(LinkEvent::Disconnected);
}
