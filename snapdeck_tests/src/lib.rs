// Test-only peer harness for session integration tests.
//
// Wraps a real `PeerLink` (from `snapdeck_link`) around a real
// `GameSession` (from `snapdeck_game`) to provide a synchronous,
// test-friendly API for exercising the full peer pipeline:
// listen → dial → hello/sync → confirm → pick → ack → verify state.
//
// The only test-specific code here is the synchronous pump/wait wrappers
// (blocking loops around `PeerLink::poll()`) and the manual clock. All
// protocol, session, and transport logic uses the same code paths as the
// real game.
//
// See also: `tests/peer_session.rs` for the integration test scenarios.

use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use snapdeck_game::config::GameConfig;
use snapdeck_game::context::SharedContext;
use snapdeck_game::session::{GameSession, OpponentKind};
use snapdeck_link::{LinkEvent, PeerLink};
use snapdeck_protocol::types::CharacterId;

/// Default timeout for blocking wait operations.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A test peer wrapping a real link and session. Time is a manual
/// `now_ms` counter owned by the test, never the wall clock.
pub struct TestPeer {
    pub link: PeerLink,
    pub session: GameSession,
    pub ctx: SharedContext,
    pub disconnected: bool,
}

impl TestPeer {
    /// Build a connected host/guest pair over loopback TCP, with the same
    /// playing order on both sides and the connect handshake pumped.
    pub fn connected_pair(config: GameConfig, order: &[&str]) -> (TestPeer, TestPeer) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let addr = listener.local_addr().expect("local_addr failed").to_string();

        let dial_thread = thread::spawn(move || PeerLink::dial(&addr).expect("dial failed"));
        let host_link = PeerLink::accept(&listener).expect("accept failed");
        let guest_link = dial_thread.join().expect("dial thread panicked");

        let order: Vec<CharacterId> = order.iter().map(|s| CharacterId(s.to_string())).collect();
        let mut host = TestPeer {
            link: host_link,
            session: GameSession::new(config.clone(), OpponentKind::RemoteHuman, true, 101),
            ctx: SharedContext::new(order.clone()),
            disconnected: false,
        };
        let mut guest = TestPeer {
            link: guest_link,
            session: GameSession::new(config, OpponentKind::RemoteHuman, false, 202),
            ctx: SharedContext::new(order),
            disconnected: false,
        };
        host.session.set_local_name("Host");
        guest.session.set_local_name("Guest");
        host.session.peer_connected(&host.ctx);
        guest.session.peer_connected(&guest.ctx);
        host.flush();
        guest.flush();
        pump_until_quiet(&mut host, &mut guest, 0);
        (host, guest)
    }

    /// Apply everything the link has queued, then send everything the
    /// session queued. Returns how many inbound events were applied.
    pub fn pump(&mut self, now_ms: i64) -> usize {
        let mut applied = 0;
        for link_event in self.link.poll() {
            match link_event {
                LinkEvent::Event(event) => {
                    self.session.handle_remote(event, now_ms, &mut self.ctx);
                    applied += 1;
                }
                LinkEvent::Disconnected => {
                    self.disconnected = true;
                    self.session.peer_disconnected(&mut self.ctx);
                    applied += 1;
                }
            }
        }
        self.flush();
        applied
    }

    /// Send the session's queued outbound events.
    pub fn flush(&mut self) {
        for event in self.session.drain_outbox() {
            self.link.send(&event).expect("link send failed");
        }
    }

    /// Block until `predicate` holds, pumping inbound events while waiting.
    pub fn wait_until(&mut self, now_ms: i64, what: &str, predicate: impl Fn(&TestPeer) -> bool) {
        let start = Instant::now();
        loop {
            self.pump(now_ms);
            if predicate(self) {
                return;
            }
            assert!(
                start.elapsed() < WAIT_TIMEOUT,
                "timed out waiting for {what}"
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Own-perspective state hash, for cross-peer consistency checks.
    pub fn state_hash(&self) -> i32 {
        self.session
            .snapshot(&self.ctx)
            .state_hash()
            .expect("state hash failed")
            .0
    }

    /// The peer's state hash as this side would want to see it.
    pub fn reversed_state_hash(&self) -> i32 {
        self.session
            .snapshot(&self.ctx)
            .role_reversed()
            .state_hash()
            .expect("state hash failed")
            .0
    }
}

/// Pump both peers until neither side has pending traffic. Real delivery
/// is asynchronous, so "quiet" means several consecutive empty polls.
pub fn pump_until_quiet(a: &mut TestPeer, b: &mut TestPeer, now_ms: i64) {
    let start = Instant::now();
    let mut quiet_rounds = 0;
    while quiet_rounds < 10 {
        assert!(
            start.elapsed() < WAIT_TIMEOUT,
            "timed out pumping peers to quiescence"
        );
        let moved = a.pump(now_ms) + b.pump(now_ms);
        if moved == 0 {
            quiet_rounds += 1;
            thread::sleep(POLL_INTERVAL);
        } else {
            quiet_rounds = 0;
        }
    }
}

/// Assert both peers hold role-reversed-identical state.
pub fn assert_in_sync(a: &TestPeer, b: &TestPeer) {
    assert_eq!(
        a.state_hash(),
        b.reversed_state_hash(),
        "peer states diverged"
    );
}
