// Synchronization loop
// Mirrors the tracked session into the presence sink, once per change

use crate::artwork::ArtworkSource;
use crate::clock::Clock;
use crate::plex::traits::MediaAccount;
use crate::plex::Session;
use crate::presence::{
    build_track_presence, connect_with_retry, set_presence, PresenceSink, SinkConnector,
};
use crate::tracker::SessionTracker;
use anyhow::Result;
use std::time::Duration;

/// Extra wait after clearing the presence when nothing is playing
pub const IDLE_DELAY: Duration = Duration::from_secs(15);

/// Where sessions come from. Errors are fatal to the loop.
pub trait SessionFeed {
    fn fetch(&mut self) -> Result<Option<Session>>;
}

impl<A: MediaAccount> SessionFeed for SessionTracker<A> {
    fn fetch(&mut self) -> Result<Option<Session>> {
        SessionTracker::fetch(self)
    }
}

/// What the last poll saw
#[derive(Debug, Clone, PartialEq, Eq)]
enum Observed {
    NoSession,
    Active { key: String, state: String },
}

/// Owns every piece of mutable state: the sink handle, the artwork memo
/// (inside the artwork source) and the last observed session.
pub struct SyncLoop<T, A, C: SinkConnector, K> {
    sessions: T,
    artwork: A,
    connector: C,
    /// Empty only while a replacement connection is being made
    sink: Option<C::Sink>,
    clock: K,
    refresh: Duration,
    observed: Observed,
}

impl<T, A, C, K> SyncLoop<T, A, C, K>
where
    T: SessionFeed,
    A: ArtworkSource,
    C: SinkConnector,
    K: Clock,
{
    /// Connect to the sink (blocking until it works) and start idle
    pub fn new(sessions: T, artwork: A, connector: C, clock: K, refresh: Duration) -> Self {
        let sink = connect_with_retry(&connector, &clock);

        Self {
            sessions,
            artwork,
            connector,
            sink: Some(sink),
            clock,
            refresh,
            observed: Observed::NoSession,
        }
    }

    /// Poll forever. Only a fatal session-source error ends the loop.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.poll()?;
        }
    }

    /// One poll cycle, including its sleeps
    pub fn poll(&mut self) -> Result<()> {
        match self.sessions.fetch()? {
            Some(session) => self.on_session(&session),
            None => self.on_idle(),
        }

        self.clock.sleep(self.refresh);

        Ok(())
    }

    fn on_session(&mut self, session: &Session) {
        let current = Observed::Active {
            key: session.key.clone(),
            state: session.player_state.clone(),
        };

        if current == self.observed {
            return;
        }

        // Recorded before building: a failed build or push is not retried
        // until the session or its state changes again.
        self.observed = current;

        let payload = match build_track_presence(session, &mut self.artwork) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!(
                    "Failed to build presence for {}, skipping update, {:#}",
                    session.sort_title,
                    e
                );
                return;
            }
        };

        let now = self.clock.now();
        let pushed = match self.sink.as_mut() {
            Some(sink) => set_presence(sink, &payload, now),
            None => false,
        };

        if !pushed {
            // Close the dead client before a new one registers
            self.sink = None;
            self.sink = Some(connect_with_retry(&self.connector, &self.clock));
        }
    }

    fn on_idle(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.clear() {
                log::debug!("Failed to clear Discord Rich Presence, {:#}", e);
            }
        }

        self.clock.sleep(IDLE_DELAY);

        self.observed = Observed::NoSession;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plex::session::tests::track;
    use crate::plex::ArtworkRef;
    use crate::presence::tests::{FakeClock, FlakyConnector, RecordingSink};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    const REFRESH: Duration = Duration::from_secs(5);

    impl Clock for Rc<FakeClock> {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            FakeClock::now(self)
        }

        fn sleep(&self, duration: Duration) {
            FakeClock::sleep(self, duration)
        }
    }

    struct ScriptedFeed(VecDeque<Result<Option<Session>, String>>);

    impl ScriptedFeed {
        fn new(polls: Vec<Option<Session>>) -> Self {
            Self(polls.into_iter().map(Ok).collect())
        }
    }

    impl SessionFeed for ScriptedFeed {
        fn fetch(&mut self) -> Result<Option<Session>> {
            self.0
                .pop_front()
                .unwrap_or(Ok(None))
                .map_err(anyhow::Error::msg)
        }
    }

    #[derive(Clone, Default)]
    struct CountingArtwork {
        calls: Rc<Cell<u32>>,
        fail: Rc<Cell<bool>>,
    }

    impl ArtworkSource for CountingArtwork {
        fn resolve(&mut self, _artwork: &ArtworkRef) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            if self.fail.get() {
                anyhow::bail!("imgur down");
            }
            Ok("https://i.imgur.com/cover.png".to_string())
        }
    }

    struct Harness {
        sync: SyncLoop<ScriptedFeed, CountingArtwork, FlakyConnector, Rc<FakeClock>>,
        artwork: CountingArtwork,
        sinks: Rc<RefCell<Vec<RecordingSink>>>,
        attempts: Rc<Cell<u32>>,
        open: Rc<Cell<u32>>,
        open_at_attempt: Rc<RefCell<Vec<u32>>>,
        clock: Rc<FakeClock>,
    }

    impl Harness {
        fn new(polls: Vec<Option<Session>>) -> Self {
            let artwork = CountingArtwork::default();
            let connector = FlakyConnector::new(0);
            let sinks = connector.sinks.clone();
            let attempts = connector.attempts.clone();
            let open = connector.open.clone();
            let open_at_attempt = connector.open_at_attempt.clone();
            let clock = Rc::new(FakeClock::default());
            let sync = SyncLoop::new(
                ScriptedFeed::new(polls),
                artwork.clone(),
                connector,
                clock.clone(),
                REFRESH,
            );

            Self {
                sync,
                artwork,
                sinks,
                attempts,
                open,
                open_at_attempt,
                clock,
            }
        }

        fn poll(&mut self, times: usize) {
            for _ in 0..times {
                self.sync.poll().unwrap();
            }
        }

        fn sink(&self, index: usize) -> RecordingSink {
            self.sinks.borrow()[index].clone()
        }

        fn total_updates(&self) -> usize {
            self.sinks.borrow().iter().map(|s| s.updates.borrow().len()).sum()
        }
    }

    #[test]
    fn unchanged_session_is_pushed_once() {
        let session = track("/library/metadata/1", "alice", "playing");
        let mut h = Harness::new(vec![Some(session.clone()), Some(session)]);

        h.poll(2);

        assert_eq!(h.total_updates(), 1);
        assert_eq!(h.artwork.calls.get(), 1);
        assert_eq!(*h.clock.sleeps.borrow(), vec![REFRESH, REFRESH]);
    }

    #[test]
    fn state_change_triggers_push() {
        let mut h = Harness::new(vec![
            Some(track("/library/metadata/1", "alice", "playing")),
            Some(track("/library/metadata/1", "alice", "paused")),
        ]);

        h.poll(2);

        let updates = h.sink(0).updates.borrow().clone();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].start.is_some());
        assert_eq!(updates[1].small_image, "paused");
        assert_eq!(updates[1].start, None);
    }

    #[test]
    fn new_track_triggers_push() {
        let mut h = Harness::new(vec![
            Some(track("/library/metadata/1", "alice", "playing")),
            Some(track("/library/metadata/2", "alice", "playing")),
        ]);

        h.poll(2);

        assert_eq!(h.total_updates(), 2);
    }

    #[test]
    fn idle_clears_and_forgets_session() {
        let session = track("/library/metadata/1", "alice", "playing");
        let mut h = Harness::new(vec![Some(session.clone()), None, Some(session)]);

        h.poll(3);

        let sink = h.sink(0);
        assert_eq!(sink.updates.borrow().len(), 2);
        assert_eq!(sink.clears.get(), 1);
        assert_eq!(
            *h.clock.sleeps.borrow(),
            vec![REFRESH, IDLE_DELAY, REFRESH, REFRESH]
        );
    }

    #[test]
    fn clear_failure_is_ignored() {
        let mut h = Harness::new(vec![None, None]);
        h.sink(0).fail_clears.set(true);

        h.poll(2);

        assert_eq!(h.sink(0).clears.get(), 2);
        assert_eq!(h.attempts.get(), 1);
    }

    #[test]
    fn failed_push_reconnects_before_next_poll() {
        let mut h = Harness::new(vec![
            Some(track("/library/metadata/1", "alice", "playing")),
            Some(track("/library/metadata/1", "alice", "playing")),
            Some(track("/library/metadata/2", "alice", "playing")),
        ]);
        h.sink(0).fail_updates.set(true);
        h.sync.connector.failures_left.set(2);

        h.poll(1);

        // Two failed attempts at 15s each, then the poll interval
        assert_eq!(h.attempts.get(), 4);
        assert_eq!(
            *h.clock.sleeps.borrow(),
            vec![crate::presence::RECONNECT_DELAY, crate::presence::RECONNECT_DELAY, REFRESH]
        );

        // The failed payload is not retried for the unchanged session
        h.poll(1);
        assert_eq!(h.total_updates(), 0);

        h.poll(1);
        assert_eq!(h.sink(1).updates.borrow().len(), 1);
    }

    #[test]
    fn dead_client_is_closed_before_reconnecting() {
        let mut h = Harness::new(vec![Some(track("/library/metadata/1", "alice", "playing"))]);
        h.sink(0).fail_updates.set(true);
        h.sync.connector.failures_left.set(1);
        assert_eq!(h.open.get(), 1);

        h.poll(1);

        // Startup connect, then a failed and a successful retry with nothing open
        assert_eq!(*h.open_at_attempt.borrow(), vec![0, 0, 0]);
        assert_eq!(h.open.get(), 1);
        assert_eq!(h.sinks.borrow().len(), 2);
    }

    #[test]
    fn artwork_failure_skips_until_next_change() {
        let session = track("/library/metadata/1", "alice", "playing");
        let mut h = Harness::new(vec![
            Some(session.clone()),
            Some(session),
            Some(track("/library/metadata/1", "alice", "paused")),
        ]);
        h.artwork.fail.set(true);

        h.poll(2);
        assert_eq!(h.total_updates(), 0);
        assert_eq!(h.artwork.calls.get(), 1);

        h.artwork.fail.set(false);
        h.poll(1);
        assert_eq!(h.total_updates(), 1);
        assert_eq!(h.attempts.get(), 1);
    }

    #[test]
    fn fatal_source_error_stops_the_loop() {
        let mut h = Harness::new(vec![]);
        h.sync.sessions.0.push_back(Err("no matching server".to_string()));

        assert!(h.sync.poll().is_err());
        assert!(h.clock.sleeps.borrow().is_empty());
    }
}
