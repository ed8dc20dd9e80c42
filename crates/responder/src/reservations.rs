use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use storecopy_protocol::{ActorAddress, CorrelationTag};

/// A target path held for one accepted negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub target_path: String,
    /// Initiator the ACCEPT was sent to; only it may commit.
    pub initiator: ActorAddress,
    pub accepted_at: Instant,
}

/// Per-negotiation reservations keyed by ACCEPT correlation tag (thread-safe).
///
/// A path stays held from `reserve` until `release`, which covers the
/// window between taking a reservation and finishing its copy.
#[derive(Debug, Default)]
pub struct Reservations {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    by_tag: HashMap<CorrelationTag, Reservation>,
    held_paths: HashSet<String>,
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds `target_path` for `initiator` under `tag`.
    ///
    /// Returns `false` (and changes nothing) if the path is already held.
    pub fn reserve(
        &self,
        tag: CorrelationTag,
        target_path: &str,
        initiator: ActorAddress,
    ) -> bool {
        let mut s = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !s.held_paths.insert(target_path.to_string()) {
            return false;
        }
        s.by_tag.insert(
            tag,
            Reservation {
                target_path: target_path.to_string(),
                initiator,
                accepted_at: Instant::now(),
            },
        );
        true
    }

    /// Removes and returns the reservation for `tag` if it belongs to
    /// `initiator`. The path stays held until [`release`](Self::release).
    pub fn take(&self, tag: &CorrelationTag, initiator: &ActorAddress) -> Option<Reservation> {
        let mut s = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if s.by_tag.get(tag)?.initiator != *initiator {
            return None;
        }
        s.by_tag.remove(tag)
    }

    /// Frees `target_path` for future negotiations.
    pub fn release(&self, target_path: &str) {
        let mut s = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        s.held_paths.remove(target_path);
    }

    /// Returns `true` if `target_path` is reserved or being written.
    pub fn is_held(&self, target_path: &str) -> bool {
        let s = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        s.held_paths.contains(target_path)
    }

    /// Drops reservations whose COMMIT has not arrived within `ttl` and
    /// frees their paths. Returns how many were dropped.
    ///
    /// Reservations already taken for a copy are not affected.
    pub fn expire(&self, ttl: Duration) -> usize {
        let mut s = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let stale: Vec<CorrelationTag> = s
            .by_tag
            .iter()
            .filter(|(_, r)| r.accepted_at.elapsed() >= ttl)
            .map(|(tag, _)| tag.clone())
            .collect();
        for tag in &stale {
            if let Some(r) = s.by_tag.remove(tag) {
                s.held_paths.remove(&r.target_path);
            }
        }
        stale.len()
    }

    /// Number of accepted negotiations still waiting for a COMMIT.
    pub fn len(&self) -> usize {
        let s = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        s.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ActorAddress {
        ActorAddress::new("alice")
    }

    #[test]
    fn reserve_and_take() {
        let r = Reservations::new();
        let tag = CorrelationTag::generate("accept");
        assert!(r.reserve(tag.clone(), "/a", alice()));
        assert_eq!(r.len(), 1);
        assert!(r.is_held("/a"));

        let res = r.take(&tag, &alice()).unwrap();
        assert_eq!(res.target_path, "/a");
        assert!(r.is_empty());
        // Still held until the copy finishes.
        assert!(r.is_held("/a"));

        r.release("/a");
        assert!(!r.is_held("/a"));
    }

    #[test]
    fn same_path_cannot_be_reserved_twice() {
        let r = Reservations::new();
        assert!(r.reserve(CorrelationTag::generate("accept"), "/a", alice()));
        assert!(!r.reserve(
            CorrelationTag::generate("accept"),
            "/a",
            ActorAddress::new("bob")
        ));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn take_unknown_tag() {
        let r = Reservations::new();
        assert!(r.take(&CorrelationTag::generate("accept"), &alice()).is_none());
    }

    #[test]
    fn take_by_other_initiator_is_refused() {
        let r = Reservations::new();
        let tag = CorrelationTag::generate("accept");
        r.reserve(tag.clone(), "/a", alice());

        assert!(r.take(&tag, &ActorAddress::new("mallory")).is_none());
        // The rightful owner can still commit.
        assert!(r.take(&tag, &alice()).is_some());
    }

    #[test]
    fn expire_frees_abandoned_paths_only() {
        let r = Reservations::new();
        let abandoned = CorrelationTag::generate("accept");
        let copying = CorrelationTag::generate("accept");
        r.reserve(abandoned.clone(), "/orphan", alice());
        r.reserve(copying.clone(), "/busy", alice());
        r.take(&copying, &alice()).unwrap();

        assert_eq!(r.expire(Duration::from_secs(3600)), 0);
        assert!(r.is_held("/orphan"));

        assert_eq!(r.expire(Duration::ZERO), 1);
        assert!(!r.is_held("/orphan"));
        assert!(r.take(&abandoned, &alice()).is_none());
        // The in-flight copy keeps its path until released.
        assert!(r.is_held("/busy"));
        assert!(r.is_empty());
    }

    #[test]
    fn keyed_records_do_not_clobber() {
        let r = Reservations::new();
        let t1 = CorrelationTag::generate("accept");
        let t2 = CorrelationTag::generate("accept");
        r.reserve(t1.clone(), "/one", alice());
        r.reserve(t2.clone(), "/two", alice());

        assert_eq!(r.take(&t2, &alice()).unwrap().target_path, "/two");
        assert_eq!(r.take(&t1, &alice()).unwrap().target_path, "/one");
    }

    #[test]
    fn concurrent_reservations() {
        use std::sync::Arc;
        use std::thread;

        let r = Arc::new(Reservations::new());
        let mut handles = vec![];

        // 8 threads racing for the same 10 paths.
        for t in 0..8 {
            let r = Arc::clone(&r);
            handles.push(thread::spawn(move || {
                let mut won = 0;
                for p in 0..10 {
                    let who = ActorAddress::new(format!("i{t}"));
                    if r.reserve(CorrelationTag::generate("accept"), &format!("/p{p}"), who) {
                        won += 1;
                    }
                }
                won
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // Each path is won exactly once.
        assert_eq!(total, 10);
        assert_eq!(r.len(), 10);
    }
}
