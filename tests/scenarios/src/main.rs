fn main() {
    println!("Run `cargo test -p scenarios` to execute the end-to-end negotiation scenarios.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{self, Write};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use storecopy_discovery::Directory;
    use storecopy_fabric::{Endpoint, Fabric};
    use storecopy_initiator::{InitiatorConfig, Negotiation, Outcome, Stage, State, TransferRequest};
    use storecopy_protocol::{Kind, NegotiationMessage, Status};
    use storecopy_responder::{Responder, ResponderConfig, ResponderHandle};
    use storecopy_storage::{FileStatus, LocalStorage, Storage, StorageError, WriteStream};

    /// How long a machine must stay suspended to count as "waiting forever".
    const SUSPENDED: Duration = Duration::from_millis(300);

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> NegotiationMessage {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        NegotiationMessage::from_json(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Local storage whose writer dies after the first write.
    struct MidStreamFault(LocalStorage);

    struct DyingWriter {
        inner: WriteStream,
        written: bool,
    }

    impl Write for DyingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written {
                return Err(io::Error::other("disk detached"));
            }
            self.written = true;
            let n = buf.len().min(4);
            self.inner.write(&buf[..n])
        }
        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl Storage for MidStreamFault {
        fn exists(&self, path: &str) -> Result<bool, StorageError> {
            self.0.exists(path)
        }
        fn create(&self, path: &str) -> Result<WriteStream, StorageError> {
            Ok(Box::new(DyingWriter {
                inner: self.0.create(path)?,
                written: false,
            }))
        }
        fn stat(&self, path: &str) -> Result<FileStatus, StorageError> {
            self.0.stat(path)
        }
    }

    /// Storage whose existence check always fails.
    struct Unreachable;

    impl Storage for Unreachable {
        fn exists(&self, _path: &str) -> Result<bool, StorageError> {
            Err(io::Error::other("connection refused").into())
        }
        fn create(&self, _path: &str) -> Result<WriteStream, StorageError> {
            Err(io::Error::other("connection refused").into())
        }
        fn stat(&self, _path: &str) -> Result<FileStatus, StorageError> {
            Err(io::Error::other("connection refused").into())
        }
    }

    struct World {
        tmp: tempfile::TempDir,
        fabric: Fabric,
        directory: Directory,
        source: PathBuf,
    }

    impl World {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let source = tmp.path().join("source.dat");
            let bytes: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
            fs::write(&source, bytes).unwrap();
            Self {
                tmp,
                fabric: Fabric::new(),
                directory: Directory::new(),
                source,
            }
        }

        fn root(&self) -> PathBuf {
            self.tmp.path().join("ns")
        }

        fn local(&self) -> LocalStorage {
            LocalStorage::open(&self.root()).unwrap()
        }

        fn start(
            &self,
            name: &str,
            storage: Arc<dyn Storage>,
            config: ResponderConfig,
        ) -> ResponderHandle {
            let ep = self.fabric.endpoint(name).unwrap();
            let config = ResponderConfig {
                name: name.into(),
                ..config
            };
            Responder::new(config, storage, ep).start(&self.directory).unwrap()
        }

        fn responder(&self) -> ResponderHandle {
            self.start("storecopy", Arc::new(self.local()), ResponderConfig::default())
        }

        fn initiator(&self, name: &str) -> Endpoint {
            self.fabric.endpoint(name).unwrap()
        }

        fn negotiation<'a>(&'a self, ep: &'a Endpoint, target: &str) -> Negotiation<'a> {
            Negotiation::new(
                ep,
                &self.directory,
                TransferRequest::new(&self.source, target),
                InitiatorConfig::default(),
            )
        }
    }

    fn same_bytes(a: &Path, b: &Path) -> bool {
        fs::read(a).unwrap() == fs::read(b).unwrap()
    }

    // -- Wire format --

    #[test]
    fn fixtures_chain_by_correlation() {
        let open = load_fixture("open.json");
        let accept = load_fixture("accept.json");
        let commit = load_fixture("commit.json");
        let failed = load_fixture("failed_io_fault.json");

        assert_eq!(open.kind, Kind::Open);
        assert_eq!(accept.in_reply_to.as_ref(), Some(&open.correlation_tag));
        assert_eq!(commit.in_reply_to.as_ref(), Some(&accept.correlation_tag));
        assert_eq!(failed.in_reply_to.as_ref(), Some(&commit.correlation_tag));
        assert_eq!(failed.status().unwrap(), Status::IoFault);
    }

    #[test]
    fn encoded_open_matches_fixture_shape() {
        let fixture = load_fixture("open.json");
        let built = NegotiationMessage::open(
            fixture.sender.clone(),
            fixture.receiver.clone(),
            fixture.payload.clone(),
        );
        let a: serde_json::Value = serde_json::from_str(&built.to_json().unwrap()).unwrap();
        let b: serde_json::Value = serde_json::from_str(&fixture.to_json().unwrap()).unwrap();

        let keys = |v: &serde_json::Value| {
            let mut k: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
            k.sort();
            k
        };
        assert_eq!(keys(&a), keys(&b));
        assert_eq!(a["topic"], b["topic"]);
    }

    // -- Scenario A: happy path --

    #[tokio::test]
    async fn scenario_a_happy_path() {
        let w = World::new();
        let handle = w.responder();
        let ep = w.initiator("initiator");
        let mut n = w.negotiation(&ep, "/reports/q3.dat");

        let outcome = n.run().await.unwrap();
        assert!(outcome.is_success(), "{outcome}");
        assert_eq!(n.messages_sent(), 2);
        assert!(same_bytes(&w.source, &w.root().join("reports/q3.dat")));

        let report = handle.shutdown().await.unwrap();
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.total_bytes, 200_000);
    }

    // -- Scenario B: destination collision --

    #[tokio::test]
    async fn scenario_b_collision_sends_no_commit() {
        let w = World::new();
        let handle = w.responder();
        fs::write(w.root().join("taken.dat"), b"existing").unwrap();

        let ep = w.initiator("initiator");
        let mut n = w.negotiation(&ep, "/taken.dat");

        assert_eq!(n.run().await.unwrap(), Outcome::AlreadyExists);
        assert_eq!(n.messages_sent(), 1);
        assert_eq!(fs::read(w.root().join("taken.dat")).unwrap(), b"existing");
        assert_eq!(handle.pending_reservations(), 0);
    }

    // -- Scenario C: copy fault --

    #[tokio::test]
    async fn scenario_c_copy_fault_leaves_initiator_suspended() {
        let w = World::new();
        let _handle = w.start(
            "storecopy",
            Arc::new(MidStreamFault(w.local())),
            ResponderConfig::default(),
        );
        let ep = w.initiator("initiator");
        let mut n = w.negotiation(&ep, "/broken.dat");

        let waited = tokio::time::timeout(SUSPENDED, n.run()).await;
        assert!(waited.is_err(), "initiator must still be waiting");
        assert!(matches!(n.state(), State::AwaitCommitReply { .. }));
        assert_eq!(ep.pending(), 0);
    }

    #[tokio::test]
    async fn scenario_c_copy_fault_reported_when_enabled() {
        let w = World::new();
        let _handle = w.start(
            "storecopy",
            Arc::new(MidStreamFault(w.local())),
            ResponderConfig {
                report_io_faults: true,
                ..ResponderConfig::default()
            },
        );
        let ep = w.initiator("initiator");
        let mut n = w.negotiation(&ep, "/broken.dat");

        assert_eq!(
            n.run().await.unwrap(),
            Outcome::ResponderFault {
                stage: Stage::Commit
            }
        );
    }

    // -- Scenario D: no responder --

    #[tokio::test]
    async fn scenario_d_no_responder() {
        let w = World::new();
        let ep = w.initiator("initiator");
        let mut n = w.negotiation(&ep, "/x.dat");

        let outcome = n.run().await.unwrap();
        assert_eq!(outcome, Outcome::NoResponder);
        assert!(outcome.is_setup_failure());
        assert_eq!(n.messages_sent(), 0);
    }

    // -- Scenario E: ambiguous responder --

    #[tokio::test]
    async fn scenario_e_two_responders() {
        let w = World::new();
        let h1 = w.start("r1", Arc::new(w.local()), ResponderConfig::default());
        let h2 = w.start("r2", Arc::new(w.local()), ResponderConfig::default());
        let ep = w.initiator("initiator");
        let mut n = w.negotiation(&ep, "/x.dat");

        assert_eq!(
            n.run().await.unwrap(),
            Outcome::AmbiguousResponder { count: 2 }
        );
        assert_eq!(n.messages_sent(), 0);
        assert_eq!(h1.pending_reservations() + h2.pending_reservations(), 0);
        assert!(!w.root().join("x.dat").exists());
    }

    // -- Cross-crate properties --

    #[tokio::test]
    async fn concurrent_negotiations_do_not_clobber_targets() {
        let w = World::new();
        let _handle = w.responder();
        let ep1 = w.initiator("i1");
        let ep2 = w.initiator("i2");
        let ep3 = w.initiator("i3");
        let mut n1 = w.negotiation(&ep1, "/a.dat");
        let mut n2 = w.negotiation(&ep2, "/b.dat");
        let mut n3 = w.negotiation(&ep3, "/c/d.dat");

        let (o1, o2, o3) = tokio::join!(n1.run(), n2.run(), n3.run());
        assert!(o1.unwrap().is_success());
        assert!(o2.unwrap().is_success());
        assert!(o3.unwrap().is_success());

        for target in ["a.dat", "b.dat", "c/d.dat"] {
            assert!(same_bytes(&w.source, &w.root().join(target)), "{target}");
        }
    }

    #[tokio::test]
    async fn racing_for_one_target_has_one_winner() {
        let w = World::new();
        let _handle = w.responder();
        let ep1 = w.initiator("i1");
        let ep2 = w.initiator("i2");
        let mut n1 = w.negotiation(&ep1, "/contested.dat");
        let mut n2 = w.negotiation(&ep2, "/contested.dat");

        let (o1, o2) = tokio::join!(n1.run(), n2.run());
        let outcomes = [o1.unwrap(), o2.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
        assert!(outcomes.contains(&Outcome::AlreadyExists));
        assert!(same_bytes(&w.source, &w.root().join("contested.dat")));
    }

    #[tokio::test]
    async fn replies_reach_only_their_initiator() {
        let w = World::new();
        let _handle = w.responder();
        let ep1 = w.initiator("i1");
        let ep2 = w.initiator("i2");

        // i2 never runs a negotiation; nothing may land in its mailbox.
        let mut n1 = w.negotiation(&ep1, "/mine.dat");
        assert!(n1.run().await.unwrap().is_success());
        assert_eq!(ep2.pending(), 0);
        assert_eq!(ep1.pending(), 0);
    }

    #[tokio::test]
    async fn existence_fault_with_deadline_times_out() {
        let w = World::new();
        let _handle = w.start("storecopy", Arc::new(Unreachable), ResponderConfig::default());
        let ep = w.initiator("initiator");
        let mut n = Negotiation::new(
            &ep,
            &w.directory,
            TransferRequest::new(&w.source, "/x.dat"),
            InitiatorConfig {
                reply_timeout: Some(Duration::from_millis(100)),
                ..InitiatorConfig::default()
            },
        );

        assert_eq!(
            n.run().await.unwrap(),
            Outcome::TimedOut { stage: Stage::Open }
        );
    }

    #[tokio::test]
    async fn retry_after_rejection_needs_a_new_machine() {
        let w = World::new();
        let _handle = w.responder();
        let ep = w.initiator("initiator");

        let mut first = w.negotiation(&ep, "/retry.dat");
        assert!(first.run().await.unwrap().is_success());

        let mut second = w.negotiation(&ep, "/retry.dat");
        assert_eq!(second.run().await.unwrap(), Outcome::AlreadyExists);
        // The first machine stays terminal.
        assert!(first.step().await.unwrap().is_terminal());
    }
}
