use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use rax_share_server::cache::{Cache, InMemoryCacheStore};
use rax_share_server::config::ServerConfig;
use rax_share_server::identity::{HmacBearer, InMemoryDirectory};
use rax_share_server::notify::Notifier;
use rax_share_server::storage::LocalStorage;
use rax_share_server::{Server, Services};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

const PHONE: &str = "+15550100";

#[derive(Default)]
struct Outbox(Mutex<Vec<String>>);

impl Notifier for Outbox {
    fn send(&self, _destination: &str, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

impl Outbox {
    fn last_code(&self) -> String {
        let messages = self.0.lock().unwrap();
        let last = messages.last().expect("no otp sent");
        last.rsplit(' ').next().unwrap().to_string()
    }
}

struct TestServer {
    addr: SocketAddr,
    outbox: Arc<Outbox>,
    _dir: TempDir,
}

async fn start_server(configure: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.server.control_port = 0;
    config.server.storage_root = dir.path().display().to_string();
    configure(&mut config);

    let outbox = Arc::new(Outbox::default());
    let services = Services::new(
        Cache::InMemory(Arc::new(InMemoryCacheStore::new())),
        Arc::new(LocalStorage::new(dir.path(), config.server.max_file_size_bytes()).unwrap()),
        Arc::new(InMemoryDirectory::new()),
        Arc::new(
            HmacBearer::new(config.auth.signing_key.as_bytes(), config.auth.access_token_ttl())
                .unwrap(),
        ),
        outbox.clone(),
        &config,
    );

    let server = Server::bind(Arc::new(config), Arc::new(services))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move { server.run().await });

    TestServer {
        addr,
        outbox,
        _dir: dir,
    }
}

struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Session {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    /// Connects and consumes the greeting.
    async fn open(addr: SocketAddr) -> Self {
        let mut session = Self::connect(addr).await;
        let greeting = session.line().await;
        assert!(greeting.starts_with("220 "), "{}", greeting);
        session
    }

    async fn line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line.trim_end_matches("\r\n").to_string()
    }

    async fn send(&mut self, command: &str) {
        self.writer
            .write_all(format!("{}\r\n", command).as_bytes())
            .await
            .unwrap();
    }

    async fn call(&mut self, command: &str) -> String {
        self.send(command).await;
        self.line().await
    }

    async fn bytes(&mut self, len: usize) -> Vec<u8> {
        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).await.unwrap();
        payload
    }

    async fn at_eof(&mut self) -> bool {
        let mut rest = Vec::new();
        matches!(self.reader.read_to_end(&mut rest).await, Ok(0))
    }

    async fn login(&mut self, outbox: &Outbox) -> String {
        assert!(self.call(&format!("LOGIN {}", PHONE)).await.starts_with("200 "));
        let reply = self
            .call(&format!("VERIFY {} {}", PHONE, outbox.last_code()))
            .await;
        reply
            .strip_prefix("230 ")
            .unwrap_or_else(|| panic!("login failed: {}", reply))
            .to_string()
    }
}

#[tokio::test]
async fn upload_list_download_and_share() {
    let server = start_server(|_| {}).await;
    let mut session = Session::open(server.addr).await;

    assert!(session.call("LIST").await.starts_with("530 "));

    assert!(session.call(&format!("LOGIN {}", PHONE)).await.starts_with("200 "));
    let code = server.outbox.last_code();
    let wrong = if code == "000000" { "111111" } else { "000000" };
    assert!(
        session
            .call(&format!("VERIFY {} {}", PHONE, wrong))
            .await
            .starts_with("530 ")
    );
    let bearer = session
        .call(&format!("VERIFY {} {}", PHONE, code))
        .await
        .strip_prefix("230 ")
        .expect("bearer reply")
        .to_string();

    session.send("PUT report.pdf 8 docs").await;
    session.writer.write_all(b"%PDF-1.7").await.unwrap();
    assert_eq!(session.line().await, "226 Stored 1/docs/report.pdf");

    assert_eq!(session.call("LIST docs").await, "211-Listing docs");
    let entry = session.line().await;
    assert!(entry.starts_with("report.pdf|8|"), "{}", entry);
    assert!(entry.ends_with("|file"), "{}", entry);
    assert_eq!(session.line().await, "211 End");

    assert_eq!(session.call("GET docs/report.pdf").await, "150 report.pdf 8");
    assert_eq!(session.bytes(8).await, b"%PDF-1.7");
    assert_eq!(session.line().await, "226 Transfer complete");

    let share = session.call("SHARE docs/report.pdf 3").await;
    let mut parts = share.split(' ');
    assert_eq!(parts.next(), Some("250"));
    let url = parts.next().expect("share url");
    assert!(url.starts_with("http://localhost:8080/api/v1/share/"), "{}", url);
    assert!(parts.next().expect("expiry").parse::<u64>().is_ok());
    let token = url.rsplit('/').next().unwrap().to_string();

    assert!(session.call("GET ../2/secret.txt").await.starts_with("501 "));

    assert_eq!(session.call("QUIT").await, "221 Goodbye");
    assert!(session.at_eof().await);

    // Anyone holding the token can fetch without logging in.
    let mut stranger = Session::open(server.addr).await;
    assert_eq!(
        stranger.call(&format!("FETCH {}", token)).await,
        "150 report.pdf 8"
    );
    assert_eq!(stranger.bytes(8).await, b"%PDF-1.7");
    assert_eq!(stranger.line().await, "226 Transfer complete");
    assert!(stranger.call("FETCH not-a-token").await.starts_with("550 "));

    // The bearer resumes the identity on a new connection.
    let mut resumed = Session::open(server.addr).await;
    assert_eq!(
        resumed.call(&format!("AUTH {}", bearer)).await,
        "230 Authenticated"
    );
    assert!(resumed.call("LIST").await.starts_with("211-"));
}

#[tokio::test]
async fn overlong_command_is_rejected_without_closing() {
    let server = start_server(|config| config.server.max_command_length = 64).await;
    let mut session = Session::open(server.addr).await;

    let long = format!("LIST {}", "a".repeat(600));
    assert_eq!(session.call(&long).await, "500 Command too long");
    assert_eq!(session.call("NOOP").await, "500 Syntax error, command unrecognized");
    assert_eq!(session.call("QUIT").await, "221 Goodbye");
}

#[tokio::test]
async fn sessions_beyond_the_limit_are_turned_away() {
    let server = start_server(|config| config.server.max_clients = 1).await;
    let mut first = Session::open(server.addr).await;

    let mut second = Session::connect(server.addr).await;
    assert!(second.line().await.starts_with("421 "));
    assert!(second.at_eof().await);

    assert_eq!(first.call("QUIT").await, "221 Goodbye");
    assert!(first.at_eof().await);
}

#[tokio::test]
async fn oversized_upload_closes_the_session() {
    let server = start_server(|config| config.server.max_file_size_mb = 1).await;
    let mut session = Session::open(server.addr).await;
    session.login(&server.outbox).await;

    assert!(session.call("PUT big.bin 2000000").await.starts_with("552 "));
    assert!(session.at_eof().await);
}

#[tokio::test]
async fn anonymous_upload_is_refused_before_the_payload() {
    let server = start_server(|_| {}).await;
    let mut session = Session::open(server.addr).await;

    // Only the header is sent; the reply must not wait for 50 MB.
    assert!(session.call("PUT a.bin 50000000").await.starts_with("530 "));
    assert!(session.at_eof().await);
}
