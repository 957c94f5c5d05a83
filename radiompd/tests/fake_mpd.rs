use radiompd::{Endpoint, Error, MpdConnector, PlayState, PlayerConnector, PlayerSession};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Minimal in-process MPD speaking just enough of the protocol for the client
struct FakeMpd {
    endpoint: Endpoint,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeMpd {
    async fn start(queue_len: usize, current: Option<usize>, password: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let password = password.map(String::from);

        let log = commands.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let log = log.clone();
                let password = password.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut lines = BufReader::new(read).lines();
                    write.write_all(b"OK MPD 0.23.5\n").await.unwrap();
                    while let Ok(Some(line)) = lines.next_line().await {
                        log.lock().unwrap().push(line.clone());
                        if line == "close" {
                            break;
                        }
                        let reply = respond(&line, queue_len, current, password.as_deref());
                        if write.write_all(reply.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self {
            endpoint: Endpoint::new("127.0.0.1", port),
            commands,
        }
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

fn song(pos: usize) -> String {
    format!(
        "file: swing/{pos:02}.flac\nArtist: Artist {pos}\nTitle: Song {pos}\nTime: 180\nPos: {pos}\nId: {}\n",
        pos + 100
    )
}

fn respond(line: &str, len: usize, current: Option<usize>, password: Option<&str>) -> String {
    let bad_index = "ACK [2@0] {playlistinfo} Bad song index\n".to_string();
    if line == "status" {
        let mut reply = String::from("volume: 100\nrepeat: 0\n");
        match current {
            Some(pos) => reply.push_str(&format!(
                "state: play\nsong: {pos}\nsongid: {}\nelapsed: 42.500\n",
                pos + 100
            )),
            None => reply.push_str("state: stop\n"),
        }
        reply.push_str(&format!("playlistlength: {len}\nOK\n"));
        return reply;
    }
    if let Some(arg) = line.strip_prefix("playlistinfo ") {
        if let Some((from, to)) = arg.split_once(':') {
            let (from, to): (usize, usize) = (from.parse().unwrap(), to.parse().unwrap());
            if from >= to || to > len {
                return bad_index;
            }
            return (from..to).map(song).collect::<String>() + "OK\n";
        }
        let pos: usize = arg.parse().unwrap();
        if pos >= len {
            return bad_index;
        }
        return song(pos) + "OK\n";
    }
    if let Some(arg) = line.strip_prefix("password ") {
        let given = arg.trim_matches('"');
        return if Some(given) == password {
            "OK\n".to_string()
        } else {
            "ACK [3@0] {password} incorrect password\n".to_string()
        };
    }
    format!("ACK [5@0] {{}} unknown command \"{line}\"\n")
}

fn connector() -> MpdConnector {
    MpdConnector::new(Duration::from_millis(500))
}

#[tokio::test]
async fn status_and_queue_over_tcp() {
    let mpd = FakeMpd::start(20, Some(10), None).await;
    let mut session = connector().connect(&mpd.endpoint).await.unwrap();
    assert_eq!(session.version(), "0.23.5");

    let status = session.status().await.unwrap();
    assert_eq!(status.state, PlayState::Play);
    assert_eq!(status.song, Some(10));
    assert_eq!(status.playlist_length, 20);
    assert_eq!(status.elapsed, 42.5);

    let items = session.queue_range(5, 10, 20).await.unwrap();
    let positions: Vec<_> = items.iter().map(|i| i.position().unwrap()).collect();
    assert_eq!(positions, vec![5, 6, 7, 8, 9]);
    assert_eq!(items[0].get("artist"), Some("Artist 5"));

    session.close().await;
}

#[tokio::test]
async fn negative_start_is_clamped_before_the_query() {
    let mpd = FakeMpd::start(20, Some(2), None).await;
    let mut session = connector().connect(&mpd.endpoint).await.unwrap();

    let items = session.queue_range(-3, 2, 20).await.unwrap();
    assert_eq!(items.len(), 2);
    session.close().await;

    assert!(mpd.commands().contains(&"playlistinfo 0:2".to_string()));
}

#[tokio::test]
async fn empty_clamped_range_sends_nothing() {
    let mpd = FakeMpd::start(20, Some(19), None).await;
    let mut session = connector().connect(&mpd.endpoint).await.unwrap();

    let items = session.queue_range(20, 25, 20).await.unwrap();
    assert!(items.is_empty());
    session.close().await;

    assert!(mpd
        .commands()
        .iter()
        .all(|c| !c.starts_with("playlistinfo")));
}

#[tokio::test]
async fn missing_position_is_none() {
    let mpd = FakeMpd::start(3, Some(0), None).await;
    let mut session = connector().connect(&mpd.endpoint).await.unwrap();

    assert!(session.playlist_item(1).await.unwrap().is_some());
    assert!(session.playlist_item(7).await.unwrap().is_none());
    // an ACK does not poison the session
    assert_eq!(session.status().await.unwrap().playlist_length, 3);
}

#[tokio::test]
async fn password_is_sent_after_greeting() {
    let mpd = FakeMpd::start(3, Some(0), Some("s3cret")).await;

    let endpoint = mpd.endpoint.clone().with_password("s3cret");
    let mut session = connector().connect(&endpoint).await.unwrap();
    assert!(session.status().await.is_ok());

    let wrong = mpd.endpoint.clone().with_password("nope");
    let err = connector().connect(&wrong).await.unwrap_err();
    assert!(matches!(err, Error::Ack { code: 3, .. }));
    assert!(!err.is_connection());
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = connector()
        .connect(&Endpoint::new("127.0.0.1", port))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Connect { .. }));
    assert!(err.is_connection());
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let started = Instant::now();
    let err = MpdConnector::new(Duration::from_millis(200))
        .connect(&Endpoint::new("127.0.0.1", port))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { operation: "greeting", .. }));
    assert!(err.is_connection());
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// Server answering every command with the same raw bytes
async fn scripted_server(reply: Vec<u8>) -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let reply = reply.clone();
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut lines = BufReader::new(read).lines();
                write.write_all(b"OK MPD 0.23.5\n").await.unwrap();
                while let Ok(Some(_)) = lines.next_line().await {
                    if write.write_all(&reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    Endpoint::new("127.0.0.1", port)
}

#[tokio::test]
async fn invalid_utf8_is_a_protocol_error() {
    let endpoint = scripted_server(b"state: play\nTitle: \xff\xfe\nOK\n".to_vec()).await;
    let mut session = connector().connect(&endpoint).await.unwrap();

    let err = session.status().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "{:?}", err);
    assert!(!err.is_connection());
}

#[tokio::test]
async fn oversized_line_is_rejected_before_the_timeout() {
    let mut reply = b"state: ".to_vec();
    reply.extend(std::iter::repeat(b'a').take(radiompd::MAX_LINE_LENGTH * 2));
    let endpoint = scripted_server(reply).await;
    let mut session = MpdConnector::new(Duration::from_secs(5))
        .connect(&endpoint)
        .await
        .unwrap();

    let started = Instant::now();
    let err = session.status().await.unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(2));
}
