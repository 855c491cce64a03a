//! Drain-based shutdown over real HTTP connections.
//!
//! Hashing requests are slowed to a few hundred milliseconds so that a
//! shutdown can be issued while they are still in flight.

use std::{net::SocketAddr, ops::Range, time::Duration};

use anyhow::Result;
use hash_server::{
    app::AppState,
    config::Settings,
    server::{HashServer, ServeError},
    state::ServerState,
    stats::Statistics,
};
use reqwest::{Client, StatusCode};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    task::JoinHandle,
    time::{sleep, timeout},
};

type ServerTask = JoinHandle<Result<Statistics, ServeError>>;

async fn start_server(delay_ms: Range<u64>) -> Result<(SocketAddr, AppState, ServerTask)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let server = HashServer::new(
        listener,
        Settings {
            delay_ms,
            ..Settings::default()
        },
    );
    let addr = server.local_addr()?;
    let app = server.state();
    let task = tokio::spawn(server.run_until(std::future::pending::<()>()));
    Ok((addr, app, task))
}

fn spawn_hash(
    client: &Client,
    addr: SocketAddr,
    secret: &'static str,
) -> JoinHandle<Result<StatusCode>> {
    let client = client.clone();
    tokio::spawn(async move {
        let response = client
            .post(format!("http://{addr}/hash"))
            .form(&[("password", secret)])
            .send()
            .await?;
        Ok(response.status())
    })
}

async fn wait_for_in_flight(app: &AppState, expected: u64) -> Result<()> {
    timeout(Duration::from_secs(2), async {
        while app.tracker.in_flight() < expected {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn shutdown_with_nothing_in_flight_stops_promptly() -> Result<()> {
    let (addr, app, task) = start_server(0..0).await?;
    let client = Client::new();

    let response = client.get(format!("http://{addr}/shutdown")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "200 - Shutting down\n");

    let stats = timeout(Duration::from_secs(5), task).await???;
    assert_eq!(stats, Statistics::default());
    assert_eq!(app.lifecycle.current(), ServerState::Stopped);
    Ok(())
}

#[tokio::test]
async fn requests_after_shutdown_are_refused() -> Result<()> {
    let (addr, app, task) = start_server(600..600).await?;
    let client = Client::new();

    // Keeps the listener open while the refusals are checked.
    let slow = spawn_hash(&client, addr, "slow");
    wait_for_in_flight(&app, 1).await?;

    let response = client.post(format!("http://{addr}/shutdown")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(format!("http://{addr}/hash"))
        .form(&[("password", "late")])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = client.get(format!("http://{addr}/stats")).send().await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(slow.await??, StatusCode::OK);

    let stats = timeout(Duration::from_secs(5), task).await???;
    assert_eq!(stats.request_count, 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_waits_for_every_in_flight_request() -> Result<()> {
    let (addr, app, task) = start_server(300..500).await?;
    let client = Client::new();

    let in_flight: Vec<_> = ["one", "two", "three"]
        .into_iter()
        .map(|secret| spawn_hash(&client, addr, secret))
        .collect();
    wait_for_in_flight(&app, 3).await?;

    let response = client.get(format!("http://{addr}/shutdown")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!task.is_finished(), "server stopped with requests in flight");

    for request in in_flight {
        assert_eq!(request.await??, StatusCode::OK);
    }

    let stats = timeout(Duration::from_secs(5), task).await???;
    assert_eq!(stats.request_count, 3);
    assert_eq!(app.tracker.in_flight(), 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_shutdowns_are_both_acknowledged() -> Result<()> {
    let (addr, app, task) = start_server(400..400).await?;
    let client = Client::new();

    let slow = spawn_hash(&client, addr, "slow");
    wait_for_in_flight(&app, 1).await?;

    let url = format!("http://{addr}/shutdown");
    let (first, second) = tokio::join!(client.get(&url).send(), client.post(&url).send());
    assert_eq!(first?.status(), StatusCode::OK);
    assert_eq!(second?.status(), StatusCode::OK);
    assert_eq!(app.lifecycle.current(), ServerState::Draining);

    assert_eq!(slow.await??, StatusCode::OK);
    timeout(Duration::from_secs(5), task).await???;
    assert_eq!(app.lifecycle.current(), ServerState::Stopped);
    Ok(())
}

#[tokio::test]
async fn interrupt_drains_like_shutdown_endpoint() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let server = HashServer::new(
        listener,
        Settings {
            delay_ms: 300..300,
            ..Settings::default()
        },
    );
    let addr = server.local_addr()?;
    let app = server.state();

    let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(server.run_until(async move {
        let _ = interrupt_rx.await;
    }));

    let client = Client::new();
    let slow = spawn_hash(&client, addr, "slow");
    wait_for_in_flight(&app, 1).await?;

    let _ = interrupt_tx.send(());
    assert_eq!(slow.await??, StatusCode::OK);

    let stats = timeout(Duration::from_secs(5), task).await???;
    assert_eq!(stats.request_count, 1);
    assert_eq!(app.lifecycle.current(), ServerState::Stopped);
    Ok(())
}

#[tokio::test]
async fn stalled_connection_makes_shutdown_time_out() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let server = HashServer::new(
        listener,
        Settings {
            delay_ms: 0..0,
            shutdown_timeout: Duration::from_millis(300),
            ..Settings::default()
        },
    );
    let addr = server.local_addr()?;
    let app = server.state();
    let task = tokio::spawn(server.run_until(std::future::pending::<()>()));

    // The body never completes, so the connection stays open past the drain.
    let mut stalled = TcpStream::connect(addr).await?;
    stalled
        .write_all(
            b"POST /hash HTTP/1.1\r\n\
              Host: localhost\r\n\
              Content-Type: application/x-www-form-urlencoded\r\n\
              Content-Length: 20\r\n\r\n\
              password=",
        )
        .await?;
    stalled.flush().await?;
    sleep(Duration::from_millis(50)).await;

    let response = Client::new()
        .get(format!("http://{addr}/shutdown"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let result = timeout(Duration::from_secs(5), task).await??;
    assert!(
        matches!(result, Err(ServeError::ShutdownTimeout(limit)) if limit == Duration::from_millis(300)),
        "expected shutdown timeout, got {result:?}"
    );
    assert_eq!(app.lifecycle.current(), ServerState::Stopped);

    drop(stalled);
    Ok(())
}
