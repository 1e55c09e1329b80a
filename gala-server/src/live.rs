use std::{sync::Arc, time::Duration};

use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use gala_core::{Config, Subscription};
use log::info;
use thiserror::Error;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use crate::{context::ServerContext, errors::ServerResult, Router};

#[derive(Debug, Error)]
enum LiveError {
    #[error("write took longer than {0:?}")]
    WriteTimeout(Duration),
    #[error("nothing heard for {0:?}")]
    ReadTimeout(Duration),
    #[error(transparent)]
    Socket(#[from] axum::Error),
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "journal",
    responses(
        (
            status = 101,
            description = "Switches to a websocket carrying every change journaled from now on, as JSON text frames"
        )
    )
)]
async fn live(context: ServerContext, upgrade: WebSocketUpgrade) -> ServerResult<Response> {
    let (subscription, sequence) = context.gala.journal.subscribe().await?;
    let config = context.gala.config();

    info!(
        "Subscriber {} joined after sequence {}",
        subscription.id(),
        sequence
    );

    Ok(upgrade.on_upgrade(move |socket| serve(socket, subscription, config)))
}

/// Streams deltas to the socket until either side gives up
async fn serve(socket: WebSocket, subscription: Subscription, config: Arc<Config>) {
    let id = subscription.id();
    let (sink, stream) = socket.split();

    // Whichever loop ends first takes the other down with it
    let outcome = tokio::select! {
        result = write_loop(sink, subscription, &config) => result,
        result = read_loop(stream, config.pong_wait) => result,
    };

    match outcome {
        Ok(()) => info!("Subscriber {id} left"),
        Err(e) => info!("Subscriber {id} dropped: {e}"),
    }
}

/// Writes queued deltas, and pings while there are none.
///
/// Sends a close frame once the queue is closed, which happens when the subscriber is
/// evicted or the server shuts down.
async fn write_loop<S>(
    mut sink: S,
    mut subscription: Subscription,
    config: &Config,
) -> Result<(), LiveError>
where
    S: Sink<WsMessage, Error = axum::Error> + Unpin,
{
    let period = config.ping_period();
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let message = tokio::select! {
            message = subscription.recv() => match message {
                Some(message) => WsMessage::Text(message.payload.to_string()),
                None => {
                    write(&mut sink, WsMessage::Close(None), config.write_wait).await?;
                    return Ok(());
                }
            },
            _ = heartbeat.tick() => WsMessage::Ping(Vec::new()),
        };

        write(&mut sink, message, config.write_wait).await?;
    }
}

async fn write<S>(sink: &mut S, message: WsMessage, deadline: Duration) -> Result<(), LiveError>
where
    S: Sink<WsMessage, Error = axum::Error> + Unpin,
{
    timeout(deadline, sink.send(message))
        .await
        .map_err(|_| LiveError::WriteTimeout(deadline))??;

    Ok(())
}

/// Only listens for the peer going away. Any frame, pongs included, counts as a sign of life.
async fn read_loop<S>(mut stream: S, pong_wait: Duration) -> Result<(), LiveError>
where
    S: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    loop {
        match timeout(pong_wait, stream.next()).await {
            Err(_) => return Err(LiveError::ReadTimeout(pong_wait)),
            Ok(None) | Ok(Some(Ok(WsMessage::Close(_)))) => return Ok(()),
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(Some(Ok(_))) => {}
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/ws", get(live))
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use axum::extract::ws::Message as WsMessage;
    use futures_util::{sink, stream, Sink, StreamExt};
    use gala_core::{Broadcaster, Config, Message};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    use super::{read_loop, write_loop, LiveError};

    fn config(pong_wait: Duration) -> Config {
        Config {
            queue_capacity: 8,
            pong_wait,
            write_wait: Duration::from_secs(1),
        }
    }

    /// A sink that hands every frame written to it to the returned receiver
    fn recording_sink() -> (
        impl Sink<WsMessage, Error = axum::Error> + Unpin,
        UnboundedReceiver<WsMessage>,
    ) {
        let (sender, receiver) = unbounded_channel();

        let sink = sink::unfold(sender, |sender, frame: WsMessage| async move {
            let _ = sender.send(frame);
            Ok::<_, axum::Error>(sender)
        });

        (Box::pin(sink), receiver)
    }

    #[tokio::test]
    async fn deltas_are_written_then_the_socket_is_closed() {
        let config = config(Duration::from_secs(60));
        let broadcaster = Broadcaster::spawn(&config);
        let subscription = broadcaster.subscribe();
        let (sink, mut frames) = recording_sink();

        for sequence in [1, 2] {
            broadcaster.broadcast(Message {
                sequence,
                payload: Arc::from(format!("{{\"sequence\":{sequence}}}")),
            });
        }
        broadcaster.shutdown();

        write_loop(sink, subscription, &config).await.unwrap();

        assert_eq!(
            frames.recv().await,
            Some(WsMessage::Text("{\"sequence\":1}".into()))
        );
        assert_eq!(
            frames.recv().await,
            Some(WsMessage::Text("{\"sequence\":2}".into()))
        );
        assert_eq!(frames.recv().await, Some(WsMessage::Close(None)));
    }

    #[tokio::test]
    async fn idle_subscribers_are_pinged() {
        let config = config(Duration::from_millis(100));
        let broadcaster = Broadcaster::spawn(&config);
        let subscription = broadcaster.subscribe();
        let (sink, mut frames) = recording_sink();

        let writer = tokio::spawn(async move { write_loop(sink, subscription, &config).await });

        let frame = tokio::time::timeout(Duration::from_secs(2), frames.recv())
            .await
            .expect("pinged in time");
        assert_eq!(frame, Some(WsMessage::Ping(Vec::new())));

        broadcaster.shutdown();
        writer.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn silent_peers_time_out() {
        let wait = Duration::from_millis(50);
        let result = read_loop(stream::pending(), wait).await;

        assert!(matches!(result, Err(LiveError::ReadTimeout(d)) if d == wait));
    }

    #[tokio::test]
    async fn reading_ends_when_the_peer_closes() {
        let frames = stream::iter([
            Ok(WsMessage::Pong(Vec::new())),
            Ok(WsMessage::Text("ignored".into())),
            Ok(WsMessage::Close(None)),
        ])
        .chain(stream::pending());

        let result = read_loop(frames, Duration::from_secs(1)).await;

        assert!(result.is_ok());
    }
}
