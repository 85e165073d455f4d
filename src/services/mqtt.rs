//! MQTT distribution channel.
//!
//! Every artifact is published with QoS 1 and the retain flag, so the broker
//! keeps the latest value for subscribers that join later.

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::MqttConfig;
use crate::errors::AppError;

/// Capacity of the request channel between `AsyncClient` and the event loop.
const MQTT_REQUEST_CAPACITY: usize = 32;

const MQTT_KEEP_ALIVE_SECS: u64 = 30;

/// Pause before polling again after a connection error (rumqttc reconnects
/// on the next poll).
const MQTT_RECONNECT_DELAY_SECS: u64 = 5;

/// Somewhere artifacts can be published to with last-value retention.
pub trait ArtifactSink: Clone + Send + Sync + 'static {
    fn publish_retained(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// `ArtifactSink` backed by a rumqttc client.
///
/// Publishing never waits on the request queue: while the broker is down, or
/// once the queue is full, a publish fails at once so the cycle can be logged
/// and skipped instead of queueing stale artifacts for the next reconnect.
#[derive(Clone)]
pub struct MqttSink {
    client: AsyncClient,
    connected: watch::Receiver<bool>,
}

impl ArtifactSink for MqttSink {
    async fn publish_retained(&self, topic: &str, payload: Vec<u8>) -> Result<(), AppError> {
        if !*self.connected.borrow() {
            return Err(AppError::Publish(format!(
                "broker not connected, dropped {}",
                topic
            )));
        }
        self.client
            .try_publish(topic, QoS::AtLeastOnce, true, payload)?;
        Ok(())
    }
}

/// Create the client and its event loop. Nothing touches the network until
/// the event loop is polled by [`drive_event_loop`], which reports on the
/// sender side of `connected`.
pub fn connect(config: &MqttConfig, connected: watch::Receiver<bool>) -> (MqttSink, EventLoop) {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(MQTT_KEEP_ALIVE_SECS));
    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        options.set_credentials(user, pass);
    }

    let (client, eventloop) = AsyncClient::new(options, MQTT_REQUEST_CAPACITY);
    (MqttSink { client, connected }, eventloop)
}

/// Poll the event loop forever, reporting connection state on `connected`.
///
/// Should be spawned via `tokio::spawn(drive_event_loop(...))`.
pub async fn drive_event_loop(mut eventloop: EventLoop, connected: watch::Sender<bool>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                tracing::info!("Connected to MQTT broker ({:?})", ack.code);
                connected.send_replace(true);
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                tracing::trace!("MQTT publish {} acknowledged", ack.pkid);
            }
            Ok(_) => {}
            Err(e) => {
                if connected.send_replace(false) {
                    tracing::error!("MQTT connection lost: {}", e);
                } else {
                    tracing::warn!("MQTT connection error: {}", e);
                }
                tokio::time::sleep(Duration::from_secs(MQTT_RECONNECT_DELAY_SECS)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_broker() -> MqttConfig {
        MqttConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: None,
            password: None,
            client_id: "bus-walk-test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_while_disconnected_fails_fast() {
        let (_connected_tx, connected_rx) = watch::channel(false);
        let (sink, _eventloop) = connect(&unreachable_broker(), connected_rx);

        let err = sink
            .publish_retained("t/walk", b"{}".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Publish(_)));
    }

    #[tokio::test]
    async fn test_full_request_queue_fails_instead_of_blocking() {
        // Connected flag up, but nobody drains the event loop
        let (_connected_tx, connected_rx) = watch::channel(true);
        let (sink, _eventloop) = connect(&unreachable_broker(), connected_rx);

        let outcome = tokio::time::timeout(Duration::from_secs(2), async {
            for _ in 0..=MQTT_REQUEST_CAPACITY {
                sink.publish_retained("t/walk", b"{}".to_vec()).await?;
            }
            Ok::<(), AppError>(())
        })
        .await
        .expect("publish blocked on a full request queue");

        assert!(matches!(outcome, Err(AppError::Publish(_))));
    }
}
