use std::sync::Arc;
use std::time::Duration;

use anyhow::ensure;
use log::{debug, error, info, warn};
use rumqttc::{MqttOptions, QoS};
use tokio::sync::{broadcast, watch};

use crate::config::{self, Role};
use crate::hal::Link;
use crate::messages::{self, Token};

#[derive(Debug, Clone)]
pub struct MqttClient {
    client: rumqttc::AsyncClient,
    topic: String,
    reconnect_delay: Duration,
    connected: Arc<watch::Sender<bool>>,
}

impl MqttClient {
    pub fn new(config: &config::MqttConfig, role: Role) -> (Self, rumqttc::EventLoop) {
        let publisher_id = config
            .publisher_id
            .clone()
            .unwrap_or_else(|| default_publisher_id(role, rand::random()));

        let mut mqttoptions = MqttOptions::new(
            publisher_id,
            config.host.clone(),
            config.port.unwrap_or(1883),
        );

        mqttoptions.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.unwrap_or(5)));

        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            mqttoptions.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = rumqttc::AsyncClient::new(mqttoptions, 10);
        let (connected, _) = watch::channel(false);

        (
            MqttClient {
                client,
                topic: config.topic().to_string(),
                reconnect_delay: Duration::from_secs(config.reconnect_delay_seconds.unwrap_or(5)),
                connected: Arc::new(connected),
            },
            eventloop,
        )
    }

    /// Queues the topic subscription without waiting for room in the request
    /// channel. Fails when the channel is full.
    fn try_subscribe(&self) -> Result<(), rumqttc::ClientError> {
        self.client.try_subscribe(self.topic.as_str(), QoS::AtMostOnce)
    }

    /// Drives the connection forever, forwarding recognised tokens to `tx`.
    /// Broker failures are retried after a fixed delay.
    pub async fn event_loop(&self, eventloop: &mut rumqttc::EventLoop, tx: broadcast::Sender<Token>) {
        // Only `poll` drains the request channel, so the subscription must never
        // wait on it here. A full channel defers it to the next poll.
        let mut subscribe_pending = false;
        loop {
            match eventloop.poll().await {
                Ok(notification) => match notification {
                    rumqttc::Event::Incoming(rumqttc::Packet::Publish(p)) => {
                        debug!("Received MQTT message on topic {}: {:?}", p.topic, p.payload);

                        match messages::decode(&p.topic, &p.payload, &self.topic) {
                            Some(token) => {
                                if let Err(err) = tx.send(token) {
                                    error!("Error forwarding {}: {:?}", token, err);
                                }
                            }
                            None => debug!("Dropping unrecognised message"),
                        }
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::SubAck(_)) => {
                        debug!("Subscription acknowledged");
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
                        info!("Connected to broker");
                        self.connected.send_replace(true);
                        subscribe_pending = true;
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::Disconnect) => {
                        warn!("Broker closed the connection");
                        self.connected.send_replace(false);
                    }
                    _ => {}
                },
                Err(e) => {
                    self.connected.send_replace(false);
                    error!(
                        "Error polling MQTT event loop: {:?}, retrying in {:?}",
                        e, self.reconnect_delay
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                    continue;
                }
            }

            if subscribe_pending {
                match self.try_subscribe() {
                    Ok(()) => subscribe_pending = false,
                    Err(err) => debug!("Subscription to {} deferred: {:?}", self.topic, err),
                }
            }
        }
    }

    /// Resolves once the first connection has been acknowledged.
    pub async fn wait_connected(&self) {
        let mut rx = self.connected.subscribe();
        // The sender lives in `self`, so this only fails if it was dropped.
        let _ = rx.wait_for(|connected| *connected).await;
    }

    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        debug!("Disconnecting MQTT client");
        self.client.disconnect().await
    }
}

impl Link for MqttClient {
    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    fn publish(&self, token: Token) -> anyhow::Result<()> {
        // Nothing is queued while offline; a backlog would crowd out the
        // subscription on reconnect.
        ensure!(self.is_connected(), "broker offline, {} not sent", token);
        info!("Publishing {} on {}", token, self.topic);
        self.client
            .try_publish(self.topic.as_str(), QoS::AtMostOnce, false, token.encode())?;
        Ok(())
    }
}

fn default_publisher_id(role: Role, suffix: u16) -> String {
    format!("busylight-{}-{:04x}", role, suffix)
}
