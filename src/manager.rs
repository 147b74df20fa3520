use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::config::{AppConfig, Role};
use crate::console::{ConsoleDisplay, ConsoleHaptics, ConsoleLed, StdinButton};
use crate::door::DoorNode;
use crate::hal::{Clock, Color, Display as _, Input, Link, MonotonicClock, Timestamp};
use crate::messages::Token;
use crate::mqtt::MqttClient;
use crate::node::{self, StateMachine};
use crate::office::OfficeNode;

pub struct Manager {
    config: AppConfig,
    role: Role,
}

impl Manager {
    pub fn new(config: AppConfig, role: Role) -> Self {
        Manager { config, role }
    }

    pub async fn run_loop(self) -> anyhow::Result<()> {
        let (mqtt_client, mut eventloop) = MqttClient::new(&self.config.mqtt, self.role);
        let (tx, rx) = broadcast::channel(16);

        let link = mqtt_client.clone();
        tokio::task::spawn(async move {
            link.event_loop(&mut eventloop, tx).await;
        });

        let mut display = ConsoleDisplay;
        display.render(Color::Black, Color::White, "CONNECTING");
        info!("Waiting for broker {}", self.config.mqtt.host);
        mqtt_client.wait_connected().await;

        let timing = self.config.timing();
        let machine: Box<dyn StateMachine + Send> = match self.role {
            Role::Office => Box::new(OfficeNode::new(display, ConsoleHaptics, timing)),
            Role::Door => Box::new(DoorNode::new(display, ConsoleHaptics, ConsoleLed, timing)),
        };
        info!("Running as {} node, press Enter to push the button", self.role);

        let mut node_loop = NodeLoop::new(
            machine,
            StdinButton::spawn(),
            rx,
            mqtt_client.clone(),
            Duration::from_millis(self.config.tick_ms()),
        );

        // The node loop may block briefly on tones, so it gets its own thread.
        tokio::task::spawn_blocking(move || node_loop.run())
            .await
            .context("node loop panicked")?;

        info!("Exiting node loop");
        mqtt_client.disconnect().await?;

        Ok(())
    }
}

/// The cooperative loop of one node. Single thread of control: nothing else
/// touches the state machine.
pub struct NodeLoop<M: ?Sized, I, L> {
    machine: Box<M>,
    input: I,
    inbox: broadcast::Receiver<Token>,
    link: L,
    clock: MonotonicClock,
    tick: Duration,
}

impl<M, I, L> NodeLoop<M, I, L>
where
    M: StateMachine + ?Sized,
    I: Input,
    L: Link,
{
    pub fn new(
        machine: Box<M>,
        input: I,
        inbox: broadcast::Receiver<Token>,
        link: L,
        tick: Duration,
    ) -> Self {
        NodeLoop {
            machine,
            input,
            inbox,
            link,
            clock: MonotonicClock::new(),
            tick,
        }
    }

    pub fn run(&mut self) {
        while !self.input.is_closed() {
            let now = self.clock.now();
            self.iterate(now);
            thread::sleep(self.tick);
        }
    }

    pub fn iterate(&mut self, now: Timestamp) {
        let pressed = self.input.was_pressed();
        let inbound = self.drain_inbox();
        if let Some(token) = node::step(&mut *self.machine, now, pressed, inbound) {
            if !self.link.is_connected() {
                warn!("Broker offline, dropping {}", token);
            } else if let Err(err) = self.link.publish(token) {
                error!("Error publishing {}: {:?}", token, err);
            }
        }
    }

    fn drain_inbox(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(token) => tokens.push(token),
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Inbox lagged, skipped {} messages", skipped);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    debug!("Inbox closed");
                    break;
                }
            }
        }
        tokens
    }
}
