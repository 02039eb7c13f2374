//! MQTT Message Source
//!
//! Subscribes to the sensor topic and passes every publish to the inbound
//! adapter. rumqttc reconnects on the next `poll` after a connection error;
//! the subscription is re-issued on every ConnAck because sessions are clean.

use rumqttc::{
    AsyncClient, ClientError, ConnectionError, Event, MqttOptions, Packet, QoS,
    SubscribeReasonCode,
};
use std::time::Duration;

use super::adapter::InboundAdapter;
use crate::config::MqttConfig;
use crate::util::{random_string, UPPERCASE};

/// MQTT subscription feeding the bridge
pub struct MqttSource {
    options: MqttOptions,
    topic: String,
    reconnect_delay: Duration,
    channel_capacity: usize,
}

impl MqttSource {
    /// Build a source from configuration, generating a random client ID
    pub fn new(config: &MqttConfig) -> Self {
        let client_id = format!(
            "{}{}",
            config.client_id_prefix,
            random_string(config.client_id_suffix_len, UPPERCASE)
        );

        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options
            .set_keep_alive(Duration::from_secs(config.keep_alive_secs))
            .set_clean_session(true);

        Self {
            options,
            topic: config.topic.clone(),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            channel_capacity: config.channel_capacity.max(1),
        }
    }

    pub fn client_id(&self) -> String {
        self.options.client_id()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Drive the MQTT event loop forever
    pub async fn run(self, adapter: InboundAdapter) {
        let (host, port) = self.options.broker_address();
        tracing::info!(
            broker = %format!("{}:{}", host, port),
            client_id = %self.options.client_id(),
            topic = %self.topic,
            "Connecting to MQTT broker"
        );

        let (client, mut eventloop) = AsyncClient::new(self.options, self.channel_capacity);

        loop {
            let event = eventloop.poll().await;
            if handle_event(&self.topic, &client, &adapter, event) == Step::Backoff {
                tracing::debug!(
                    retry_in_ms = self.reconnect_delay.as_millis() as u64,
                    "Waiting before reconnect"
                );
                tokio::time::sleep(self.reconnect_delay).await;
            }
        }
    }
}

/// Request side of the MQTT client used by the event loop
pub(crate) trait Subscriber {
    fn subscribe_to(&self, topic: &str) -> Result<(), ClientError>;
}

impl Subscriber for AsyncClient {
    fn subscribe_to(&self, topic: &str) -> Result<(), ClientError> {
        self.try_subscribe(topic, QoS::AtMostOnce)
    }
}

/// What the event loop does after one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Continue,
    Backoff,
}

/// React to one result of `EventLoop::poll`
pub(crate) fn handle_event<S: Subscriber>(
    topic: &str,
    subscriber: &S,
    adapter: &InboundAdapter,
    event: Result<Event, ConnectionError>,
) -> Step {
    match event {
        Ok(Event::Incoming(Packet::ConnAck(_))) => {
            tracing::info!(topic = %topic, "Connected to MQTT broker, subscribing");
            if let Err(e) = subscriber.subscribe_to(topic) {
                tracing::error!(topic = %topic, error = %e, "Failed to subscribe");
            }
            Step::Continue
        }
        Ok(Event::Incoming(Packet::SubAck(ack))) => {
            if ack
                .return_codes
                .iter()
                .any(|code| matches!(code, SubscribeReasonCode::Failure))
            {
                tracing::error!(topic = %topic, "Subscription rejected by broker");
            } else {
                tracing::info!(topic = %topic, "Subscribed");
            }
            Step::Continue
        }
        Ok(Event::Incoming(Packet::Publish(publish))) => {
            adapter.handle_payload(&publish.payload);
            Step::Continue
        }
        Ok(_) => Step::Continue,
        Err(e) => {
            tracing::warn!(error = %e, "MQTT connection error");
            Step::Backoff
        }
    }
}
