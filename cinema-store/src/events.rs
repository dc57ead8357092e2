use async_trait::async_trait;
use cinema_core::events::{booking_event_key, BookingConfirmedEvent, BookingEventPublisher, PublishError};
use cinema_core::Booking;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{info, error};

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
}

impl EventProducer {
    pub fn new(brokers: &str, topic: &str, send_timeout: Duration) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", send_timeout.as_millis().to_string())
            .set("acks", "1")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
            send_timeout,
        })
    }

    pub async fn publish(&self, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(&self.topic)
            .key(key)
            .payload(payload);

        match self.producer.send(record, Timeout::After(self.send_timeout)).await {
            Ok(delivery) => {
                let partition = delivery.partition;
                let offset = delivery.offset;
                info!("Sent message to {}/{}: partition {} offset {}", self.topic, key, partition, offset);
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", self.topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl BookingEventPublisher for EventProducer {
    async fn publish_booking_confirmed(&self, booking: &Booking) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&BookingConfirmedEvent::from_booking(booking))?;
        self.publish(&booking_event_key(booking.id), &payload)
            .await
            .map_err(|e| PublishError::Delivery(e.to_string()))
    }
}
