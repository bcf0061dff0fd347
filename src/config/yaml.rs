// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! serde model of the declarative YAML configuration file.
//!
//! # Example
//!
//! ```yaml
//! participants:
//!   - name: sensor_node
//!     domain_id: 42
//!     topics:
//!       - name: temperature
//!         type_name: SensorReading
//!         qos:
//!           reliability: BEST_EFFORT
//!           durability: VOLATILE
//!     publishers:
//!       - name: main_pub
//!         transport:
//!           type: SHARED_MEMORY
//!           buffer_size: 1048576
//!           max_message_size: 65536
//!         topic_names: [temperature]
//!     subscribers:
//!       - name: main_sub
//!         topic_names: [temperature]
//! ```
//!
//! QoS fields are parsed and stored but only `BEST_EFFORT` +
//! `VOLATILE` behavior is guaranteed.

use crate::dds::{DomainId, Error, QoS, Result};
use crate::transport::{TransportConfig, TransportKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;

/// Root of the configuration document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Participants to create, in order.
    pub participants: Vec<ParticipantConfig>,
}

/// One participant and its child entities.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    /// Participant name (required, unique within the file)
    pub name: String,
    /// Domain the participant joins
    pub domain_id: DomainId,
    /// Topics available to this participant's publishers/subscribers
    pub topics: Vec<TopicConfig>,
    /// Publishers to create
    pub publishers: Vec<PublisherConfig>,
    /// Subscribers to create
    pub subscribers: Vec<SubscriberConfig>,
}

/// A topic declaration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Topic name (the routing key)
    pub name: String,
    /// Type name carried for matching
    pub type_name: String,
    /// Parsed and stored; best-effort volatile is what runs
    pub qos: QoS,
}

/// A publisher and the topics it writes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Publisher name (unique within its participant)
    pub name: String,
    /// QoS carried by the publisher and its writers
    pub qos: QoS,
    /// Transport selection for the owning participant
    pub transport: Option<TransportSection>,
    /// Names of declared topics to create writers for
    pub topic_names: Vec<String>,
}

/// A subscriber and the topics it reads.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Subscriber name (unique within its participant)
    pub name: String,
    /// QoS carried by the subscriber and its readers
    pub qos: QoS,
    /// Transport selection for the owning participant
    pub transport: Option<TransportSection>,
    /// Names of declared topics to create readers for
    pub topic_names: Vec<String>,
}

/// Transport type names as they appear in the file.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportType {
    /// Broadcast UDP
    Udp,
    /// Shared-memory rings
    SharedMemory,
}

impl From<TransportType> for TransportKind {
    fn from(t: TransportType) -> Self {
        match t {
            TransportType::Udp => TransportKind::Udp,
            TransportType::SharedMemory => TransportKind::SharedMemory,
        }
    }
}

/// Transport selection and sizing for a participant.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TransportSection {
    /// Transport kind
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    /// Shared-memory ring data size
    #[serde(default)]
    pub buffer_size: Option<u32>,
    /// Shared-memory maximum frame size
    #[serde(default)]
    pub max_message_size: Option<u32>,
    /// UDP destination address override
    #[serde(default)]
    pub address: Option<Ipv4Addr>,
    /// UDP port override (disables per-topic derivation)
    #[serde(default)]
    pub port: Option<u16>,
}

impl TransportSection {
    /// Fold this section over the default transport sizing.
    #[must_use]
    pub fn to_transport_config(&self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            buffer_size: self.buffer_size.unwrap_or(defaults.buffer_size),
            max_message_size: self.max_message_size.unwrap_or(defaults.max_message_size),
            address: self.address,
            port: self.port,
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Structural validation: names present and unique where required.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for participant in &self.participants {
            if participant.name.is_empty() {
                return Err(Error::Config("participant without a name".to_string()));
            }
            if !names.insert(participant.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate participant name: {}",
                    participant.name
                )));
            }
            for topic in &participant.topics {
                if topic.name.is_empty() {
                    return Err(Error::Config(format!(
                        "participant '{}' declares a topic without a name",
                        participant.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dds::qos::{Durability, Reliability};

    const SAMPLE: &str = r#"
participants:
  - name: sensor_node
    domain_id: 42
    topics:
      - name: temperature
        type_name: SensorReading
        qos:
          reliability: RELIABLE
          durability: TRANSIENT_LOCAL
    publishers:
      - name: main_pub
        qos:
          reliability: BEST_EFFORT
        transport:
          type: SHARED_MEMORY
          buffer_size: 1048576
          max_message_size: 65536
        topic_names: [temperature]
    subscribers:
      - name: main_sub
        topic_names: [temperature]
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml_str(SAMPLE).expect("parse failed");
        assert_eq!(config.participants.len(), 1);

        let p = &config.participants[0];
        assert_eq!(p.name, "sensor_node");
        assert_eq!(p.domain_id, 42);
        assert_eq!(p.topics.len(), 1);
        assert_eq!(p.topics[0].type_name, "SensorReading");
        assert_eq!(p.topics[0].qos.reliability, Reliability::Reliable);
        assert_eq!(p.topics[0].qos.durability, Durability::TransientLocal);

        let publisher = &p.publishers[0];
        assert_eq!(publisher.topic_names, vec!["temperature"]);
        let transport = publisher.transport.expect("transport section");
        assert_eq!(transport.transport_type, TransportType::SharedMemory);
        assert_eq!(transport.buffer_size, Some(1_048_576));

        let subscriber = &p.subscribers[0];
        assert!(subscriber.transport.is_none());
        assert_eq!(subscriber.qos, QoS::default());
    }

    #[test]
    fn test_transport_section_folds_defaults() {
        let section = TransportSection {
            transport_type: TransportType::SharedMemory,
            buffer_size: Some(4096),
            max_message_size: None,
            address: None,
            port: None,
        };
        let config = section.to_transport_config();
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.max_message_size, TransportConfig::default().max_message_size);
    }

    #[test]
    fn test_udp_transport_with_address_and_port() {
        let yaml = r#"
participants:
  - name: p
    domain_id: 1
    publishers:
      - name: pub
        transport:
          type: UDP
          address: 127.0.0.1
          port: 45000
"#;
        let config = Config::from_yaml_str(yaml).expect("parse failed");
        let transport = config.participants[0].publishers[0]
            .transport
            .expect("transport");
        assert_eq!(transport.transport_type, TransportType::Udp);
        assert_eq!(transport.address, Some(Ipv4Addr::new(127, 0, 0, 1)));
        assert_eq!(transport.port, Some(45000));
    }

    #[test]
    fn test_validate_rejects_nameless_participant() {
        let yaml = "participants:\n  - domain_id: 1\n";
        assert!(matches!(
            Config::from_yaml_str(yaml),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let yaml = r#"
participants:
  - name: p
    domain_id: 1
  - name: p
    domain_id: 2
"#;
        assert!(matches!(Config::from_yaml_str(yaml), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        assert!(matches!(
            Config::from_yaml_str("participants: ["),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let config = Config::from_yaml_str("{}").expect("parse failed");
        assert!(config.participants.is_empty());
    }
}
