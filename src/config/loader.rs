// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builds a full entity graph from a declarative [`Config`].
//!
//! The loader drives exactly the public entity operations - create
//! participant, select transport, create topics, publishers,
//! subscribers, writers, readers - honoring the contract that the
//! transport kind is selected before any child of a participant exists.
//!
//! Created entities are retrievable by name: participants by their own
//! name, everything else by `participant:entity`.

use super::yaml::{Config, ParticipantConfig, TransportSection};
use crate::dds::{Error, Participant, Publisher, Result, Subscriber, Topic};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Entity graph constructed from a configuration file.
///
/// Holding the loader keeps every created participant (and therefore
/// every transport) alive; dropping it releases them all.
pub struct ConfigLoader {
    participants: HashMap<String, Arc<Participant>>,
    publishers: HashMap<String, Arc<Publisher>>,
    subscribers: HashMap<String, Arc<Subscriber>>,
    topics: HashMap<String, Arc<Topic>>,
}

impl ConfigLoader {
    /// Load a YAML file and build its entity graph.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(Config::from_file(path)?)
    }

    /// Parse a YAML string and build its entity graph.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::build(Config::from_yaml_str(yaml)?)
    }

    /// Build the entity graph for an already-parsed configuration.
    pub fn build(config: Config) -> Result<Self> {
        let mut loader = Self {
            participants: HashMap::new(),
            publishers: HashMap::new(),
            subscribers: HashMap::new(),
            topics: HashMap::new(),
        };
        for participant_config in &config.participants {
            loader.build_participant(participant_config)?;
        }
        Ok(loader)
    }

    fn build_participant(&mut self, config: &ParticipantConfig) -> Result<()> {
        let participant = Participant::create(config.domain_id, &config.name);

        // Transport selection must happen before the first child exists.
        if let Some(section) = unified_transport_section(config)? {
            participant.set_transport_kind(section.transport_type.into())?;
            participant.set_transport_config(section.to_transport_config())?;
        }

        for topic_config in &config.topics {
            let topic = participant.create_topic(&topic_config.name, &topic_config.type_name)?;
            self.topics.insert(
                format!("{}:{}", config.name, topic_config.name),
                topic,
            );
        }

        for publisher_config in &config.publishers {
            let publisher = participant.create_publisher_with_qos(publisher_config.qos);
            for topic_name in &publisher_config.topic_names {
                let topic = participant.lookup_topic(topic_name).ok_or_else(|| {
                    Error::Config(format!(
                        "publisher '{}' references undeclared topic '{}'",
                        publisher_config.name, topic_name
                    ))
                })?;
                publisher.create_writer(&topic)?;
            }
            self.publishers.insert(
                format!("{}:{}", config.name, publisher_config.name),
                publisher,
            );
        }

        for subscriber_config in &config.subscribers {
            let subscriber = participant.create_subscriber_with_qos(subscriber_config.qos);
            for topic_name in &subscriber_config.topic_names {
                let topic = participant.lookup_topic(topic_name).ok_or_else(|| {
                    Error::Config(format!(
                        "subscriber '{}' references undeclared topic '{}'",
                        subscriber_config.name, topic_name
                    ))
                })?;
                subscriber.create_reader(&topic)?;
            }
            self.subscribers.insert(
                format!("{}:{}", config.name, subscriber_config.name),
                subscriber,
            );
        }

        log::debug!(
            "[Config] built participant '{}' (domain {}, {} topics, {} publishers, {} subscribers)",
            config.name,
            config.domain_id,
            config.topics.len(),
            config.publishers.len(),
            config.subscribers.len()
        );
        self.participants.insert(config.name.clone(), participant);
        Ok(())
    }

    /// All created participants.
    #[must_use]
    pub fn participants(&self) -> Vec<Arc<Participant>> {
        self.participants.values().cloned().collect()
    }

    /// Participant by name.
    #[must_use]
    pub fn participant(&self, name: &str) -> Option<Arc<Participant>> {
        self.participants.get(name).cloned()
    }

    /// Publisher by `(participant, publisher)` name pair.
    #[must_use]
    pub fn publisher(&self, participant: &str, publisher: &str) -> Option<Arc<Publisher>> {
        self.publishers.get(&format!("{participant}:{publisher}")).cloned()
    }

    /// Subscriber by `(participant, subscriber)` name pair.
    #[must_use]
    pub fn subscriber(&self, participant: &str, subscriber: &str) -> Option<Arc<Subscriber>> {
        self.subscribers
            .get(&format!("{participant}:{subscriber}"))
            .cloned()
    }

    /// Topic by `(participant, topic)` name pair.
    #[must_use]
    pub fn topic(&self, participant: &str, topic: &str) -> Option<Arc<Topic>> {
        self.topics.get(&format!("{participant}:{topic}")).cloned()
    }
}

/// Collapse the per-publisher/per-subscriber transport sections of one
/// participant into a single selection.
///
/// The entity graph fixes one transport kind per participant, so
/// sections naming different kinds are a configuration error; the first
/// section's sizing wins otherwise.
fn unified_transport_section(config: &ParticipantConfig) -> Result<Option<TransportSection>> {
    let mut chosen: Option<TransportSection> = None;
    let sections = config
        .publishers
        .iter()
        .filter_map(|p| p.transport.as_ref())
        .chain(config.subscribers.iter().filter_map(|s| s.transport.as_ref()));

    for section in sections {
        match chosen {
            None => chosen = Some(*section),
            Some(existing) if existing.transport_type == section.transport_type => {}
            Some(existing) => {
                return Err(Error::Config(format!(
                    "participant '{}' mixes transport types {:?} and {:?}",
                    config.name, existing.transport_type, section.transport_type
                )));
            }
        }
    }
    Ok(chosen)
}
