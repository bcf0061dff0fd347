// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDS Topic
//!
//! A [`Topic`] is a named, typed channel scoped to one participant. The
//! name alone is the routing key on the transport; the type name is an
//! opaque string carried so that readers and writers on the same topic
//! can agree on what the payload bytes mean.

use super::Participant;
use std::sync::{Arc, Weak};

/// A named data channel within a participant.
///
/// Created through [`Participant::create_topic`], which guarantees that
/// one participant never holds two topics with the same name but
/// different type names.
pub struct Topic {
    name: String,
    type_name: String,
    /// Non-owning backref; the participant owns its topics, not the
    /// other way around.
    participant: Weak<Participant>,
}

impl Topic {
    pub(crate) fn new(name: &str, type_name: &str, participant: Weak<Participant>) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            participant,
        }
    }

    /// Topic name (the transport routing key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type name carried for endpoint matching.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The owning participant, if it still exists.
    #[must_use]
    pub fn participant(&self) -> Option<Arc<Participant>> {
        self.participant.upgrade()
    }
}
