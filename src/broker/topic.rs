//! Topic management
//!
//! A `Topic` holds the registrations of the subscribers bound to one topic
//! name. Callers must hold the broker's write lock when modifying it.

use crate::broker::subscriber::Registration;

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub(crate) members: Vec<Registration>,
}

impl Topic {
    /// Create a new topic with the given name and no members.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    /// Append a registration to the topic.
    pub(crate) fn subscribe(&mut self, registration: Registration) {
        self.members.push(registration);
    }

    /// Remove the registration with the given id.
    ///
    /// Uses `swap_remove`, so the order of the remaining members changes.
    /// Returns `None` when the id is not a member.
    pub(crate) fn unsubscribe(&mut self, id: &str) -> Option<Registration> {
        let index = self.members.iter().position(|m| m.id == id)?;
        Some(self.members.swap_remove(index))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn members(&self) -> impl Iterator<Item = &Registration> {
        self.members.iter()
    }

    pub(crate) fn into_members(self) -> Vec<Registration> {
        self.members
    }
}
