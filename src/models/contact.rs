use serde::{Deserialize, Serialize};

pub const RELATIONSHIP_OPTIONS: [&str; 5] = ["Mãe", "Pai", "Irmão", "Amigo", "Outro"];
pub const CUSTOM_RELATIONSHIP: &str = "Outro";

/// Picking "Outro" means the courier typed the relationship themselves.
pub fn resolve_relationship(selected: &str, custom: &str) -> String {
    if selected == CUSTOM_RELATIONSHIP {
        custom.trim().to_string()
    } else {
        selected.trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

/// Ordered contact list. `revision` increases on every mutation and is the
/// token clients present to prove they edited the latest list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactList {
    pub revision: u64,
    pub entries: Vec<EmergencyContact>,
}

impl ContactList {
    pub fn push(&mut self, contact: EmergencyContact) {
        self.entries.push(contact);
        self.revision += 1;
    }

    pub fn replace(&mut self, index: usize, contact: EmergencyContact) -> Option<EmergencyContact> {
        let slot = self.entries.get_mut(index)?;
        let previous = std::mem::replace(slot, contact);
        self.revision += 1;
        Some(previous)
    }

    pub fn remove(&mut self, index: usize) -> Option<EmergencyContact> {
        if index >= self.entries.len() {
            return None;
        }

        let removed = self.entries.remove(index);
        self.revision += 1;
        Some(removed)
    }
}
