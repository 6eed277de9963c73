use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::person::{ChildRef, PersonId};
use crate::period::Period;

/// A partnership between two adults as stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partnership {
    pub id: Uuid,
    pub first: PersonId,
    pub second: PersonId,
    pub period: Period,
    #[serde(default)]
    pub conflict: bool,
}

impl Partnership {
    /// The partnership seen from `person`, if they are part of it.
    pub fn partner_of(&self, person: PersonId) -> Option<Partner> {
        let other = if self.first == person {
            self.second
        } else if self.second == person {
            self.first
        } else {
            return None;
        };
        Some(Partner {
            partnership_id: self.id,
            person: other,
            period: self.period,
            conflict: self.conflict,
        })
    }
}

/// One side of a partnership, from the point of view of the other adult.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub partnership_id: Uuid,
    pub person: PersonId,
    pub period: Period,
    pub conflict: bool,
}

/// A head of child relation. The head of child is the adult the child lives with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parentship {
    pub id: Uuid,
    pub head_of_child: PersonId,
    pub child: ChildRef,
    pub period: Period,
    #[serde(default)]
    pub conflict: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FridgeFamily {
    pub head_of_family: PersonId,
    pub partner: Option<PersonId>,
    pub children: Vec<ChildRef>,
    pub period: Period,
}

impl FridgeFamily {
    pub fn size(&self) -> usize {
        1 + usize::from(self.partner.is_some()) + self.children.len()
    }

    pub fn adults(&self) -> Vec<PersonId> {
        std::iter::once(self.head_of_family).chain(self.partner).collect()
    }
}
