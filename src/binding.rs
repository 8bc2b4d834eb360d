//! Name binding.
//!
//! Items do not know which member of a namespace they were declared under.
//! On first use the namespace scans its member table for the item's identity
//! and hands the member name to the item. Names are assigned once: the same
//! name again is a no-op, a different one is a [`ConfigError::NameConflict`].

use crate::error::{ConfigError, Result};
use crate::item::ItemId;
use crate::namespace::Member;

/// Assign `name` to `slot` unless it already holds a different name.
pub fn assign_once(slot: &mut Option<String>, name: &str) -> Result<()> {
    match slot {
        Some(current) if current != name => Err(ConfigError::NameConflict {
            current: current.clone(),
            requested: name.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            *slot = Some(name.to_string());
            Ok(())
        }
    }
}

/// Find the member name holding the item with identity `id`.
pub fn locate<'a, I>(namespace: &str, members: I, id: ItemId) -> Result<String>
where
    I: IntoIterator<Item = (&'a String, &'a Member)>,
{
    members
        .into_iter()
        .find_map(|(name, member)| match member {
            Member::Item(item) if item.id() == id => Some(name.clone()),
            _ => None,
        })
        .ok_or_else(|| ConfigError::BindingNotFound {
            namespace: namespace.to_string(),
        })
}
