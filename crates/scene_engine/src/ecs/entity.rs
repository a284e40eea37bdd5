//! Entity implementation
//!
//! Entities are generational keys into the world's slot map. A handle to a
//! destroyed entity never aliases a newer one.

use slotmap::Key;

slotmap::new_key_type! {
    /// Entity identifier
    pub struct Entity;
}

impl Entity {
    /// Stable numeric identifier (index and generation packed together)
    pub fn id(&self) -> u64 {
        self.data().as_ffi()
    }
}
