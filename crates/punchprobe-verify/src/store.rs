use std::collections::HashMap;

use punchprobe_frame::Punch;

/// Transmitted punches of one test level.
///
/// Indexed both by generation order and by the serial id embedded in each
/// punch. Built once, then only read.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    punches: Vec<Punch>,
    by_serial: HashMap<u32, usize>,
}

impl ReferenceStore {
    /// Build a store from punches in generation order.
    ///
    /// If two punches share a serial id, the first one owns the key.
    pub fn new(punches: Vec<Punch>) -> Self {
        let mut by_serial = HashMap::with_capacity(punches.len());
        for (index, punch) in punches.iter().enumerate() {
            if let Some(serial) = punch.serial() {
                by_serial.entry(serial).or_insert(index);
            }
        }
        Self { punches, by_serial }
    }

    pub fn len(&self) -> usize {
        self.punches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.punches.is_empty()
    }

    /// Punch at generation position `index`.
    pub fn get(&self, index: usize) -> Option<&Punch> {
        self.punches.get(index)
    }

    /// Punch carrying serial id `serial`.
    pub fn by_serial(&self, serial: u32) -> Option<&Punch> {
        self.by_serial.get(&serial).map(|&index| &self.punches[index])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Punch> {
        self.punches.iter()
    }

    pub fn as_slice(&self) -> &[Punch] {
        &self.punches
    }

    /// Total wire size of all punches.
    pub fn wire_size(&self) -> usize {
        self.punches.iter().map(Punch::wire_size).sum()
    }
}

impl FromIterator<Punch> for ReferenceStore {
    fn from_iter<I: IntoIterator<Item = Punch>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ReferenceStore {
    type Item = &'a Punch;
    type IntoIter = std::slice::Iter<'a, Punch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
