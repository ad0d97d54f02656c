//! Detector channel names and the interning registry
//!
//! Channel names follow `IFO:SYSTEM-SUBSYSTEM_SIGNAL.trend,type`, e.g.
//! `L1:PSL-ISS_PDB_OUT_DQ` or `LVE-EX:X3_810BTORR.mean,m-trend`.

use super::units::Unit;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

/// Parsed channel descriptor
///
/// Equality, ordering and hashing use the canonical name
/// (`name` plus `,type` when a type is present).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    name: String,
    ifo: Option<String>,
    system: Option<String>,
    subsystem: Option<String>,
    signal: Option<String>,
    trend: Option<String>,
    channel_type: Option<String>,
    sample_rate: Option<f64>,
    unit: Option<Unit>,
}

fn is_ifo(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_uppercase() && bytes[1].is_ascii_digit()
}

impl Channel {
    /// Parse a channel name; unparseable components are left empty
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        let (body, channel_type) = match name.rsplit_once(',') {
            Some((body, ctype)) if !ctype.trim().is_empty() => {
                (body.trim(), Some(ctype.trim().to_string()))
            }
            Some((body, _)) => (body.trim(), None),
            None => (name, None),
        };

        let (ifo, rest) = match body.split_once(':') {
            Some((prefix, rest)) if is_ifo(prefix) => (Some(prefix.to_string()), rest),
            Some((_, rest)) => (None, rest),
            None => (None, body),
        };

        let (rest, trend) = match rest.rsplit_once('.') {
            Some((head, suffix))
                if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_lowercase()) =>
            {
                (head, Some(suffix.to_string()))
            }
            _ => (rest, None),
        };

        let (system, remainder) = match rest.split_once(['-', '_']) {
            Some((system, remainder)) => (Some(system.to_string()), Some(remainder)),
            None if !rest.is_empty() => (Some(rest.to_string()), None),
            None => (None, None),
        };
        let (subsystem, signal) = match remainder {
            Some(remainder) => match remainder.split_once(['-', '_']) {
                Some((sub, sig)) => (Some(sub.to_string()), Some(sig.to_string())),
                None => (Some(remainder.to_string()), None),
            },
            None => (None, None),
        };

        Self {
            name: body.to_string(),
            ifo,
            system,
            subsystem,
            signal,
            trend,
            channel_type,
            sample_rate: None,
            unit: None,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Name without the `,type` suffix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ifo(&self) -> Option<&str> {
        self.ifo.as_deref()
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    pub fn subsystem(&self) -> Option<&str> {
        self.subsystem.as_deref()
    }

    pub fn signal(&self) -> Option<&str> {
        self.signal.as_deref()
    }

    pub fn trend(&self) -> Option<&str> {
        self.trend.as_deref()
    }

    pub fn channel_type(&self) -> Option<&str> {
        self.channel_type.as_deref()
    }

    pub fn sample_rate(&self) -> Option<f64> {
        self.sample_rate
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    /// `name,type` when the type is known, otherwise `name`
    pub fn canonical(&self) -> String {
        match &self.channel_type {
            Some(ctype) => format!("{},{}", self.name, ctype),
            None => self.name.clone(),
        }
    }

    /// LaTeX-safe rendering of the name
    pub fn texname(&self) -> String {
        self.name.replace('_', r"\_")
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Channel {}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl PartialOrd for Channel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Channel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

/// Handle to a channel interned in a [`ChannelRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(u32);

impl ChannelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    channels: Vec<Arc<Channel>>,
    index: HashMap<String, ChannelId>,
}

/// Side table of channel metadata shared between series
///
/// Series hold a small [`ChannelId`]; interning the same canonical name
/// twice yields the same id.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    inner: RwLock<RegistryInner>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a channel, keeping the first-seen metadata for a name
    pub fn intern(&self, channel: Channel) -> ChannelId {
        let key = channel.canonical();
        if let Some(id) = self.lookup(&key) {
            return id;
        }
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = inner.index.get(&key) {
            return *id;
        }
        let id = ChannelId(inner.channels.len() as u32);
        inner.channels.push(Arc::new(channel));
        inner.index.insert(key, id);
        log::debug!("interned channel {} as {:?}", inner.channels[id.index()], id);
        id
    }

    /// Parse and intern a channel name
    pub fn intern_name(&self, name: &str) -> ChannelId {
        self.intern(Channel::new(name))
    }

    pub fn get(&self, id: ChannelId) -> Option<Arc<Channel>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.channels.get(id.index()).cloned()
    }

    /// Find an interned channel by canonical name
    pub fn lookup(&self, canonical: &str) -> Option<ChannelId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.index.get(canonical).copied()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .channels
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_name() {
        let channel = Channel::new("L1:PSL-ISS_PDB_OUT_DQ");
        assert_eq!(channel.ifo(), Some("L1"));
        assert_eq!(channel.system(), Some("PSL"));
        assert_eq!(channel.subsystem(), Some("ISS"));
        assert_eq!(channel.signal(), Some("PDB_OUT_DQ"));
        assert_eq!(channel.trend(), None);
        assert_eq!(channel.channel_type(), None);
        assert_eq!(channel.texname(), r"L1:PSL-ISS\_PDB\_OUT\_DQ");
    }

    #[test]
    fn test_parse_trend_with_type() {
        let channel = Channel::new("LVE-EX:X3_810BTORR.mean,m-trend");
        assert_eq!(channel.ifo(), None);
        assert_eq!(channel.system(), Some("X3"));
        assert_eq!(channel.subsystem(), Some("810BTORR"));
        assert_eq!(channel.signal(), None);
        assert_eq!(channel.trend(), Some("mean"));
        assert_eq!(channel.channel_type(), Some("m-trend"));
        assert_eq!(channel.name(), "LVE-EX:X3_810BTORR.mean");
        assert_eq!(channel.canonical(), "LVE-EX:X3_810BTORR.mean,m-trend");
    }

    #[test]
    fn test_equality_uses_canonical_name() {
        let a = Channel::new("H1:GDS-CALIB_STRAIN").with_sample_rate(16384.0);
        let b = Channel::new("H1:GDS-CALIB_STRAIN");
        let c = Channel::new("H1:GDS-CALIB_STRAIN,online");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(b < c);
    }

    #[test]
    fn test_registry_interning() {
        let registry = ChannelRegistry::new();
        let a = registry.intern_name("X1:TEST-CHANNEL");
        let b = registry.intern(Channel::new("X1:TEST-CHANNEL").with_sample_rate(1.0));
        let c = registry.intern_name("X1:OTHER-CHANNEL");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(a).map(|ch| ch.name().to_string()).as_deref(), Some("X1:TEST-CHANNEL"));
        assert_eq!(registry.get(a).and_then(|ch| ch.sample_rate()), None);
        assert_eq!(registry.lookup("X1:OTHER-CHANNEL"), Some(c));
    }
}
