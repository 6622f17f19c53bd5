//! CIDR-style client access list.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllowError {
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
    #[error("invalid prefix length '{0}' (expected 0..=32)")]
    InvalidPrefix(String),
}

/// One `ip[/prefix]` rule. Address and mask are kept in host byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowEntry {
    text: String,
    address: u32,
    mask: u32,
    prefix_len: u8,
}

impl AllowEntry {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, AllowError> {
        if prefix_len > 32 {
            return Err(AllowError::InvalidPrefix(prefix_len.to_string()));
        }
        let text = if prefix_len == 32 {
            address.to_string()
        } else {
            format!("{address}/{prefix_len}")
        };
        Ok(Self {
            text,
            address: u32::from(address),
            mask: prefix_mask(prefix_len),
            prefix_len,
        })
    }

    /// Literal as written in the document.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        (u32::from(addr) & self.mask) == (self.address & self.mask)
    }
}

fn prefix_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n)),
    }
}

impl FromStr for AllowEntry {
    type Err = AllowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (ip, prefix) = match text.split_once('/') {
            Some((ip, prefix)) => (ip, Some(prefix)),
            None => (text, None),
        };
        let address: Ipv4Addr = ip
            .parse()
            .map_err(|_| AllowError::InvalidAddress(ip.to_string()))?;
        let prefix_len = match prefix {
            Some(raw) => raw
                .parse::<u8>()
                .ok()
                .filter(|len| *len <= 32)
                .ok_or_else(|| AllowError::InvalidPrefix(raw.to_string()))?,
            None => 32,
        };
        let mut entry = AllowEntry::new(address, prefix_len)?;
        entry.text = text.to_string();
        Ok(entry)
    }
}

impl fmt::Display for AllowEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Ordered rule list; the first matching rule admits a client, no match denies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<AllowEntry>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: AllowEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AllowEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry admitting `addr`.
    ///
    /// IPv4-mapped IPv6 addresses are checked as IPv4; any other IPv6
    /// address never matches.
    pub fn find(&self, addr: IpAddr) -> Option<&AllowEntry> {
        let v4 = match addr {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(v6) => v6.to_ipv4_mapped()?,
        };
        self.entries.iter().find(|entry| entry.matches(v4))
    }

    pub fn is_allowed(&self, addr: IpAddr) -> bool {
        self.find(addr).is_some()
    }
}
