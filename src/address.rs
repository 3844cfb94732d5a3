//! IPv4 and IPv6 addresses: strict parsing, canonical formatting, and integer views.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{Error, ParseError, ParseErrorKind, Result};

/// Address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Width of an address of this family in bits.
    pub const fn bits(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// Largest integer value an address of this family can hold.
    pub const fn max_value(self) -> u128 {
        match self {
            Family::V4 => u32::MAX as u128,
            Family::V6 => u128::MAX,
        }
    }

    /// Integer network mask of `prefix_len` leading ones. `prefix_len` must not
    /// exceed [`Family::bits`].
    pub(crate) fn netmask_bits(self, prefix_len: u8) -> u128 {
        let max = self.max_value();
        max & !max.checked_shr(prefix_len as u32).unwrap_or(0)
    }

    pub(crate) fn check_prefix_len(self, prefix_len: u32) -> Result<u8> {
        if prefix_len > self.bits() as u32 {
            return Err(Error::PrefixOutOfRange {
                family: self,
                prefix_len,
                max: self.bits(),
            });
        }
        Ok(prefix_len as u8)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// An immutable IPv4 or IPv6 address.
///
/// Ordering is numeric within a family, and every IPv4 address sorts before
/// every IPv6 address.
///
/// ```
/// use subnet_join::{Address, Family};
///
/// let a = Address::parse("192.168.1.10").unwrap();
/// assert_eq!(a.to_integer(), 0xC0A8_010A);
/// assert_eq!(Address::from_integer(Family::V4, 0xC0A8_010A).unwrap(), a);
///
/// assert!(Address::parse("192.168.01.10").is_err());
/// assert_eq!(Address::parse("2001:DB8:0:0:1::1").unwrap().to_string(), "2001:db8::1:0:0:1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(IpAddr);

impl Address {
    /// Parses an address literal.
    ///
    /// IPv4 must be exactly four decimal groups in `0..=255` without leading
    /// zeros. IPv6 follows the usual colon-hex grammar with at most one `::`;
    /// a trailing `%zone` is accepted and dropped.
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        let trimmed = text.trim();
        let parsed = if trimmed.contains(':') {
            parse_ipv6(trimmed).map(IpAddr::V6)
        } else {
            parse_ipv4(trimmed).map(IpAddr::V4)
        };
        parsed
            .map(Address)
            .ok_or_else(|| ParseError::new(ParseErrorKind::Address, text))
    }

    /// Builds an address of `family` from its integer value.
    pub fn from_integer(family: Family, value: u128) -> Result<Self> {
        match family {
            Family::V4 => u32::try_from(value)
                .map(|v| Address(IpAddr::V4(Ipv4Addr::from(v))))
                .map_err(|_| Error::IntegerOutOfRange { family, value }),
            Family::V6 => Ok(Address(IpAddr::V6(Ipv6Addr::from(value)))),
        }
    }

    /// Integer value of the address; IPv4 occupies the low 32 bits.
    pub fn to_integer(&self) -> u128 {
        match self.0 {
            IpAddr::V4(v4) => u32::from(v4) as u128,
            IpAddr::V6(v6) => u128::from(v6),
        }
    }

    /// Returns the address family.
    pub fn family(&self) -> Family {
        match self.0 {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    /// Returns `true` for an IPv4 address.
    pub fn is_ipv4(&self) -> bool {
        self.family() == Family::V4
    }

    /// Returns `true` for an IPv6 address.
    pub fn is_ipv6(&self) -> bool {
        self.family() == Family::V6
    }

    /// The standard library address.
    pub fn ip(&self) -> IpAddr {
        self.0
    }

    /// Returns the IPv4 octet at 1-based `index`.
    pub fn octet(&self, index: usize) -> Result<u8> {
        let v4 = self.expect_v4()?;
        check_index("octet", index, 4)?;
        Ok(v4.octets()[index - 1])
    }

    /// Returns a copy with the IPv4 octet at 1-based `index` replaced.
    pub fn with_octet(&self, index: usize, value: u8) -> Result<Self> {
        let v4 = self.expect_v4()?;
        check_index("octet", index, 4)?;
        let mut octets = v4.octets();
        octets[index - 1] = value;
        Ok(Address(IpAddr::V4(Ipv4Addr::from(octets))))
    }

    /// Returns the IPv6 16-bit block at 1-based `index`.
    pub fn block(&self, index: usize) -> Result<u16> {
        let v6 = self.expect_v6()?;
        check_index("block", index, 8)?;
        Ok(v6.segments()[index - 1])
    }

    /// Returns a copy with the IPv6 block at 1-based `index` replaced.
    pub fn with_block(&self, index: usize, value: u16) -> Result<Self> {
        let v6 = self.expect_v6()?;
        check_index("block", index, 8)?;
        let mut segments = v6.segments();
        segments[index - 1] = value;
        Ok(Address(IpAddr::V6(Ipv6Addr::from(segments))))
    }

    /// Adds a signed offset. Returns `None` if the result leaves the family's
    /// address space.
    pub fn checked_add(&self, delta: i128) -> Option<Self> {
        let value = self.to_integer();
        let shifted = if delta >= 0 {
            value.checked_add(delta as u128)?
        } else {
            value.checked_sub(delta.unsigned_abs())?
        };
        Address::from_integer(self.family(), shifted).ok()
    }

    /// Clears every bit after the first `prefix_len` bits.
    pub fn mask(&self, prefix_len: u8) -> Result<Self> {
        let family = self.family();
        family.check_prefix_len(prefix_len as u32)?;
        Address::from_integer(family, self.to_integer() & family.netmask_bits(prefix_len))
    }

    /// Bitwise complement within the family width.
    pub fn invert(&self) -> Self {
        match self.0 {
            IpAddr::V4(v4) => Address(IpAddr::V4(Ipv4Addr::from(!u32::from(v4)))),
            IpAddr::V6(v6) => Address(IpAddr::V6(Ipv6Addr::from(!u128::from(v6)))),
        }
    }

    fn expect_v4(&self) -> Result<Ipv4Addr> {
        match self.0 {
            IpAddr::V4(v4) => Ok(v4),
            IpAddr::V6(_) => Err(Error::FamilyMismatch {
                expected: Family::V4,
                found: Family::V6,
            }),
        }
    }

    fn expect_v6(&self) -> Result<Ipv6Addr> {
        match self.0 {
            IpAddr::V6(v6) => Ok(v6),
            IpAddr::V4(_) => Err(Error::FamilyMismatch {
                expected: Family::V6,
                found: Family::V4,
            }),
        }
    }
}

fn check_index(what: &'static str, index: usize, max: usize) -> Result<()> {
    if index == 0 || index > max {
        return Err(Error::IndexOutOfRange { what, index, max });
    }
    Ok(())
}

/// Strict dotted-decimal: four groups, no leading zeros, no signs.
fn parse_ipv4(text: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut groups = text.split('.');
    for octet in octets.iter_mut() {
        let group = groups.next()?;
        if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if group.len() > 1 && group.starts_with('0') {
            return None;
        }
        *octet = group.parse().ok()?;
    }
    if groups.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}

fn parse_ipv6(text: &str) -> Option<Ipv6Addr> {
    let addr = match text.split_once('%') {
        Some((addr, zone)) if !zone.is_empty() && !zone.contains('%') => addr,
        Some(_) => return None,
        None => text,
    };
    // the embedded dotted tail, if any, must obey the IPv4 rules too
    if let Some((_, tail)) = addr.rsplit_once(':') {
        if tail.contains('.') {
            parse_ipv4(tail)?;
        }
    }
    addr.parse().ok()
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address(ip)
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address(IpAddr::V4(ip))
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address(IpAddr::V6(ip))
    }
}

impl From<Address> for IpAddr {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn parse_ipv4_strict() {
        assert_eq!(addr("192.168.1.1").to_string(), "192.168.1.1");
        assert_eq!(addr("0.0.0.0").to_integer(), 0);
        assert_eq!(addr(" 10.0.0.1 ").to_string(), "10.0.0.1");

        for bad in [
            "",
            "192.168.1",
            "192.168.1.1.1",
            "192.168.01.1",
            "256.0.0.1",
            "1.2.3.-4",
            "1.2.3.+4",
            "1..2.3",
            "1.2.3.4.",
            "a.b.c.d",
            "1.2.3.0004",
        ] {
            assert!(Address::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn parse_ipv6() {
        assert_eq!(addr("2001:DB8::1").to_string(), "2001:db8::1");
        assert_eq!(addr("0:0:0:0:0:0:0:1").to_string(), "::1");
        assert_eq!(addr("::").to_integer(), 0);
        // longest zero run wins, leftmost on ties, single zero groups stay
        assert_eq!(addr("1:0:0:2:0:0:3:4").to_string(), "1::2:0:0:3:4");
        assert_eq!(addr("1:0:0:2:0:0:0:4").to_string(), "1:0:0:2::4");
        assert_eq!(addr("1:0:2:3:4:5:6:7").to_string(), "1:0:2:3:4:5:6:7");
        assert_eq!(addr("fe80::1%eth0").to_string(), "fe80::1");
        assert_eq!(addr("::ffff:10.0.0.1").block(7).unwrap(), 0x0a00);

        for bad in [
            "1::2::3",
            "12345::",
            "1:2:3:4:5:6:7:8:9",
            "fe80::1%",
            "fe80::1%eth0%x",
            "fe80::1%%",
            "::ffff:10.0.0.01",
            ":::",
            "g::1",
        ] {
            assert!(Address::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn integer_round_trip() {
        for s in ["0.0.0.0", "255.255.255.255", "10.1.2.3", "::", "2001:db8::ff", "ffff::"] {
            let a = addr(s);
            assert_eq!(Address::from_integer(a.family(), a.to_integer()).unwrap(), a);
        }
        assert_eq!(
            Address::from_integer(Family::V4, 1 << 32),
            Err(Error::IntegerOutOfRange {
                family: Family::V4,
                value: 1 << 32
            })
        );
        assert_eq!(
            Address::from_integer(Family::V6, 1 << 32).unwrap().to_string(),
            "::1:0:0"
        );
    }

    #[test]
    fn octets_and_blocks() {
        let a = addr("192.168.1.10");
        assert_eq!(a.octet(1).unwrap(), 192);
        assert_eq!(a.octet(4).unwrap(), 10);
        assert!(a.octet(0).is_err());
        assert!(a.octet(5).is_err());
        assert_eq!(a.with_octet(3, 200).unwrap(), addr("192.168.200.10"));
        // the source value is untouched
        assert_eq!(a, addr("192.168.1.10"));
        assert!(matches!(a.block(1), Err(Error::FamilyMismatch { .. })));

        let b = addr("2001:db8::1");
        assert_eq!(b.block(1).unwrap(), 0x2001);
        assert_eq!(b.block(8).unwrap(), 1);
        assert_eq!(b.with_block(8, 0xabcd).unwrap(), addr("2001:db8::abcd"));
        assert!(b.block(9).is_err());
        assert!(b.octet(1).is_err());
    }

    #[test]
    fn arithmetic() {
        let a = addr("10.0.0.255");
        assert_eq!(a.checked_add(1), Some(addr("10.0.1.0")));
        assert_eq!(a.checked_add(-255), Some(addr("10.0.0.0")));
        assert_eq!(addr("255.255.255.255").checked_add(1), None);
        assert_eq!(addr("0.0.0.0").checked_add(-1), None);
        assert_eq!(addr("::").checked_add(-1), None);

        assert_eq!(addr("192.168.1.77").mask(24).unwrap(), addr("192.168.1.0"));
        assert_eq!(addr("192.168.1.77").mask(0).unwrap(), addr("0.0.0.0"));
        assert_eq!(addr("192.168.1.77").mask(32).unwrap(), addr("192.168.1.77"));
        assert!(addr("192.168.1.77").mask(33).is_err());
        assert_eq!(addr("2001:db8::1").mask(128).unwrap(), addr("2001:db8::1"));

        assert_eq!(addr("255.255.255.0").invert(), addr("0.0.0.255"));
        assert_eq!(addr("::").invert().to_integer(), u128::MAX);
    }

    #[test]
    fn ordering_is_numeric() {
        let mut v = vec![addr("10.0.0.10"), addr("::1"), addr("10.0.0.9"), addr("9.255.0.0")];
        v.sort();
        let s: Vec<String> = v.iter().map(|a| a.to_string()).collect();
        assert_eq!(s, ["9.255.0.0", "10.0.0.9", "10.0.0.10", "::1"]);
    }

    #[test]
    fn netmask_bits() {
        assert_eq!(Family::V4.netmask_bits(0), 0);
        assert_eq!(Family::V4.netmask_bits(24), 0xFFFF_FF00);
        assert_eq!(Family::V4.netmask_bits(32), 0xFFFF_FFFF);
        assert_eq!(Family::V6.netmask_bits(128), u128::MAX);
        assert_eq!(Family::V6.netmask_bits(1), 1 << 127);
    }
}
