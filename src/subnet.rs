//! Subnets: parsing of `addr/len` and `addr mask` notations, and the algebra over them.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use crate::address::{Address, Family};
use crate::error::{Error, ParseError, ParseErrorKind, Result};

/// How a subnet was written. Only affects [`Display`](fmt::Display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayStyle {
    /// `192.168.1.0/24`
    #[default]
    Cidr,
    /// `192.168.1.0 255.255.255.0`
    DottedMask,
}

/// A normalized IP subnet: the host bits of the base address are always zero.
///
/// Equality, ordering and hashing look at the family, base and prefix length
/// only; the [`DisplayStyle`] is carried for formatting.
///
/// ```
/// use subnet_join::{Address, Subnet};
///
/// let net = Subnet::parse("192.168.1.37/29").unwrap();
/// assert_eq!(net.to_string(), "192.168.1.32/29");
/// assert!(net.contains(&Address::parse("192.168.1.35").unwrap()));
/// assert!(!net.contains(&Address::parse("192.168.1.41").unwrap()));
///
/// let masked = Subnet::parse("10.1.0.0 255.255.0.0").unwrap();
/// assert_eq!(masked.prefix_len(), 16);
/// assert_eq!(masked.to_string(), "10.1.0.0 255.255.0.0");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Subnet {
    net: IpNet,
    style: DisplayStyle,
}

impl Subnet {
    /// Builds the subnet of `prefix_len` bits containing `address`.
    pub fn new(address: Address, prefix_len: u8) -> Result<Self> {
        let family = address.family();
        family.check_prefix_len(prefix_len as u32)?;
        let net = IpNet::new(address.ip(), prefix_len).map_err(|_| Error::PrefixOutOfRange {
            family,
            prefix_len: prefix_len as u32,
            max: family.bits(),
        })?;
        Ok(Self::from(net))
    }

    /// The single-address subnet (`/32` or `/128`).
    pub fn host(address: Address) -> Self {
        Self::from(IpNet::from(address.ip()))
    }

    /// Parses `"<addr>/<len>"` or `"<addr> <mask>"`.
    ///
    /// Whitespace around either side of the `/` is ignored. Host bits are masked off rather than rejected. A mask must be a
    /// contiguous run of ones of the same family as the address.
    pub fn parse(text: &str) -> std::result::Result<Self, ParseError> {
        let trimmed = text.trim();
        let fail = |kind| ParseError::new(kind, text);

        if let Some((addr, len)) = trimmed.split_once('/') {
            let address = Address::parse(addr).map_err(|_| fail(ParseErrorKind::Address))?;
            let prefix_len = parse_prefix_len(len.trim(), address.family())
                .ok_or_else(|| fail(ParseErrorKind::PrefixLength))?;
            return Subnet::new(address, prefix_len)
                .map_err(|_| fail(ParseErrorKind::PrefixLength));
        }

        let Some((addr, mask)) = trimmed.split_once(|c: char| c.is_ascii_whitespace()) else {
            return Err(fail(ParseErrorKind::Subnet));
        };
        let address = Address::parse(addr).map_err(|_| fail(ParseErrorKind::Address))?;
        let mask = Address::parse(mask).map_err(|_| fail(ParseErrorKind::Mask))?;
        if mask.family() != address.family() {
            return Err(fail(ParseErrorKind::MixedFamily));
        }
        let prefix_len = mask_to_prefix_len(&mask).ok_or_else(|| fail(ParseErrorKind::Mask))?;
        Subnet::new(address, prefix_len)
            .map(|net| net.with_style(DisplayStyle::DottedMask))
            .map_err(|_| fail(ParseErrorKind::Mask))
    }

    /// Returns the address family of the subnet.
    pub fn family(&self) -> Family {
        match self.net {
            IpNet::V4(_) => Family::V4,
            IpNet::V6(_) => Family::V6,
        }
    }

    /// The base (network) address.
    pub fn network(&self) -> Address {
        Address::from(self.net.network())
    }

    /// Returns the prefix length.
    ///
    /// ```
    /// use subnet_join::Subnet;
    ///
    /// let net: Subnet = "192.168.1.0 255.255.255.0".parse().unwrap();
    /// assert_eq!(net.prefix_len(), 24);
    /// ```
    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    /// Returns the family width: 32 or 128.
    pub fn max_prefix_len(&self) -> u8 {
        self.net.max_prefix_len()
    }

    /// Returns the network mask.
    ///
    /// ```
    /// use subnet_join::{Address, Subnet};
    ///
    /// let net: Subnet = "10.0.0.0/12".parse().unwrap();
    /// assert_eq!(net.netmask(), Address::parse("255.240.0.0").unwrap());
    /// ```
    pub fn netmask(&self) -> Address {
        Address::from(self.net.netmask())
    }

    /// Returns the host mask, the inverse of [`Subnet::netmask`].
    pub fn hostmask(&self) -> Address {
        Address::from(self.net.hostmask())
    }

    /// Returns the lowest address, the same as [`Subnet::network`].
    pub fn first_address(&self) -> Address {
        self.network()
    }

    /// Returns the highest address of the subnet.
    ///
    /// ```
    /// use subnet_join::{Address, Subnet};
    ///
    /// let net: Subnet = "192.168.1.32/29".parse().unwrap();
    /// assert_eq!(net.last_address(), Address::parse("192.168.1.39").unwrap());
    /// ```
    pub fn last_address(&self) -> Address {
        Address::from(self.net.broadcast())
    }

    /// Number of addresses in the subnet. `None` only for `::/0`, whose
    /// 2^128 addresses do not fit in a `u128`.
    pub fn size(&self) -> Option<u128> {
        1u128.checked_shl((self.max_prefix_len() - self.prefix_len()) as u32)
    }

    /// How the subnet was written.
    pub fn style(&self) -> DisplayStyle {
        self.style
    }

    /// Same subnet, formatted in another style.
    pub fn with_style(mut self, style: DisplayStyle) -> Self {
        self.style = style;
        self
    }

    /// `base/len`, whatever the recorded style.
    pub fn to_cidr_string(&self) -> String {
        format!("{}/{}", self.network(), self.prefix_len())
    }

    /// The underlying [`IpNet`].
    pub fn ip_net(&self) -> IpNet {
        self.net
    }

    /// `true` if `address & mask == base`. Always `false` across families.
    pub fn contains(&self, address: &Address) -> bool {
        let family = self.family();
        family == address.family()
            && address.to_integer() & family.netmask_bits(self.prefix_len())
                == self.network().to_integer()
    }

    /// `true` if every address of `inner` is in `self`.
    pub fn contains_subnet(&self, inner: &Subnet) -> bool {
        inner.prefix_len() >= self.prefix_len() && self.contains(&inner.network())
    }

    /// Two prefixes overlap exactly when one contains the other.
    pub fn overlaps(&self, other: &Subnet) -> bool {
        self.contains_subnet(other) || other.contains_subnet(self)
    }

    /// `true` if one subnet starts right after the other ends.
    pub fn is_adjacent(&self, other: &Subnet) -> bool {
        if self.family() != other.family() {
            return false;
        }
        let follows = |a: &Subnet, b: &Subnet| {
            a.last_address()
                .checked_add(1)
                .is_some_and(|next| next == b.first_address())
        };
        follows(self, other) || follows(other, self)
    }

    /// The enclosing prefix one bit shorter, if any.
    pub fn supernet(&self) -> Option<Subnet> {
        self.net.supernet().map(|net| Subnet {
            net,
            style: self.style,
        })
    }

    /// The two halves one bit longer, or `None` for a host subnet.
    pub fn split(&self) -> Option<(Subnet, Subnet)> {
        let mut halves = self.net.subnets(self.prefix_len().checked_add(1)?).ok()?;
        let lo = halves.next()?;
        let hi = halves.next()?;
        Some((
            Subnet {
                net: lo,
                style: self.style,
            },
            Subnet {
                net: hi,
                style: self.style,
            },
        ))
    }

    /// If `self` and `other` are siblings, the parent prefix they compose.
    pub fn mergeable(&self, other: &Subnet) -> Option<Subnet> {
        if self.family() != other.family()
            || self.prefix_len() != other.prefix_len()
            || self == other
        {
            return None;
        }
        let parent = self.supernet()?;
        (other.supernet()? == parent).then_some(parent)
    }

    /// `self` minus `subtrahend`, as the fewest prefixes in ascending order.
    ///
    /// ```
    /// use subnet_join::Subnet;
    ///
    /// let net = Subnet::parse("10.0.0.0/24").unwrap();
    /// let hole = Subnet::parse("10.0.0.64/26").unwrap();
    /// let rest: Vec<String> = net.subtract(&hole).iter().map(|s| s.to_string()).collect();
    /// assert_eq!(rest, ["10.0.0.0/26", "10.0.0.128/25"]);
    /// ```
    pub fn subtract(&self, subtrahend: &Subnet) -> Vec<Subnet> {
        if !self.overlaps(subtrahend) {
            return vec![*self];
        }
        if subtrahend.contains_subnet(self) {
            return vec![];
        }

        let mut remainder = Vec::new();
        let mut current = *self;
        while current.prefix_len() < subtrahend.prefix_len() {
            let Some((lo, hi)) = current.split() else {
                break;
            };
            if lo.contains_subnet(subtrahend) {
                remainder.push(hi);
                current = lo;
            } else {
                remainder.push(lo);
                current = hi;
            }
        }
        remainder.sort();
        remainder
    }

    /// The more specific of the two if one contains the other.
    pub fn intersect(&self, other: &Subnet) -> Option<Subnet> {
        if self.contains_subnet(other) {
            Some(*other)
        } else if other.contains_subnet(self) {
            Some(*self)
        } else {
            None
        }
    }

    fn key(&self) -> (Family, u128, u8) {
        (self.family(), self.network().to_integer(), self.prefix_len())
    }
}

/// Compares by prefix length: [`Ordering::Greater`] means `a` is more specific.
pub fn compare_specificity(a: &Subnet, b: &Subnet) -> Ordering {
    a.prefix_len().cmp(&b.prefix_len())
}

/// Decimal prefix length without sign or leading zeros.
fn parse_prefix_len(text: &str, family: Family) -> Option<u8> {
    if text.is_empty() || text.len() > 3 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if text.len() > 1 && text.starts_with('0') {
        return None;
    }
    let len: u8 = text.parse().ok()?;
    (len <= family.bits()).then_some(len)
}

/// Prefix length of a contiguous-ones mask, `None` for anything else.
fn mask_to_prefix_len(mask: &Address) -> Option<u8> {
    let family = mask.family();
    let bits = mask.to_integer();
    let ones = match family {
        Family::V4 => (bits as u32).leading_ones(),
        Family::V6 => bits.leading_ones(),
    } as u8;
    (family.netmask_bits(ones) == bits).then_some(ones)
}

impl PartialEq for Subnet {
    fn eq(&self, other: &Self) -> bool {
        self.net == other.net
    }
}

impl Eq for Subnet {}

impl Hash for Subnet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.net.hash(state);
    }
}

impl PartialOrd for Subnet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subnet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.style {
            DisplayStyle::Cidr => write!(f, "{}/{}", self.network(), self.prefix_len()),
            DisplayStyle::DottedMask => write!(f, "{} {}", self.network(), self.netmask()),
        }
    }
}

impl FromStr for Subnet {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Subnet::parse(s)
    }
}

impl From<IpNet> for Subnet {
    fn from(net: IpNet) -> Self {
        Subnet {
            net: net.trunc(),
            style: DisplayStyle::Cidr,
        }
    }
}

impl From<Ipv4Net> for Subnet {
    fn from(net: Ipv4Net) -> Self {
        Subnet::from(IpNet::V4(net))
    }
}

impl From<Ipv6Net> for Subnet {
    fn from(net: Ipv6Net) -> Self {
        Subnet::from(IpNet::V6(net))
    }
}

impl From<Ipv4Addr> for Subnet {
    fn from(ip: Ipv4Addr) -> Self {
        Subnet::host(Address::from(ip))
    }
}

impl From<Ipv6Addr> for Subnet {
    fn from(ip: Ipv6Addr) -> Self {
        Subnet::host(Address::from(ip))
    }
}

impl From<Subnet> for IpNet {
    fn from(subnet: Subnet) -> Self {
        subnet.net
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Subnet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Subnet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Subnet::parse(&s).map_err(serde::de::Error::custom)
    }
}
