//! Best (longest-prefix) match of an address against a collection of subnets.
//!
//! [`best_match`] scans the candidates linearly. [`SubnetTrie`] indexes a
//! collection once, using `prefix-trie` as backend, and answers the same
//! question per lookup in time bounded by the address width. Both break ties
//! between identical subnets in favour of the first one in input order.

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use prefix_trie::PrefixMap;

use crate::address::Address;
use crate::subnet::{compare_specificity, Subnet};

/// Index of the most specific candidate containing `address`, or `None`.
///
/// ```
/// use subnet_join::{resolver, Address, Subnet};
///
/// let candidates: Vec<Subnet> = ["192.168.1.0/24", "192.168.1.32/27"]
///     .iter()
///     .map(|s| s.parse().unwrap())
///     .collect();
/// let ip = Address::parse("192.168.1.50").unwrap();
/// assert_eq!(resolver::best_match(&ip, &candidates), Some(1));
/// ```
pub fn best_match(address: &Address, candidates: &[Subnet]) -> Option<usize> {
    best_match_by(address, candidates, |subnet| Some(*subnet))
}

/// Like [`best_match`], over any rows that may carry a subnet. Rows whose key is
/// `None` are skipped.
pub fn best_match_by<R, F>(address: &Address, candidates: &[R], key: F) -> Option<usize>
where
    F: Fn(&R) -> Option<Subnet>,
{
    let mut best: Option<(usize, Subnet)> = None;
    for (index, row) in candidates.iter().enumerate() {
        let Some(subnet) = key(row) else {
            continue;
        };
        if !subnet.contains(address) {
            continue;
        }
        match best {
            Some((_, current)) if compare_specificity(&subnet, &current).is_le() => {}
            _ => best = Some((index, subnet)),
        }
    }
    best.map(|(index, _)| index)
}

/// Table holding IPv4 and IPv6 subnets with a value, for longest-prefix lookups.
///
/// Inserting a subnet that is already present keeps the existing value, so
/// that an index built from a collection resolves identical subnets to the
/// first occurrence.
///
/// ```
/// use subnet_join::{Address, Subnet, SubnetTrie};
///
/// let mut table = SubnetTrie::new();
/// table.insert("2001:db8:dead:beef::/64".parse().unwrap(), "foo");
/// table.insert("2001:db8::/32".parse().unwrap(), "bar");
///
/// let ip = Address::parse("2001:db8:dead:beef::1").unwrap();
/// let (subnet, value) = table.longest_match(&ip).unwrap();
/// assert_eq!(subnet.to_string(), "2001:db8:dead:beef::/64");
/// assert_eq!(value, &"foo");
/// ```
pub struct SubnetTrie<T> {
    ipv4: PrefixMap<Ipv4Net, T>,
    ipv6: PrefixMap<Ipv6Net, T>,
}

impl<T> Default for SubnetTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SubnetTrie<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            ipv4: self.ipv4.clone(),
            ipv6: self.ipv6.clone(),
        }
    }
}

impl SubnetTrie<usize> {
    /// Indexes `rows` by their subnet key; the value is the row index. Rows
    /// without a key are left out.
    pub fn from_rows<R, F>(rows: &[R], key: F) -> Self
    where
        F: Fn(&R) -> Option<Subnet>,
    {
        let mut table = SubnetTrie::new();
        for (index, row) in rows.iter().enumerate() {
            if let Some(subnet) = key(row) {
                table.insert(subnet, index);
            }
        }
        table
    }
}

impl<T> SubnetTrie<T> {
    /// Constructs a new, empty `SubnetTrie<T>`.
    pub fn new() -> Self {
        Self {
            ipv4: PrefixMap::new(),
            ipv6: PrefixMap::new(),
        }
    }

    /// Returns the number of subnets in the table, as `(ipv4, ipv6)`.
    pub fn len(&self) -> (usize, usize) {
        (self.ipv4.iter().count(), self.ipv6.iter().count())
    }

    /// Returns `true` if table is empty.
    pub fn is_empty(&self) -> bool {
        self.ipv4.iter().next().is_none() && self.ipv6.iter().next().is_none()
    }

    /// Inserts `value` for `subnet` unless the subnet is already present.
    /// Returns `false` if it was, leaving the old value in place.
    pub fn insert(&mut self, subnet: Subnet, value: T) -> bool {
        match IpNet::from(subnet) {
            IpNet::V4(net) => {
                if self.ipv4.get(&net).is_some() {
                    return false;
                }
                self.ipv4.insert(net, value);
            }
            IpNet::V6(net) => {
                if self.ipv6.get(&net).is_some() {
                    return false;
                }
                self.ipv6.insert(net, value);
            }
        }
        true
    }

    /// Value stored for exactly `subnet`.
    pub fn exact_match(&self, subnet: &Subnet) -> Option<&T> {
        match IpNet::from(*subnet) {
            IpNet::V4(net) => self.ipv4.get(&net),
            IpNet::V6(net) => self.ipv6.get(&net),
        }
    }

    /// Most specific subnet in the table containing `address`.
    pub fn longest_match(&self, address: &Address) -> Option<(Subnet, &T)> {
        match IpNet::from(address.ip()) {
            IpNet::V4(host) => self
                .ipv4
                .get_lpm(&host)
                .map(|(net, value)| (Subnet::from(*net), value)),
            IpNet::V6(host) => self
                .ipv6
                .get_lpm(&host)
                .map(|(net, value)| (Subnet::from(*net), value)),
        }
    }

    /// Every subnet in the table containing `address`, most specific first.
    ///
    /// Starts at the longest match and probes each shorter prefix of it.
    pub fn matches(&self, address: &Address) -> Vec<(Subnet, &T)> {
        let mut found = Vec::new();
        let mut current = self.longest_match(address).map(|(subnet, _)| subnet);
        while let Some(subnet) = current {
            if let Some(value) = self.exact_match(&subnet) {
                found.push((subnet, value));
            }
            current = subnet.supernet();
        }
        found
    }

    /// Iterator over all subnets, IPv4 first. Order within a family is not
    /// guaranteed.
    pub fn iter(&self) -> impl Iterator<Item = (Subnet, &T)> {
        self.ipv4
            .iter()
            .map(|(net, value)| (Subnet::from(*net), value))
            .chain(
                self.ipv6
                    .iter()
                    .map(|(net, value)| (Subnet::from(*net), value)),
            )
    }
}
