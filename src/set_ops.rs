//! Algorithms over lists of subnets.
//!
//! Every function takes its input by reference and returns a new vector.
//! Unless stated otherwise, results come back in numeric order.

use std::collections::HashSet;

use crate::address::{Address, Family};
use crate::error::{Error, Result};
use crate::subnet::Subnet;

/// Upper bound on the number of children [`divide_subnet`] will produce.
pub const MAX_DIVIDE_BITS: u8 = 20;

/// Sorts by numeric base address, then prefix length. IPv4 sorts before IPv6.
///
/// ```
/// use subnet_join::{set_ops, Subnet};
///
/// let nets: Vec<Subnet> = ["10.0.0.0/8", "9.0.0.0/8", "10.0.0.0/7"]
///     .iter()
///     .map(|s| s.parse().unwrap())
///     .collect();
/// let sorted: Vec<String> = set_ops::sort_subnets(&nets).iter().map(|s| s.to_string()).collect();
/// assert_eq!(sorted, ["9.0.0.0/8", "10.0.0.0/7", "10.0.0.0/8"]);
/// ```
pub fn sort_subnets(subnets: &[Subnet]) -> Vec<Subnet> {
    let mut sorted = subnets.to_vec();
    sorted.sort();
    sorted
}

/// Sorts addresses numerically, IPv4 first.
pub fn sort_addresses(addresses: &[Address]) -> Vec<Address> {
    let mut sorted = addresses.to_vec();
    sorted.sort();
    sorted
}

/// Drops repeated subnets, keeping the first occurrence and the input order.
pub fn dedup_subnets(subnets: &[Subnet]) -> Vec<Subnet> {
    let mut seen = HashSet::new();
    subnets
        .iter()
        .filter(|subnet| seen.insert(**subnet))
        .copied()
        .collect()
}

/// Canonicalizes a set: removes subnets covered by another member and merges
/// sibling pairs, until neither step changes anything.
///
/// ```
/// use subnet_join::{set_ops, Subnet};
///
/// let nets: Vec<Subnet> = ["192.168.1.0/25", "192.168.1.128/25", "192.168.1.64/26"]
///     .iter()
///     .map(|s| s.parse().unwrap())
///     .collect();
/// assert_eq!(set_ops::aggregate(&nets), vec!["192.168.1.0/24".parse::<Subnet>().unwrap()]);
/// ```
pub fn aggregate(subnets: &[Subnet]) -> Vec<Subnet> {
    let mut current = sort_subnets(subnets);
    current.dedup();

    let mut rounds = 0usize;
    loop {
        rounds += 1;
        let before = current.len();
        current = merge_siblings(drop_covered(current));
        log::trace!("aggregate round {rounds}: {before} -> {} subnets", current.len());
        if current.len() == before {
            break;
        }
    }

    log::debug!(
        "aggregated {} subnets into {} in {rounds} rounds",
        subnets.len(),
        current.len()
    );
    current
}

/// Input must be sorted. A container always precedes what it contains, so
/// comparing against the last kept element is enough.
fn drop_covered(sorted: Vec<Subnet>) -> Vec<Subnet> {
    let mut kept: Vec<Subnet> = Vec::with_capacity(sorted.len());
    for subnet in sorted {
        if kept.last().is_some_and(|last| last.contains_subnet(&subnet)) {
            continue;
        }
        kept.push(subnet);
    }
    kept
}

/// Input must be sorted and free of covered subnets.
fn merge_siblings(sorted: Vec<Subnet>) -> Vec<Subnet> {
    let mut stack: Vec<Subnet> = Vec::with_capacity(sorted.len());
    for subnet in sorted {
        stack.push(subnet);
        while stack.len() >= 2 {
            let top = stack[stack.len() - 1];
            let below = stack[stack.len() - 2];
            match below.mergeable(&top) {
                Some(parent) => {
                    stack.truncate(stack.len() - 2);
                    stack.push(parent);
                }
                None => break,
            }
        }
    }
    stack
}

/// For each subnet, the index of the first other subnet in the list that
/// overlaps it. Identical entries overlap each other.
///
/// ```
/// use subnet_join::{set_ops, Subnet};
///
/// let nets: Vec<Subnet> = ["10.0.0.0/8", "192.168.0.0/16", "10.1.0.0/16"]
///     .iter()
///     .map(|s| s.parse().unwrap())
///     .collect();
/// assert_eq!(set_ops::find_overlapping(&nets), vec![Some(2), None, Some(0)]);
/// ```
pub fn find_overlapping(subnets: &[Subnet]) -> Vec<Option<usize>> {
    subnets
        .iter()
        .enumerate()
        .map(|(i, subnet)| {
            subnets
                .iter()
                .enumerate()
                .find(|(j, other)| *j != i && subnet.overlaps(other))
                .map(|(j, _)| j)
        })
        .collect()
}

/// Every address of `from` that is in no subnet of `remove`, aggregated.
pub fn subtract_set(from: &[Subnet], remove: &[Subnet]) -> Vec<Subnet> {
    let mut survivors = Vec::new();
    for subnet in from {
        let mut fragments = vec![*subnet];
        for hole in remove {
            fragments = fragments
                .iter()
                .flat_map(|fragment| fragment.subtract(hole))
                .collect();
            if fragments.is_empty() {
                break;
            }
        }
        survivors.extend(fragments);
    }
    aggregate(&survivors)
}

/// All non-empty pairwise intersections, de-duplicated.
pub fn intersect_set(a: &[Subnet], b: &[Subnet]) -> Vec<Subnet> {
    let mut common: Vec<Subnet> = a
        .iter()
        .flat_map(|x| b.iter().filter_map(move |y| x.intersect(y)))
        .collect();
    common.sort();
    common.dedup();
    common
}

/// Smallest list of prefixes covering exactly `first..=last`.
///
/// ```
/// use subnet_join::{set_ops, Address};
///
/// let first = Address::parse("10.0.0.1").unwrap();
/// let last = Address::parse("10.0.0.6").unwrap();
/// let nets: Vec<String> = set_ops::range_to_cidr(first, last)
///     .unwrap()
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// assert_eq!(nets, ["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]);
/// ```
pub fn range_to_cidr(first: Address, last: Address) -> Result<Vec<Subnet>> {
    let family = first.family();
    if last.family() != family {
        return Err(Error::FamilyMismatch {
            expected: family,
            found: last.family(),
        });
    }
    if first > last {
        return Err(Error::InvalidRange {
            first: first.to_string(),
            last: last.to_string(),
        });
    }

    let bits = family.bits() as u32;
    let end = last.to_integer();
    let mut start = first.to_integer();
    let mut blocks = Vec::new();
    loop {
        let remaining = end - start;
        let mut host_bits = if start == 0 {
            bits
        } else {
            start.trailing_zeros().min(bits)
        };
        while block_span(host_bits) > remaining {
            host_bits -= 1;
        }
        blocks.push(Subnet::new(
            Address::from_integer(family, start)?,
            (bits - host_bits) as u8,
        )?);

        let block_last = start + block_span(host_bits);
        if block_last >= end {
            break;
        }
        start = block_last + 1;
    }
    Ok(blocks)
}

/// Distance from the first to the last address of a block with `host_bits`
/// host bits.
fn block_span(host_bits: u32) -> u128 {
    match host_bits {
        0 => 0,
        h => u128::MAX >> (128 - h),
    }
}

/// All `2^extra_bits` children of `subnet` at `prefix_len + extra_bits`.
pub fn divide_subnet(subnet: &Subnet, extra_bits: u8) -> Result<Vec<Subnet>> {
    let family = subnet.family();
    let new_len = subnet.prefix_len() as u32 + extra_bits as u32;
    let new_len = family.check_prefix_len(new_len)?;
    if extra_bits > MAX_DIVIDE_BITS {
        return Err(Error::TooManySubnets {
            requested: 1u128.checked_shl(extra_bits as u32).unwrap_or(u128::MAX),
            limit: 1 << MAX_DIVIDE_BITS,
        });
    }

    let children = ipnet::IpNet::from(*subnet)
        .subnets(new_len)
        .map_err(|_| Error::PrefixOutOfRange {
            family,
            prefix_len: new_len as u32,
            max: family.bits(),
        })?;
    Ok(children
        .map(|child| Subnet::from(child).with_style(subnet.style()))
        .collect())
}

/// Distinct addresses covered, as `(ipv4, ipv6)`. The IPv6 count is `None`
/// when it is the whole 2^128 space.
pub fn ip_count(subnets: &[Subnet]) -> (u128, Option<u128>) {
    let mut ipv4 = 0u128;
    let mut ipv6 = Some(0u128);
    for root in aggregate(subnets) {
        match root.family() {
            Family::V4 => ipv4 += root.size().unwrap_or_default(),
            Family::V6 => ipv6 = ipv6.zip(root.size()).and_then(|(sum, n)| sum.checked_add(n)),
        }
    }
    (ipv4, ipv6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipnet::IpNet;

    fn nets(v: &[&str]) -> Vec<Subnet> {
        v.iter().map(|s| Subnet::parse(s).unwrap()).collect()
    }

    fn strings(v: &[Subnet]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn sort_is_numeric_not_lexical() {
        let sorted = sort_subnets(&nets(&["10.0.0.0/24", "9.0.0.0/8", "100.0.0.0/8", "::/0", "10.0.0.0/8"]));
        assert_eq!(
            strings(&sorted),
            ["9.0.0.0/8", "10.0.0.0/8", "10.0.0.0/24", "100.0.0.0/8", "::/0"]
        );
        let sorted = sort_addresses(&[addr("10.0.0.10"), addr("10.0.0.9")]);
        assert_eq!(sorted, [addr("10.0.0.9"), addr("10.0.0.10")]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let deduped = dedup_subnets(&nets(&["10.0.0.0/8", "9.0.0.0/8", "10.1.2.3/8"]));
        assert_eq!(strings(&deduped), ["10.0.0.0/8", "9.0.0.0/8"]);
    }

    #[test]
    fn aggregate_merges_and_drops() {
        assert_eq!(
            strings(&aggregate(&nets(&["192.168.1.0/25", "192.168.1.128/25"]))),
            ["192.168.1.0/24"]
        );
        // cascading merges
        assert_eq!(
            strings(&aggregate(&nets(&[
                "10.0.0.3/32",
                "10.0.0.0/31",
                "10.0.0.2/32",
                "10.0.0.4/30",
            ]))),
            ["10.0.0.0/29"]
        );
        // redundant entries and non-siblings stay apart
        assert_eq!(
            strings(&aggregate(&nets(&[
                "10.0.0.0/8",
                "10.20.0.0/16",
                "192.168.1.128/25",
                "192.168.2.0/25",
                "2001:db8::/33",
                "2001:db8:8000::/33",
            ]))),
            ["10.0.0.0/8", "192.168.1.128/25", "192.168.2.0/25", "2001:db8::/32"]
        );
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn aggregate_matches_ipnet() {
        let input = nets(&[
            "10.0.0.0/24",
            "10.0.1.0/24",
            "10.0.2.0/23",
            "10.0.4.0/24",
            "10.0.3.128/25",
            "172.16.0.0/12",
            "172.16.5.0/24",
            "fd00::/9",
            "fd80::/9",
        ]);
        let ours: Vec<IpNet> = aggregate(&input).into_iter().map(IpNet::from).collect();
        let theirs = IpNet::aggregate(&input.iter().map(|s| IpNet::from(*s)).collect());
        assert_eq!(ours, theirs);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let once = aggregate(&nets(&["10.0.0.0/25", "10.0.0.128/26", "10.0.0.192/26", "10.0.1.0/24"]));
        assert_eq!(strings(&once), ["10.0.0.0/23"]);
        assert_eq!(aggregate(&once), once);
    }

    #[test]
    fn overlapping_picks_lowest_index_partner() {
        let input = nets(&["10.1.0.0/16", "10.0.0.0/8", "10.1.2.0/24", "11.0.0.0/8", "11.0.0.0/8"]);
        assert_eq!(
            find_overlapping(&input),
            vec![Some(1), Some(0), Some(0), Some(4), Some(3)]
        );
        assert_eq!(find_overlapping(&nets(&["10.0.0.0/8"])), vec![None]);
        assert!(find_overlapping(&[]).is_empty());
    }

    #[test]
    fn subtract_set_cases() {
        assert_eq!(
            strings(&subtract_set(&nets(&["192.168.1.0/24"]), &nets(&["192.168.1.0/25"]))),
            ["192.168.1.128/25"]
        );
        assert_eq!(
            strings(&subtract_set(
                &nets(&["10.0.0.0/24", "10.0.1.0/24"]),
                &nets(&["10.0.0.0/25", "10.0.1.0/25", "172.16.0.0/12"])
            )),
            ["10.0.0.128/25", "10.0.1.128/25"]
        );
        assert!(subtract_set(&nets(&["10.0.0.0/24"]), &nets(&["10.0.0.0/8"])).is_empty());
        assert_eq!(
            strings(&subtract_set(&nets(&["10.0.0.0/24"]), &[])),
            ["10.0.0.0/24"]
        );
    }

    #[test]
    fn subtract_set_ipv6() {
        assert_eq!(
            strings(&subtract_set(&nets(&["2001:db8::/32"]), &nets(&["2001:db8::/33"]))),
            ["2001:db8:8000::/33"]
        );

        let rest = subtract_set(&nets(&["2001:db8::/32"]), &nets(&["2001:db8::1/128", "10.0.0.0/8"]));
        assert_eq!(rest.len(), 96);
        assert_eq!(rest[0].to_string(), "2001:db8::/128");
        assert_eq!(rest[1].to_string(), "2001:db8::2/127");
        assert_eq!(rest[95].to_string(), "2001:db8:8000::/33");
        assert!(rest.iter().all(|s| !s.contains(&addr("2001:db8::1"))));
        assert!(rest.iter().any(|s| s.contains(&addr("2001:db8::"))));
    }

    #[test]
    fn intersect_set_cases() {
        let a = nets(&["10.0.0.0/8", "192.168.0.0/16"]);
        let b = nets(&["10.1.0.0/16", "10.1.0.0/16", "192.0.0.0/8", "172.16.0.0/12", "::/0"]);
        assert_eq!(
            strings(&intersect_set(&a, &b)),
            ["10.1.0.0/16", "192.168.0.0/16"]
        );
        assert!(intersect_set(&a, &[]).is_empty());
    }

    #[test]
    fn range_to_cidr_cases() {
        let blocks = range_to_cidr(addr("192.168.0.0"), addr("192.168.1.255")).unwrap();
        assert_eq!(strings(&blocks), ["192.168.0.0/23"]);

        let blocks = range_to_cidr(addr("0.0.0.0"), addr("255.255.255.255")).unwrap();
        assert_eq!(strings(&blocks), ["0.0.0.0/0"]);

        let blocks = range_to_cidr(addr("10.0.0.5"), addr("10.0.0.5")).unwrap();
        assert_eq!(strings(&blocks), ["10.0.0.5/32"]);

        let blocks = range_to_cidr(addr("::"), addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff")).unwrap();
        assert_eq!(strings(&blocks), ["::/0"]);

        let blocks = range_to_cidr(addr("255.255.255.254"), addr("255.255.255.255")).unwrap();
        assert_eq!(strings(&blocks), ["255.255.255.254/31"]);

        assert!(matches!(
            range_to_cidr(addr("10.0.0.2"), addr("10.0.0.1")),
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            range_to_cidr(addr("10.0.0.1"), addr("::1")),
            Err(Error::FamilyMismatch { .. })
        ));
    }

    #[test]
    fn range_to_cidr_ipv6() {
        let blocks = range_to_cidr(addr("2001:db8::1"), addr("2001:db8::6")).unwrap();
        assert_eq!(
            strings(&blocks),
            ["2001:db8::1/128", "2001:db8::2/127", "2001:db8::4/127", "2001:db8::6/128"]
        );

        let blocks = range_to_cidr(addr("::1"), addr("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff")).unwrap();
        assert_eq!(blocks.len(), 128);
        assert_eq!(blocks[0].to_string(), "::1/128");
        assert_eq!(blocks[1].to_string(), "::2/127");
        assert_eq!(blocks[127].to_string(), "8000::/1");
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.prefix_len() as usize, 128 - i);
        }

        let blocks = range_to_cidr(addr("2001:db8::"), addr("2001:db8:0:0:ffff:ffff:ffff:ffff")).unwrap();
        assert_eq!(strings(&blocks), ["2001:db8::/64"]);
    }

    #[test]
    fn range_to_cidr_matches_ipnet() {
        let ours: Vec<IpNet> = range_to_cidr(addr("10.0.0.7"), addr("10.0.3.200"))
            .unwrap()
            .into_iter()
            .map(IpNet::from)
            .collect();
        let theirs: Vec<IpNet> = ipnet::Ipv4Subnets::new(
            "10.0.0.7".parse().unwrap(),
            "10.0.3.200".parse().unwrap(),
            0,
        )
        .map(IpNet::V4)
        .collect();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn divide_subnet_cases() {
        let parent = Subnet::parse("192.168.1.0/24").unwrap();
        assert_eq!(
            strings(&divide_subnet(&parent, 2).unwrap()),
            [
                "192.168.1.0/26",
                "192.168.1.64/26",
                "192.168.1.128/26",
                "192.168.1.192/26"
            ]
        );
        assert_eq!(divide_subnet(&parent, 0).unwrap(), vec![parent]);
        assert_eq!(divide_subnet(&parent, 8).unwrap().len(), 256);
        assert!(matches!(
            divide_subnet(&parent, 9),
            Err(Error::PrefixOutOfRange { prefix_len: 33, max: 32, .. })
        ));

        let masked = Subnet::parse("10.0.0.0 255.255.255.0").unwrap();
        assert_eq!(
            divide_subnet(&masked, 1).unwrap()[1].to_string(),
            "10.0.0.128 255.255.255.128"
        );

        let v6 = Subnet::parse("2001:db8::/32").unwrap();
        assert!(matches!(
            divide_subnet(&v6, 21),
            Err(Error::TooManySubnets { .. })
        ));
    }

    #[test]
    fn ip_count_cases() {
        assert_eq!(
            ip_count(&nets(&["192.0.2.129/25", "192.0.2.0/24", "192.0.2.0/24"])),
            (256, Some(0))
        );
        assert_eq!(
            ip_count(&nets(&["198.51.100.0/25", "198.51.100.64/26", "2001:db80::/48", "2001:db80::/49"])),
            (128, Some(1 << 80))
        );
        assert_eq!(ip_count(&nets(&["0.0.0.0/0", "::/0"])), (1 << 32, None));
    }
}
