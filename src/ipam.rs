//! Text-in, text-out helpers for IPAM sheets and other hosts that keep
//! addresses and subnets as strings.
//!
//! Array functions fail with [`Error::Parse`](crate::Error::Parse) naming the first entry that
//! does not parse. Single-value predicates treat unparsable input as
//! "matches nothing" instead.
//!
//! ```
//! use subnet_join::ipam;
//!
//! let merged = ipam::aggregate_array(&["192.168.1.0/25", "192.168.1.128/25"]).unwrap();
//! assert_eq!(merged, ["192.168.1.0/24"]);
//!
//! let rest = ipam::subtract_array(&["192.168.1.0/24"], &["192.168.1.0/25"]).unwrap();
//! assert_eq!(rest, ["192.168.1.128/25"]);
//! ```

use crate::address::{Address, Family};
use crate::error::Result;
use crate::resolver;
use crate::set_ops;
use crate::subnet::Subnet;

fn parse_subnets<S: AsRef<str>>(texts: &[S]) -> Result<Vec<Subnet>> {
    texts
        .iter()
        .map(|text| Subnet::parse(text.as_ref()).map_err(Into::into))
        .collect()
}

fn format_subnets(subnets: &[Subnet]) -> Vec<String> {
    subnets.iter().map(|subnet| subnet.to_string()).collect()
}

/// Integer value of an address.
///
/// ```
/// use subnet_join::ipam;
///
/// assert_eq!(ipam::ip_to_int("10.0.0.1").unwrap(), 167772161);
/// assert_eq!(ipam::ip_to_int("::1").unwrap(), 1);
/// ```
pub fn ip_to_int(text: &str) -> Result<u128> {
    Ok(Address::parse(text)?.to_integer())
}

/// Address text for an integer; fails if `value` does not fit `family`.
///
/// ```
/// use subnet_join::{ipam, Family};
///
/// assert_eq!(ipam::int_to_ip(167772161, Family::V4).unwrap(), "10.0.0.1");
/// assert!(ipam::int_to_ip(1 << 32, Family::V4).is_err());
/// ```
pub fn int_to_ip(value: u128, family: Family) -> Result<String> {
    Ok(Address::from_integer(family, value)?.to_string())
}

/// The network mask of a subnet, as an address.
pub fn subnet_mask(text: &str) -> Result<String> {
    Ok(Subnet::parse(text)?.netmask().to_string())
}

/// The network address of a subnet.
pub fn first_ip(text: &str) -> Result<String> {
    Ok(Subnet::parse(text)?.first_address().to_string())
}

/// The highest address of a subnet.
pub fn last_ip(text: &str) -> Result<String> {
    Ok(Subnet::parse(text)?.last_address().to_string())
}

/// Address count; `None` only for `::/0`.
pub fn subnet_size(text: &str) -> Result<Option<u128>> {
    Ok(Subnet::parse(text)?.size())
}

/// `false` if either side does not parse.
pub fn ip_in_subnet(ip: &str, subnet: &str) -> bool {
    match (Address::parse(ip), Subnet::parse(subnet)) {
        (Ok(ip), Ok(subnet)) => subnet.contains(&ip),
        _ => false,
    }
}

/// The most specific candidate containing `ip`, as written by the caller.
/// Candidates that do not parse are skipped.
pub fn best_match_subnet<'a, S: AsRef<str>>(ip: &str, candidates: &'a [S]) -> Option<&'a str> {
    let ip = Address::parse(ip).ok()?;
    resolver::best_match_by(&ip, candidates, |text| Subnet::parse(text.as_ref()).ok())
        .map(|index| candidates[index].as_ref())
}

/// Sorts by numeric address. Each entry keeps its notation.
pub fn sort_array<S: AsRef<str>>(texts: &[S]) -> Result<Vec<String>> {
    Ok(format_subnets(&set_ops::sort_subnets(&parse_subnets(texts)?)))
}

/// Collapses the list into the fewest covering prefixes, sorted.
pub fn aggregate_array<S: AsRef<str>>(texts: &[S]) -> Result<Vec<String>> {
    Ok(format_subnets(&set_ops::aggregate(&parse_subnets(texts)?)))
}

/// Addresses of `from` not covered by `remove`, as aggregated prefixes.
pub fn subtract_array<S: AsRef<str>, T: AsRef<str>>(from: &[S], remove: &[T]) -> Result<Vec<String>> {
    let from = parse_subnets(from)?;
    let remove = parse_subnets(remove)?;
    Ok(format_subnets(&set_ops::subtract_set(&from, &remove)))
}

/// Pairwise intersections of the two lists, sorted and de-duplicated.
pub fn intersect_array<S: AsRef<str>, T: AsRef<str>>(a: &[S], b: &[T]) -> Result<Vec<String>> {
    let a = parse_subnets(a)?;
    let b = parse_subnets(b)?;
    Ok(format_subnets(&set_ops::intersect_set(&a, &b)))
}

/// For each entry, the first other entry it overlaps, as written by the caller.
pub fn find_overlapping_array<S: AsRef<str>>(texts: &[S]) -> Result<Vec<Option<String>>> {
    let subnets = parse_subnets(texts)?;
    Ok(set_ops::find_overlapping(&subnets)
        .into_iter()
        .map(|partner| partner.map(|j| texts[j].as_ref().to_string()))
        .collect())
}

/// Prefixes covering exactly `first..=last`.
///
/// ```
/// use subnet_join::ipam;
///
/// assert_eq!(
///     ipam::range_to_cidr_array("10.0.0.1", "10.0.0.6").unwrap(),
///     ["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]
/// );
/// ```
pub fn range_to_cidr_array(first: &str, last: &str) -> Result<Vec<String>> {
    let first = Address::parse(first)?;
    let last = Address::parse(last)?;
    Ok(format_subnets(&set_ops::range_to_cidr(first, last)?))
}

/// Splits a subnet into `2^extra_bits` equal children.
pub fn divide_subnet_array(text: &str, extra_bits: u8) -> Result<Vec<String>> {
    Ok(format_subnets(&set_ops::divide_subnet(
        &Subnet::parse(text)?,
        extra_bits,
    )?))
}

/// IPv4 octet at 1-based `index`.
///
/// ```
/// use subnet_join::ipam;
///
/// assert_eq!(ipam::get_octet("192.168.1.10", 2).unwrap(), 168);
/// assert!(ipam::get_octet("192.168.1.10", 0).is_err());
/// ```
pub fn get_octet(ip: &str, index: usize) -> Result<u8> {
    Address::parse(ip)?.octet(index)
}

/// Replaces the IPv4 octet at 1-based `index`.
pub fn set_octet(ip: &str, index: usize, value: u8) -> Result<String> {
    Ok(Address::parse(ip)?.with_octet(index, value)?.to_string())
}

/// IPv6 16-bit block at 1-based `index`.
pub fn get_block(ip: &str, index: usize) -> Result<u16> {
    Address::parse(ip)?.block(index)
}

/// Replaces the IPv6 block at 1-based `index`.
pub fn set_block(ip: &str, index: usize, value: u16) -> Result<String> {
    Ok(Address::parse(ip)?.with_block(index, value)?.to_string())
}
