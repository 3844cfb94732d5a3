//! Relational joins of an address-keyed table against a subnet-keyed table.
//!
//! Each left row is paired with its best (longest-prefix) matching right row.
//! The join kind decides what happens to rows without a partner:
//!
//! - [`JoinKind::Left`]: every left row, in input order, with its match or nothing.
//! - [`JoinKind::Inner`]: only left rows that found a match.
//! - [`JoinKind::Right`]: every right row, in input order, followed by the left
//!   rows whose best match it is, or paired with nothing.
//! - [`JoinKind::Full`]: the left join, then every right row nobody matched.
//!
//! A left row appears under at most one right row: its best match. Left rows
//! with an unparsable address and right rows with an unparsable subnet take
//! part in the join but never match.

use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::cell::Record;
use crate::error::{Error, Result};
use crate::resolver::{best_match_by, SubnetTrie};
use crate::subnet::Subnet;

/// Which unmatched rows a join keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JoinKind {
    #[default]
    Left,
    Inner,
    Right,
    Full,
}

impl JoinKind {
    /// Every kind, in the order they are listed in error messages.
    pub const ALL: [JoinKind; 4] = [JoinKind::Left, JoinKind::Inner, JoinKind::Right, JoinKind::Full];

    /// The literal name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Left => "Left",
            JoinKind::Inner => "Inner",
            JoinKind::Right => "Right",
            JoinKind::Full => "Full",
        }
    }
}

impl FromStr for JoinKind {
    type Err = Error;

    /// Case-sensitive.
    fn from_str(s: &str) -> Result<Self> {
        JoinKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidJoinKind {
                given: s.to_string(),
            })
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How best matches are looked up. Both strategies give identical results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchStrategy {
    /// Nested scan of every right row per left row.
    Scan,
    /// Build a [`SubnetTrie`] over the right rows once, then look up each left row.
    #[default]
    Indexed,
}

impl FromStr for MatchStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Scan" => Ok(MatchStrategy::Scan),
            "Indexed" => Ok(MatchStrategy::Indexed),
            _ => Err(Error::InvalidMatchStrategy {
                given: s.to_string(),
            }),
        }
    }
}

/// Join settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct JoinOptions {
    pub kind: JoinKind,
    pub strategy: MatchStrategy,
}

impl JoinOptions {
    /// Options for `kind` with the default strategy.
    pub fn new(kind: JoinKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }
}

/// One output row. A missing side is `None`.
#[derive(Debug)]
pub struct JoinRow<'a, L, R> {
    pub left: Option<&'a L>,
    pub right: Option<&'a R>,
    /// Position of `left` in the left input.
    pub left_index: Option<usize>,
    /// Position of `right` in the right input.
    pub right_index: Option<usize>,
}

impl<L, R> Clone for JoinRow<'_, L, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L, R> Copy for JoinRow<'_, L, R> {}

impl<'a, L, R> JoinRow<'a, L, R> {
    fn new(left: &'a [L], right: &'a [R], left_index: Option<usize>, right_index: Option<usize>) -> Self {
        Self {
            left: left_index.and_then(|i| left.get(i)),
            right: right_index.and_then(|j| right.get(j)),
            left_index,
            right_index,
        }
    }
}

/// The rows of a join, in output order.
#[derive(Debug)]
pub struct JoinResult<'a, L, R> {
    rows: Vec<JoinRow<'a, L, R>>,
}

impl<'a, L, R> JoinResult<'a, L, R> {
    /// Returns the rows in output order.
    pub fn rows(&self) -> &[JoinRow<'a, L, R>] {
        &self.rows
    }

    /// Consumes the result, returning its rows.
    pub fn into_rows(self) -> Vec<JoinRow<'a, L, R>> {
        self.rows
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the join produced no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterator over the rows in output order.
    pub fn iter(&self) -> impl Iterator<Item = &JoinRow<'a, L, R>> {
        self.rows.iter()
    }

    /// `(left_index, right_index)` of every row.
    pub fn index_pairs(&self) -> Vec<(Option<usize>, Option<usize>)> {
        self.rows
            .iter()
            .map(|row| (row.left_index, row.right_index))
            .collect()
    }
}

impl<'a, L, R> IntoIterator for JoinResult<'a, L, R> {
    type Item = JoinRow<'a, L, R>;
    type IntoIter = std::vec::IntoIter<JoinRow<'a, L, R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Joins `left` against `right`, reading keys through the given accessors.
///
/// A key accessor returning `None` marks a row that can never match.
///
/// ```
/// use subnet_join::{join_by, Address, JoinKind, JoinOptions, Subnet};
///
/// let devices = ["192.168.1.10", "10.0.0.5", "172.16.0.1"];
/// let networks = [("192.168.1.0/24", "Data Center"), ("10.0.0.0/8", "Office")];
///
/// let result = join_by(
///     &devices,
///     &networks,
///     |ip| Address::parse(ip).ok(),
///     |(net, _)| Subnet::parse(net).ok(),
///     JoinOptions::new(JoinKind::Inner),
/// );
/// let names: Vec<&str> = result.iter().map(|row| row.right.unwrap().1).collect();
/// assert_eq!(names, ["Data Center", "Office"]);
/// ```
pub fn join_by<'a, L, R, FL, FR>(
    left: &'a [L],
    right: &'a [R],
    left_key: FL,
    right_key: FR,
    options: JoinOptions,
) -> JoinResult<'a, L, R>
where
    FL: Fn(&L) -> Option<Address>,
    FR: Fn(&R) -> Option<Subnet>,
{
    let subnets: Vec<Option<Subnet>> = right.iter().map(right_key).collect();
    let addresses = left.iter().map(left_key);

    let matches: Vec<Option<usize>> = match options.strategy {
        MatchStrategy::Scan => addresses
            .map(|address| address.and_then(|a| best_match_by(&a, &subnets, |s| *s)))
            .collect(),
        MatchStrategy::Indexed => {
            let index = SubnetTrie::from_rows(&subnets, |s| *s);
            addresses
                .map(|address| {
                    address.and_then(|a| index.longest_match(&a).map(|(_, row)| *row))
                })
                .collect()
        }
    };

    let rows = assemble(left, right, &matches, options.kind);
    log::debug!(
        "{} join: {} left rows, {} right rows, {} matched, {} result rows",
        options.kind,
        left.len(),
        right.len(),
        matches.iter().filter(|m| m.is_some()).count(),
        rows.len()
    );
    JoinResult { rows }
}

/// Lays out the output rows for `kind`, given each left row's best match.
fn assemble<'a, L, R>(
    left: &'a [L],
    right: &'a [R],
    matches: &[Option<usize>],
    kind: JoinKind,
) -> Vec<JoinRow<'a, L, R>> {
    let row = |l: Option<usize>, r: Option<usize>| JoinRow::new(left, right, l, r);

    let mut matched_by: Vec<Vec<usize>> = vec![Vec::new(); right.len()];
    for (i, m) in matches.iter().enumerate() {
        if let Some(j) = m {
            matched_by[*j].push(i);
        }
    }

    let mut rows = Vec::with_capacity(matches.len());
    if kind == JoinKind::Right {
        for (j, lefts) in matched_by.iter().enumerate() {
            if lefts.is_empty() {
                rows.push(row(None, Some(j)));
            }
            rows.extend(lefts.iter().map(|i| row(Some(*i), Some(j))));
        }
        return rows;
    }

    for (i, m) in matches.iter().enumerate() {
        if kind == JoinKind::Inner && m.is_none() {
            continue;
        }
        rows.push(row(Some(i), *m));
    }
    if kind == JoinKind::Full {
        // matched right rows are already paired above
        for (j, lefts) in matched_by.iter().enumerate() {
            if lefts.is_empty() {
                rows.push(row(None, Some(j)));
            }
        }
    }
    rows
}

/// Joins host tables on an address column and a subnet column.
///
/// ```
/// use std::collections::HashMap;
/// use subnet_join::{Cell, JoinKind, SubnetJoin};
///
/// fn row(pairs: &[(&str, &str)]) -> HashMap<String, Cell> {
///     pairs.iter().map(|(k, v)| (k.to_string(), Cell::from(*v))).collect()
/// }
///
/// let devices = vec![row(&[("ip", "192.168.1.10")]), row(&[("ip", "10.0.0.5")])];
/// let networks = vec![
///     row(&[("cidr", "192.168.1.0/24"), ("name", "Data Center")]),
///     row(&[("cidr", "10.0.0.0/8"), ("name", "Office")]),
/// ];
///
/// let result = SubnetJoin::new("ip", "cidr").kind(JoinKind::Left).join(&devices, &networks);
/// assert_eq!(result.index_pairs(), [(Some(0), Some(0)), (Some(1), Some(1))]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetJoin {
    address_column: String,
    subnet_column: String,
    options: JoinOptions,
}

impl SubnetJoin {
    /// Joins the `address_column` of the left table to the `subnet_column`
    /// of the right table, as a left join with an indexed lookup.
    pub fn new(address_column: impl Into<String>, subnet_column: impl Into<String>) -> Self {
        Self {
            address_column: address_column.into(),
            subnet_column: subnet_column.into(),
            options: JoinOptions::default(),
        }
    }

    /// Sets the join kind.
    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.options.kind = kind;
        self
    }

    /// Sets the kind from its literal name; fails on anything but `Left`,
    /// `Inner`, `Right` or `Full`.
    pub fn kind_str(self, kind: &str) -> Result<Self> {
        Ok(self.kind(kind.parse()?))
    }

    /// Sets how best matches are looked up.
    pub fn strategy(mut self, strategy: MatchStrategy) -> Self {
        self.options.strategy = strategy;
        self
    }

    /// Replaces kind and strategy at once.
    pub fn options(mut self, options: JoinOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the join. Cells that do not parse never match.
    pub fn join<'a, L: Record, R: Record>(&self, left: &'a [L], right: &'a [R]) -> JoinResult<'a, L, R> {
        join_by(
            left,
            right,
            |row| {
                row.cell(&self.address_column)
                    .to_address()
                    .map_err(|e| log::debug!("left row does not match: {e}"))
                    .ok()
            },
            |row| {
                row.cell(&self.subnet_column)
                    .to_subnet()
                    .map_err(|e| log::debug!("right row never matches: {e}"))
                    .ok()
            },
            self.options,
        )
    }
}

/// One-call form of [`SubnetJoin`] taking the join kind as a literal.
pub fn join_tables<'a, L: Record, R: Record>(
    left: &'a [L],
    right: &'a [R],
    address_column: &str,
    subnet_column: &str,
    kind: &str,
) -> Result<JoinResult<'a, L, R>> {
    Ok(SubnetJoin::new(address_column, subnet_column)
        .kind_str(kind)?
        .join(left, right))
}
