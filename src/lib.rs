//! This crate provides IPv4 and IPv6 subnet algebra and joins of address tables
//! against subnet tables.
//!
//! Addresses and subnets are immutable values parsed from their usual textual
//! forms. Subnets are stored on top of the `ipnet` crate, and longest-prefix
//! lookups over large collections use `prefix-trie` as backend.
//!
//! - [`Address`] and [`Subnet`] parse, format and compare values, and carry the
//!   containment, subtraction and intersection algebra.
//! - [`set_ops`] works on lists of subnets: sort, aggregate, subtract,
//!   intersect, range conversion and division.
//! - [`resolver`] finds the most specific subnet containing an address.
//! - [`join`] pairs every address row with its best matching subnet row under
//!   left, inner, right or full join semantics.
//! - [`ipam`] wraps all of the above for callers that deal in strings.
//!
//! ## Examples
//!
//! ```rust
//! use subnet_join::{join_by, set_ops, Address, JoinKind, JoinOptions, Subnet};
//!
//! let networks: Vec<(Subnet, &str)> = vec![
//!     ("192.168.1.0/24".parse().unwrap(), "Data Center"),
//!     ("192.168.1.32/27".parse().unwrap(), "Lab"),
//!     ("10.0.0.0/8".parse().unwrap(), "Office"),
//! ];
//! let devices = ["192.168.1.50", "10.0.0.5", "172.16.0.1"];
//!
//! let result = join_by(
//!     &devices,
//!     &networks,
//!     |ip| Address::parse(ip).ok(),
//!     |(net, _)| Some(*net),
//!     JoinOptions::new(JoinKind::Left),
//! );
//! let names: Vec<Option<&str>> = result.iter().map(|row| row.right.map(|(_, name)| *name)).collect();
//! assert_eq!(names, [Some("Lab"), Some("Office"), None]);
//!
//! let halves: Vec<Subnet> = vec!["10.0.0.0/9".parse().unwrap(), "10.128.0.0/9".parse().unwrap()];
//! assert_eq!(set_ops::aggregate(&halves), vec!["10.0.0.0/8".parse::<Subnet>().unwrap()]);
//! ```

mod address;
mod cell;
mod error;
pub mod ipam;
pub mod join;
pub mod resolver;
pub mod set_ops;
mod subnet;

pub use address::{Address, Family};
pub use cell::{Cell, Record};
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use join::{
    join_by, join_tables, JoinKind, JoinOptions, JoinResult, JoinRow, MatchStrategy, SubnetJoin,
};
pub use resolver::{best_match, SubnetTrie};
pub use subnet::{compare_specificity, DisplayStyle, Subnet};
