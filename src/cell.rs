//! Boundary adapter for host tables whose cells are loosely typed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::address::{Address, Family};
use crate::error::{ParseError, ParseErrorKind};
use crate::subnet::Subnet;

/// A host table cell.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Cell {
    Text(String),
    Number(f64),
    #[default]
    Null,
}

impl Cell {
    /// Text is parsed as an address literal. A number is read as the integer
    /// value of an IPv4 address when it is integral and fits 32 bits.
    pub fn to_address(&self) -> Result<Address, ParseError> {
        match self {
            Cell::Text(text) => Address::parse(text),
            Cell::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
                Address::from_integer(Family::V4, *n as u128)
                    .map_err(|_| ParseError::new(ParseErrorKind::Address, &n.to_string()))
            }
            other => Err(ParseError::new(ParseErrorKind::Address, &other.to_string())),
        }
    }

    /// Only text cells can hold a subnet.
    pub fn to_subnet(&self) -> Result<Subnet, ParseError> {
        match self {
            Cell::Text(text) => Subnet::parse(text),
            other => Err(ParseError::new(ParseErrorKind::Subnet, &other.to_string())),
        }
    }

    /// Returns `true` for an empty cell.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Null => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(text)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<u32> for Cell {
    fn from(n: u32) -> Self {
        Cell::Number(n as f64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

/// A row of a host table, addressed by column name.
pub trait Record {
    /// The cell under `column`; missing columns read as [`Cell::Null`].
    fn cell(&self, column: &str) -> Cell;
}

impl Record for HashMap<String, Cell> {
    fn cell(&self, column: &str) -> Cell {
        self.get(column).cloned().unwrap_or_default()
    }
}

impl Record for BTreeMap<String, Cell> {
    fn cell(&self, column: &str) -> Cell {
        self.get(column).cloned().unwrap_or_default()
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn cell(&self, column: &str) -> Cell {
        (**self).cell(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_cells() {
        assert_eq!(
            Cell::from("10.0.0.1").to_address().unwrap(),
            Address::parse("10.0.0.1").unwrap()
        );
        assert_eq!(
            Cell::from("10.0.0.0/8").to_subnet().unwrap(),
            Subnet::parse("10.0.0.0/8").unwrap()
        );
        assert!(Cell::from("nope").to_address().is_err());
        assert!(Cell::from("10.0.0.1").to_subnet().is_err());
    }

    #[test]
    fn number_cells() {
        assert_eq!(
            Cell::from(167772161u32).to_address().unwrap(),
            Address::parse("10.0.0.1").unwrap()
        );
        assert!(Cell::Number(1.5).to_address().is_err());
        assert!(Cell::Number(-1.0).to_address().is_err());
        assert!(Cell::Number(4294967296.0).to_address().is_err());
        assert!(Cell::Number(f64::NAN).to_address().is_err());
        assert!(Cell::Number(24.0).to_subnet().is_err());
    }

    #[test]
    fn null_cells() {
        assert!(Cell::Null.to_address().is_err());
        assert!(Cell::Null.to_subnet().is_err());
        assert!(Cell::from(None::<&str>).is_null());
    }

    #[test]
    fn records() {
        let mut row = HashMap::new();
        row.insert("ip".to_string(), Cell::from("10.0.0.1"));
        assert_eq!(row.cell("ip"), Cell::from("10.0.0.1"));
        assert_eq!(row.cell("missing"), Cell::Null);

        let mut row = BTreeMap::new();
        row.insert("net".to_string(), Cell::from("10.0.0.0/8"));
        assert_eq!((&row).cell("net"), Cell::from("10.0.0.0/8"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_untagged() {
        let row: HashMap<String, Cell> =
            serde_json::from_str(r#"{"ip": "10.0.0.1", "n": 3, "x": null}"#).unwrap();
        assert_eq!(row.cell("ip"), Cell::from("10.0.0.1"));
        assert_eq!(row.cell("n"), Cell::Number(3.0));
        assert_eq!(row.cell("x"), Cell::Null);
    }
}
