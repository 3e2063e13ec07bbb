//! Sort orders resolved against an entity's declared properties.

use crate::executor::ProjectionError;
use crate::query::criteria::{OrderRequest, Root};
use crate::query::traits::Entity;
use sea_query::{Func, NullOrdering, Order};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn is_ascending(self) -> bool {
        self == Direction::Asc
    }

    fn order(self) -> Order {
        match self {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }
}

impl FromStr for Direction {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(ProjectionError::ParseError(format!(
                "Invalid sort direction '{s}' (expected ASC or DESC)"
            )))
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// Placement of NULLs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHandling {
    /// Whatever the database does (PostgreSQL: NULLs sort as largest)
    #[default]
    Native,
    NullsFirst,
    NullsLast,
}

/// One `(property, direction)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub null_handling: NullHandling,
}

impl SortOrder {
    pub fn new(direction: Direction, property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction,
            ignore_case: false,
            null_handling: NullHandling::Native,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(Direction::Asc, property)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(Direction::Desc, property)
    }

    /// Compare on `LOWER(column)`
    #[must_use]
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    #[must_use]
    pub fn nulls_first(mut self) -> Self {
        self.null_handling = NullHandling::NullsFirst;
        self
    }

    #[must_use]
    pub fn nulls_last(mut self) -> Self {
        self.null_handling = NullHandling::NullsLast;
        self
    }

    fn to_order<E: Entity>(&self, root: &Root<E>) -> Result<OrderRequest, ProjectionError> {
        let column = root.get(&self.property)?;
        let expr = if self.ignore_case {
            Func::lower(column).into()
        } else {
            column
        };
        let nulls = match self.null_handling {
            NullHandling::Native => None,
            NullHandling::NullsFirst => Some(NullOrdering::First),
            NullHandling::NullsLast => Some(NullOrdering::Last),
        };
        Ok(OrderRequest {
            expr,
            order: self.direction.order(),
            nulls,
        })
    }
}

/// Ordered sequence of sort orders; empty means unsorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort {
    orders: Vec<SortOrder>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Ascending sort on each of `properties`, in the given order
    pub fn by(properties: &[&str]) -> Self {
        Self::by_direction(Direction::Asc, properties)
    }

    pub fn by_direction(direction: Direction, properties: &[&str]) -> Self {
        Self {
            orders: properties
                .iter()
                .map(|p| SortOrder::new(direction, *p))
                .collect(),
        }
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// Append the orders of `other` after those of `self`
    #[must_use]
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &SortOrder> {
        self.orders.iter()
    }

    pub fn order_for(&self, property: &str) -> Option<&SortOrder> {
        self.orders.iter().find(|o| o.property == property)
    }
}

impl From<SortOrder> for Sort {
    fn from(order: SortOrder) -> Self {
        Self {
            orders: vec![order],
        }
    }
}

impl From<Vec<SortOrder>> for Sort {
    fn from(orders: Vec<SortOrder>) -> Self {
        Self { orders }
    }
}

impl FromIterator<SortOrder> for Sort {
    fn from_iter<I: IntoIterator<Item = SortOrder>>(iter: I) -> Self {
        Self {
            orders: iter.into_iter().collect(),
        }
    }
}

/// Resolve every order of `sort` against the entity's properties.
pub(crate) fn to_orders<E: Entity>(
    sort: &Sort,
    root: &Root<E>,
) -> Result<Vec<OrderRequest>, ProjectionError> {
    sort.iter().map(|order| order.to_order(root)).collect()
}
