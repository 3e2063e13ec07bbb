//! Composable predicates over an entity.
//!
//! A [`Specification`] turns into a `sea_query::Condition` when a query is
//! assembled, not when it is constructed, and is borrowed immutably so the same
//! value can filter both a data query and its count query.
//!
//! ```
//! use lifeguard_projection::{where_fn, CriteriaQuery, Entity, Root, Specification, SpecificationExt};
//! use sea_query::{ExprTrait, IntoCondition};
//!
//! # #[derive(Default)]
//! # struct FooBar;
//! # impl Entity for FooBar {
//! #     type Model = ();
//! #     fn table_name(&self) -> &'static str { "foo_bar" }
//! #     fn column_names(&self) -> &'static [&'static str] { &["foo", "bar"] }
//! # }
//! fn bar_equals(val: i64) -> impl Specification<FooBar> {
//!     where_fn(move |root: &Root<FooBar>, _query: &mut CriteriaQuery<FooBar>| {
//!         Some(root.col("bar").eq(val).into_condition())
//!     })
//! }
//!
//! let any_of_three = bar_equals(1).or(bar_equals(2)).or(bar_equals(3));
//! ```

use crate::query::criteria::{CriteriaQuery, Root};
use crate::query::traits::Entity;
use sea_query::Condition;
use std::marker::PhantomData;

/// Boolean filter over entity `E`
///
/// Returning `None` means "no restriction".
pub trait Specification<E: Entity> {
    fn to_predicate(&self, root: &Root<E>, query: &mut CriteriaQuery<E>) -> Option<Condition>;
}

impl<E: Entity, S: Specification<E> + ?Sized> Specification<E> for &S {
    fn to_predicate(&self, root: &Root<E>, query: &mut CriteriaQuery<E>) -> Option<Condition> {
        (**self).to_predicate(root, query)
    }
}

impl<E: Entity, S: Specification<E> + ?Sized> Specification<E> for Box<S> {
    fn to_predicate(&self, root: &Root<E>, query: &mut CriteriaQuery<E>) -> Option<Condition> {
        (**self).to_predicate(root, query)
    }
}

/// A fixed condition that needs no query context
impl<E: Entity> Specification<E> for Condition {
    fn to_predicate(&self, _root: &Root<E>, _query: &mut CriteriaQuery<E>) -> Option<Condition> {
        Some(self.clone())
    }
}

/// Specification backed by a closure; see [`where_fn`]
pub struct FnSpecification<E, F> {
    f: F,
    _entity: PhantomData<fn() -> E>,
}

/// Build a specification from a closure over the root and the query.
pub fn where_fn<E, F>(f: F) -> FnSpecification<E, F>
where
    E: Entity,
    F: Fn(&Root<E>, &mut CriteriaQuery<E>) -> Option<Condition>,
{
    FnSpecification {
        f,
        _entity: PhantomData,
    }
}

impl<E, F> Specification<E> for FnSpecification<E, F>
where
    E: Entity,
    F: Fn(&Root<E>, &mut CriteriaQuery<E>) -> Option<Condition>,
{
    fn to_predicate(&self, root: &Root<E>, query: &mut CriteriaQuery<E>) -> Option<Condition> {
        (self.f)(root, query)
    }
}

/// Conjunction; an operand yielding `None` is skipped
pub struct And<A, B>(A, B);

/// Disjunction; an operand yielding `None` is skipped
pub struct Or<A, B>(A, B);

/// Negation; `None` stays `None`
pub struct Not<A>(A);

impl<E: Entity, A: Specification<E>, B: Specification<E>> Specification<E> for And<A, B> {
    fn to_predicate(&self, root: &Root<E>, query: &mut CriteriaQuery<E>) -> Option<Condition> {
        let left = self.0.to_predicate(root, query);
        let right = self.1.to_predicate(root, query);
        match (left, right) {
            (Some(l), Some(r)) => Some(Condition::all().add(l).add(r)),
            (l, r) => l.or(r),
        }
    }
}

impl<E: Entity, A: Specification<E>, B: Specification<E>> Specification<E> for Or<A, B> {
    fn to_predicate(&self, root: &Root<E>, query: &mut CriteriaQuery<E>) -> Option<Condition> {
        let left = self.0.to_predicate(root, query);
        let right = self.1.to_predicate(root, query);
        match (left, right) {
            (Some(l), Some(r)) => Some(Condition::any().add(l).add(r)),
            (l, r) => l.or(r),
        }
    }
}

impl<E: Entity, A: Specification<E>> Specification<E> for Not<A> {
    fn to_predicate(&self, root: &Root<E>, query: &mut CriteriaQuery<E>) -> Option<Condition> {
        self.0.to_predicate(root, query).map(Condition::not)
    }
}

/// Combinators available on every specification
pub trait SpecificationExt<E: Entity>: Specification<E> + Sized {
    fn and<B: Specification<E>>(self, other: B) -> And<Self, B> {
        And(self, other)
    }

    fn or<B: Specification<E>>(self, other: B) -> Or<Self, B> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<E: Entity, S: Specification<E>> SpecificationExt<E> for S {}

/// Negate a specification
pub fn not<E: Entity, S: Specification<E>>(spec: S) -> Not<S> {
    Not(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{ExprTrait, IntoCondition, PostgresQueryBuilder};

    #[derive(Default)]
    struct FooBar;

    impl Entity for FooBar {
        type Model = ();

        fn table_name(&self) -> &'static str {
            "foo_bar"
        }

        fn column_names(&self) -> &'static [&'static str] {
            &["foo", "bar"]
        }
    }

    fn bar_equals(val: i64) -> impl Specification<FooBar> {
        where_fn(move |root: &Root<FooBar>, _q: &mut CriteriaQuery<FooBar>| {
            Some(root.col("bar").eq(val).into_condition())
        })
    }

    fn nothing() -> impl Specification<FooBar> {
        where_fn(|_root: &Root<FooBar>, _q: &mut CriteriaQuery<FooBar>| None)
    }

    fn render(spec: &dyn Specification<FooBar>) -> Option<String> {
        let root = Root::new();
        let mut query = CriteriaQuery::new(&root);
        let condition = spec.to_predicate(&root, &mut query)?;
        query.restrict(condition);
        let (mut statement, _, _) = query.into_parts();
        statement.expr(root.col("foo"));
        Some(statement.build(PostgresQueryBuilder).0)
    }

    #[test]
    fn test_or_renders_both_operands() {
        let sql = render(&bar_equals(1).or(bar_equals(2))).unwrap();
        assert!(sql.contains(" OR "), "{sql}");
        assert_eq!(sql.matches(r#""foo_bar"."bar" = "#).count(), 2);
    }

    #[test]
    fn test_and_renders_both_operands() {
        let sql = render(&bar_equals(1).and(bar_equals(2))).unwrap();
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn test_absent_operands_are_skipped() {
        let sql = render(&nothing().and(bar_equals(1))).unwrap();
        assert!(!sql.contains(" AND "));
        assert!(sql.contains(r#""foo_bar"."bar" = "#));

        let sql = render(&bar_equals(2).or(nothing())).unwrap();
        assert!(!sql.contains(" OR "));

        assert!(render(&nothing().and(nothing())).is_none());
        assert!(render(&not(nothing())).is_none());
    }

    #[test]
    fn test_not_negates() {
        let sql = render(&bar_equals(1).not()).unwrap();
        assert!(sql.contains("NOT"), "{sql}");
    }

    #[test]
    fn test_predicate_is_reusable() {
        let spec = bar_equals(7);
        let first = render(&spec).unwrap();
        let second = render(&spec).unwrap();
        assert_eq!(first, second);
    }
}
