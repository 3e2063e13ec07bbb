//! Execution metadata: row locks, query hints and entity graphs.
//!
//! [`QueryMetadata`] is the per-repository equivalent of a method annotation: it
//! says which lock a query takes, which hints it carries and which entity graph
//! contributes further hints. [`apply_metadata`] decorates an assembled
//! [`TypedQuery`] with all of it.

use crate::query::traits::Entity;
use crate::query::select::TypedQuery;
use crate::query::selection::Selection;
use sea_query::{LockBehavior, LockType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row lock taken by a select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// `FOR SHARE`
    Share,
    /// `FOR KEY SHARE`
    KeyShare,
    /// `FOR UPDATE`
    Update,
    /// `FOR NO KEY UPDATE`
    NoKeyUpdate,
}

impl LockMode {
    fn lock_type(self) -> LockType {
        match self {
            LockMode::Share => LockType::Share,
            LockMode::KeyShare => LockType::KeyShare,
            LockMode::Update => LockType::Update,
            LockMode::NoKeyUpdate => LockType::NoKeyUpdate,
        }
    }
}

/// What to do when a locked row is already held by another transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockWait {
    #[default]
    Wait,
    NoWait,
    SkipLocked,
}

/// Which side wins when an explicit hint and an entity-graph hint share a name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintPrecedence {
    /// Explicit hints override graph hints
    #[default]
    ExplicitWins,
    /// Graph hints are merged last and override explicit ones
    GraphWins,
}

/// Ordered map of hint name to hint value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHints(BTreeMap<String, String>);

impl QueryHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a hint, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy every hint of `other` into `self`; `other` wins on collisions.
    pub fn extend_from(&mut self, other: &QueryHints) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryHints {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Reference to an entity graph; `name: None` asks for the fallback name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityGraph {
    pub name: Option<String>,
}

impl EntityGraph {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Graph resolved through `"<entity>.<operation>"`
    pub fn fallback() -> Self {
        Self { name: None }
    }

    /// The graph name to look up for `entity_name` invoked from `operation`
    pub fn resolve_name(&self, entity_name: &str, operation: &str) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{entity_name}.{operation}"),
        }
    }
}

/// Lock, hints and entity graph applied to every query of a repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMetadata {
    pub lock: Option<LockMode>,
    pub lock_wait: LockWait,
    pub hints: QueryHints,
    pub entity_graph: Option<EntityGraph>,
    /// Operation name used for the fallback graph name; defaults to the
    /// repository operation being run.
    pub method_name: Option<String>,
}

impl QueryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = Some(mode);
        self
    }

    #[must_use]
    pub fn lock_wait(mut self, wait: LockWait) -> Self {
        self.lock_wait = wait;
        self
    }

    #[must_use]
    pub fn hint(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(name, value);
        self
    }

    #[must_use]
    pub fn entity_graph(mut self, graph: EntityGraph) -> Self {
        self.entity_graph = Some(graph);
        self
    }

    #[must_use]
    pub fn method_name(mut self, name: impl Into<String>) -> Self {
        self.method_name = Some(name.into());
        self
    }

    /// Explicit hints merged with hints of the configured entity graph.
    ///
    /// An entity graph the entity cannot resolve contributes nothing.
    pub fn query_hints<E: Entity>(
        &self,
        entity: &E,
        operation: &str,
        precedence: HintPrecedence,
    ) -> QueryHints {
        let Some(graph) = &self.entity_graph else {
            return self.hints.clone();
        };

        let operation = self.method_name.as_deref().unwrap_or(operation);
        let graph_name = graph.resolve_name(entity.entity_name(), operation);
        let graph_hints = match entity.entity_graph(&graph_name) {
            Some(hints) => hints,
            None => {
                log::debug!(
                    "entity graph '{}' not found for {}, continuing without graph hints",
                    graph_name,
                    entity.entity_name()
                );
                QueryHints::new()
            }
        };

        match precedence {
            HintPrecedence::ExplicitWins => {
                let mut merged = graph_hints;
                merged.extend_from(&self.hints);
                merged
            }
            HintPrecedence::GraphWins => {
                let mut merged = self.hints.clone();
                merged.extend_from(&graph_hints);
                merged
            }
        }
    }
}

/// Apply lock mode then hints from `metadata` to `query`.
///
/// `None` leaves the query untouched.
pub fn apply_metadata<'s, E, S>(
    mut query: TypedQuery<'s, E, S>,
    metadata: Option<&QueryMetadata>,
    operation: &str,
    precedence: HintPrecedence,
) -> TypedQuery<'s, E, S>
where
    E: Entity,
    S: Selection<E> + ?Sized,
{
    let Some(metadata) = metadata else {
        return query;
    };

    if let Some(mode) = metadata.lock {
        let statement = query.statement_mut();
        match metadata.lock_wait {
            LockWait::Wait => {
                statement.lock(mode.lock_type());
            }
            LockWait::NoWait => {
                statement.lock_with_behavior(mode.lock_type(), LockBehavior::Nowait);
            }
            LockWait::SkipLocked => {
                statement.lock_with_behavior(mode.lock_type(), LockBehavior::SkipLocked);
            }
        }
    }

    let hints = metadata.query_hints(&E::default(), operation, precedence);
    query.set_hints(hints);
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::traits::Entity;

    #[derive(Default)]
    struct Account;

    impl Entity for Account {
        type Model = ();

        fn table_name(&self) -> &'static str {
            "accounts"
        }

        fn entity_name(&self) -> &'static str {
            "Account"
        }

        fn column_names(&self) -> &'static [&'static str] {
            &["id", "owner"]
        }

        fn entity_graph(&self, name: &str) -> Option<QueryHints> {
            match name {
                "Account.find_all" => Some(QueryHints::new().with("Leading", "accounts owners")),
                "Account.withOwner" => Some(
                    QueryHints::new()
                        .with("Leading", "owners accounts")
                        .with("HashJoin", "accounts owners"),
                ),
                _ => None,
            }
        }
    }

    #[test]
    fn test_graph_fallback_name() {
        let graph = EntityGraph::fallback();
        assert_eq!(graph.resolve_name("Account", "find_page"), "Account.find_page");

        let empty = EntityGraph::named("");
        assert_eq!(empty.resolve_name("Account", "find_one"), "Account.find_one");

        let named = EntityGraph::named("Account.withOwner");
        assert_eq!(named.resolve_name("Account", "find_one"), "Account.withOwner");
    }

    #[test]
    fn test_no_graph_returns_explicit_hints() {
        let metadata = QueryMetadata::new().hint("SeqScan", "accounts");
        let hints = metadata.query_hints(&Account, "find_all", HintPrecedence::ExplicitWins);
        assert_eq!(hints, QueryHints::new().with("SeqScan", "accounts"));
    }

    #[test]
    fn test_fallback_graph_uses_operation() {
        let metadata = QueryMetadata::new().entity_graph(EntityGraph::fallback());
        let hints = metadata.query_hints(&Account, "find_all", HintPrecedence::ExplicitWins);
        assert_eq!(hints.get("Leading"), Some("accounts owners"));

        // no graph for find_one: silently omitted
        let hints = metadata.query_hints(&Account, "find_one", HintPrecedence::ExplicitWins);
        assert!(hints.is_empty());
    }

    #[test]
    fn test_method_name_overrides_operation() {
        let metadata = QueryMetadata::new()
            .entity_graph(EntityGraph::fallback())
            .method_name("withOwner");
        let hints = metadata.query_hints(&Account, "find_page", HintPrecedence::ExplicitWins);
        assert_eq!(hints.len(), 2);
    }

    #[test]
    fn test_explicit_hints_win_by_default() {
        let metadata = QueryMetadata::new()
            .hint("Leading", "explicit")
            .entity_graph(EntityGraph::named("Account.withOwner"));
        let hints = metadata.query_hints(&Account, "find_all", HintPrecedence::ExplicitWins);
        assert_eq!(hints.get("Leading"), Some("explicit"));
        assert_eq!(hints.get("HashJoin"), Some("accounts owners"));
    }

    #[test]
    fn test_graph_hints_win_when_requested() {
        let metadata = QueryMetadata::new()
            .hint("Leading", "explicit")
            .hint("SeqScan", "accounts")
            .entity_graph(EntityGraph::named("Account.withOwner"));
        let hints = metadata.query_hints(&Account, "find_all", HintPrecedence::GraphWins);
        assert_eq!(hints.get("Leading"), Some("owners accounts"));
        assert_eq!(hints.get("SeqScan"), Some("accounts"));
    }

    #[test]
    fn test_unknown_named_graph_is_not_fatal() {
        let metadata = QueryMetadata::new()
            .hint("SeqScan", "accounts")
            .entity_graph(EntityGraph::named("Account.missing"));
        let hints = metadata.query_hints(&Account, "find_all", HintPrecedence::GraphWins);
        assert_eq!(hints, QueryHints::new().with("SeqScan", "accounts"));
    }

    #[test]
    fn test_apply_metadata_locks_then_hints() {
        use crate::query::select::build_query;
        use crate::query::selection::ColumnSelection;

        let selection = ColumnSelection::<Account, (i64,)>::new(&["id"]);
        let metadata = QueryMetadata::new()
            .lock(LockMode::Update)
            .lock_wait(LockWait::NoWait)
            .entity_graph(EntityGraph::fallback());

        let query = build_query(None, &selection, None).unwrap();
        let query = apply_metadata(query, Some(&metadata), "find_all", HintPrecedence::ExplicitWins);
        let statement = query.to_statement();
        assert!(statement.sql.ends_with("FOR UPDATE NOWAIT"), "{}", statement.sql);
        assert_eq!(statement.hints.get("Leading"), Some("accounts owners"));

        let untouched = apply_metadata(
            build_query(None, &selection, None).unwrap(),
            None,
            "find_all",
            HintPrecedence::ExplicitWins,
        )
        .to_statement();
        assert!(!untouched.sql.contains("FOR "));
        assert!(untouched.hints.is_empty());
    }

    #[test]
    fn test_hints_from_iterator() {
        let hints: QueryHints = vec![("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(hints.iter().collect::<Vec<_>>(), vec![("a", "1"), ("b", "2")]);
    }
}
