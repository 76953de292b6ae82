//! Topological grouping of sub-queries by `depends_on`, spec.md §4.11:
//! "topological groups; within a group, execute up to `batch.max_parallel`
//! queries concurrently."

use std::collections::{HashMap, HashSet};

use crate::error::BatchError;
use crate::model::SubQuery;

/// Resolved id for every sub-query (explicit `id`, or its index as a
/// string when omitted — still usable as a `depends_on` target).
pub fn assign_ids(queries: &[SubQuery]) -> Result<Vec<String>, BatchError> {
    let mut ids = Vec::with_capacity(queries.len());
    let mut seen = HashSet::new();
    for (index, query) in queries.iter().enumerate() {
        let id = query.id.clone().unwrap_or_else(|| index.to_string());
        if !seen.insert(id.clone()) {
            return Err(BatchError::DuplicateId(id));
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Kahn's algorithm, grouped by level: each group contains every node whose
/// dependencies are already in an earlier group (or has none). A non-empty
/// remainder after the walk means a cycle.
pub fn topological_groups(ids: &[String], queries: &[SubQuery]) -> Result<Vec<Vec<usize>>, BatchError> {
    let index_of: HashMap<&str, usize> = ids.iter().map(|id| id.as_str()).zip(0..).collect();

    let mut remaining_deps: Vec<HashSet<usize>> = Vec::with_capacity(queries.len());
    for query in queries {
        let mut deps = HashSet::new();
        for dep_id in &query.depends_on {
            let dep_index = *index_of
                .get(dep_id.as_str())
                .ok_or_else(|| BatchError::UnknownDependency(dep_id.clone(), dep_id.clone()))?;
            deps.insert(dep_index);
        }
        remaining_deps.push(deps);
    }

    let mut resolved: HashSet<usize> = HashSet::new();
    let mut groups = Vec::new();

    while resolved.len() < queries.len() {
        let ready: Vec<usize> = (0..queries.len())
            .filter(|i| !resolved.contains(i) && remaining_deps[*i].is_subset(&resolved))
            .collect();

        if ready.is_empty() {
            return Err(BatchError::CycleDetected);
        }

        for &i in &ready {
            resolved.insert(i);
        }
        groups.push(ready);
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use setu_catalog::QueryRequest;

    fn query(id: &str, depends_on: &[&str]) -> SubQuery {
        SubQuery {
            id: Some(id.to_string()),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            request: QueryRequest {
                dataset: "orders".into(),
                dimensions: vec![],
                metrics: vec![],
                filters: vec![],
                order_by: vec![],
                limit: None,
                offset: 0,
            },
        }
    }

    #[test]
    fn groups_independent_queries_together() {
        let queries = vec![query("A", &[]), query("B", &[])];
        let ids = assign_ids(&queries).unwrap();
        let groups = topological_groups(&ids, &queries).unwrap();
        assert_eq!(groups, vec![vec![0, 1]]);
    }

    #[test]
    fn orders_dependent_query_into_later_group() {
        let queries = vec![query("A", &[]), query("B", &["A"])];
        let ids = assign_ids(&queries).unwrap();
        let groups = topological_groups(&ids, &queries).unwrap();
        assert_eq!(groups, vec![vec![0], vec![1]]);
    }

    #[test]
    fn detects_cycle() {
        let queries = vec![query("A", &["B"]), query("B", &["A"])];
        let ids = assign_ids(&queries).unwrap();
        let err = topological_groups(&ids, &queries).unwrap_err();
        assert!(matches!(err, BatchError::CycleDetected));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let queries = vec![query("A", &["missing"])];
        let ids = assign_ids(&queries).unwrap();
        let err = topological_groups(&ids, &queries).unwrap_err();
        assert!(matches!(err, BatchError::UnknownDependency(..)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let queries = vec![query("A", &[]), query("A", &[])];
        let err = assign_ids(&queries).unwrap_err();
        assert!(matches!(err, BatchError::DuplicateId(_)));
    }
}
