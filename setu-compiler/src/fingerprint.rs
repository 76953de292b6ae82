//! Deterministic cache-key hash over a normalized query request.

use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use setu_catalog::{Filter, FilterOp, OrderBy, QueryRequest, SortDirection};

/// 16-byte truncated SHA-256 digest, formatted as lowercase hex. Equal
/// requests (after normalization) always fingerprint identically; this is
/// the cache key used throughout `setu-cache`/`setu-executor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Canonical, order-independent encoding of the fields that determine a
/// query's result set, used as the hash preimage.
#[derive(Serialize)]
struct Canonical<'a> {
    dataset_id: &'a str,
    dimensions: Vec<&'a str>,
    metrics: Vec<&'a str>,
    filters: Vec<CanonicalFilter<'a>>,
    order_by: Vec<CanonicalOrder<'a>>,
    limit: Option<u64>,
    offset: u64,
    tenant: &'a str,
    catalog_generation: u64,
}

#[derive(Serialize)]
struct CanonicalFilter<'a> {
    field: &'a str,
    op: FilterOp,
    value: Option<CanonicalValue>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CanonicalValue {
    Single(JsonValue),
    List(Vec<JsonValue>),
}

#[derive(Serialize)]
struct CanonicalOrder<'a> {
    field: &'a str,
    direction: SortDirection,
}

fn canonicalize_value(filter: &Filter) -> Option<CanonicalValue> {
    match &filter.value {
        None => None,
        Some(JsonValue::Array(items)) => {
            let mut sorted: Vec<JsonValue> = items.clone();
            sorted.sort_by_key(|v| v.to_string());
            sorted.dedup_by_key(|v| v.to_string());
            Some(CanonicalValue::List(sorted))
        }
        Some(other) => Some(CanonicalValue::Single(other.clone())),
    }
}

/// Compute the fingerprint for a validated request against a specific
/// catalog generation and tenant.
pub fn fingerprint(request: &QueryRequest, tenant: &str, catalog_generation: u64) -> Fingerprint {
    let mut dimensions: Vec<&str> = request.dimensions.iter().map(String::as_str).collect();
    dimensions.sort_unstable();

    let mut metrics: Vec<&str> = request.metrics.iter().map(String::as_str).collect();
    metrics.sort_unstable();

    let mut filters: Vec<CanonicalFilter> = request
        .filters
        .iter()
        .map(|f| CanonicalFilter {
            field: &f.field,
            op: f.op,
            value: canonicalize_value(f),
        })
        .collect();
    filters.sort_by(|a, b| a.field.cmp(b.field).then_with(|| format!("{:?}", a.op).cmp(&format!("{:?}", b.op))));

    let order_by: Vec<CanonicalOrder> = request
        .order_by
        .iter()
        .map(|o: &OrderBy| CanonicalOrder {
            field: &o.field,
            direction: o.direction,
        })
        .collect();

    let canonical = Canonical {
        dataset_id: &request.dataset,
        dimensions,
        metrics,
        filters,
        order_by,
        limit: request.limit,
        offset: request.offset,
        tenant,
        catalog_generation,
    };

    let bytes = serde_json::to_vec(&canonical).expect("canonical query is always serializable");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();

    let mut truncated = [0u8; 16];
    truncated.copy_from_slice(&digest[..16]);
    Fingerprint(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use setu_catalog::FilterOp;

    fn request(dims: &[&str], filters: Vec<Filter>) -> QueryRequest {
        QueryRequest {
            dataset: "orders".into(),
            dimensions: dims.iter().map(|s| s.to_string()).collect(),
            metrics: vec![],
            filters,
            order_by: vec![],
            limit: Some(10),
            offset: 0,
        }
    }

    #[test]
    fn dimension_order_does_not_affect_fingerprint() {
        let a = fingerprint(&request(&["region", "country"], vec![]), "acme", 1);
        let b = fingerprint(&request(&["country", "region"], vec![]), "acme", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn different_tenant_changes_fingerprint() {
        let req = request(&["region"], vec![]);
        let a = fingerprint(&req, "acme", 1);
        let b = fingerprint(&req, "globex", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn in_list_order_does_not_affect_fingerprint() {
        let a = Filter {
            field: "region".into(),
            op: FilterOp::In,
            value: Some(serde_json::json!(["us", "eu"])),
        };
        let b = Filter {
            field: "region".into(),
            op: FilterOp::In,
            value: Some(serde_json::json!(["eu", "us"])),
        };
        let fa = fingerprint(&request(&[], vec![a]), "acme", 1);
        let fb = fingerprint(&request(&[], vec![b]), "acme", 1);
        assert_eq!(fa, fb);
    }

    #[test]
    fn different_catalog_generation_changes_fingerprint() {
        let req = request(&["region"], vec![]);
        let a = fingerprint(&req, "acme", 1);
        let b = fingerprint(&req, "acme", 2);
        assert_ne!(a, b);
    }
}
