//! Query-string canonicalization
//!
//! Two of the signing schemes hash the query string with parameters sorted
//! by key. Building the transmitted query from the same canonical form keeps
//! the signed text and the sent text identical.

use std::collections::BTreeMap;

/// Sort parameters by key and join them as `k1=v1&k2=v2`
///
/// A key given twice keeps its last value. Values are used as-is: every
/// parameter this crate sends is plain ASCII.
pub fn canonical_query<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sorted: BTreeMap<&str, &str> = params
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Split a configured query variant (`a=1&b=2`) into parameter pairs
pub fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.trim()
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
