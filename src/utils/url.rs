//! Address building: base + optional path + query parameters.

use crate::error::HttpError;
use crate::types::ParameterMap;
use url::Url;

/// Parse a base address, reporting failures as `InvalidAddress`.
pub fn parse_base(base: &str) -> Result<Url, HttpError> {
    Url::parse(base).map_err(|e| HttpError::invalid_address(base, e))
}

/// True when `path` opens with `scheme://`. A `://` that appears only after
/// the first `/`, `?` or `#` belongs to a relative path.
fn is_absolute(path: &str) -> bool {
    let Some(end) = path.find("://") else {
        return false;
    };
    let scheme = &path[..end];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Combine `base`, an optional `path` and `query` into the final address.
///
/// - no path: `base` as-is
/// - absolute address: replaces `base` entirely
/// - otherwise: appended to the base path (a trailing `/` on the base path is
///   dropped first, a missing leading `/` on `path` is added)
///
/// Query pairs are appended after any pairs already present, in map order.
pub fn build_address(
    base: &Url,
    path: Option<&str>,
    query: &ParameterMap,
) -> Result<Url, HttpError> {
    let mut url = match path.map(str::trim).filter(|p| !p.is_empty()) {
        None => base.clone(),
        Some(p) if is_absolute(p) => Url::parse(p).map_err(|e| HttpError::invalid_address(p, e))?,
        Some(p) => {
            let separator = if p.starts_with('/') { "" } else { "/" };
            let combined = format!("{}{separator}{p}", base.path().trim_end_matches('/'));
            let mut joined = base
                .join(&combined)
                .map_err(|e| HttpError::invalid_address(combined.as_str(), e))?;
            if joined.query().is_none()
                && let Some(q) = base.query()
            {
                joined.set_query(Some(q));
            }
            joined
        }
    };

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query.iter() {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
