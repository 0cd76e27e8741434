use url::Url;

use crate::errors::{CoreError, CoreResult};

/// Resolve a descriptor URI into a fetchable [`Url`].
///
/// Absolute URIs are parsed as-is; relative ones are joined onto `origin`.
/// The fragment is dropped since it never reaches the transport.
pub fn resolve_uri(uri: &str, origin: Option<&Url>) -> CoreResult<Url> {
    let parsed = match Url::parse(uri) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let Some(origin) = origin else {
                return Err(CoreError::UnresolvableUri {
                    uri: uri.to_string(),
                    reason: "relative URI without origin".to_string(),
                });
            };
            origin.join(uri).map_err(|e| CoreError::UnresolvableUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?
        }
        Err(e) => {
            return Err(CoreError::UnresolvableUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let mut canonical = parsed;
    canonical.set_fragment(None);
    Ok(canonical)
}
