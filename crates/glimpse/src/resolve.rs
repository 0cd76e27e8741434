//! Pure derivation of responsive candidate URIs from a descriptor.

use std::fmt;

use glimpse_core::ResourceDescriptor;

/// Extension of the negotiated alternate encoding.
pub const ALTERNATE_EXTENSION: &str = "webp";
/// `<source type>` value for the alternate encoding.
pub const ALTERNATE_MIME: &str = "image/webp";

/// Base-encoding extensions that get swapped for the alternate one.
const SWAPPABLE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One `uri Nw` candidate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SrcSetEntry {
    pub uri: String,
    pub width: u32,
}

impl fmt::Display for SrcSetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}w", self.uri, self.width)
    }
}

/// Candidates ordered ascending by width.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SrcSet(Vec<SrcSetEntry>);

impl SrcSet {
    pub fn entries(&self) -> &[SrcSetEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SrcSetEntry> {
        self.0.iter()
    }
}

/// Renders the HTML `srcset` attribute value.
impl fmt::Display for SrcSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedSources {
    /// The URI the controller fetches.
    pub primary_src: String,
    pub src_set_primary: SrcSet,
    /// Present only when the alternate encoding is in use.
    pub src_set_alternate: Option<SrcSet>,
}

impl ResolvedSources {
    pub fn alternate_mime(&self) -> Option<&'static str> {
        self.src_set_alternate.as_ref().map(|_| ALTERNATE_MIME)
    }

    pub fn uses_alternate(&self) -> bool {
        self.src_set_alternate.is_some()
    }
}

/// A base URI split into the parts the derivation rewrites.
struct UriParts<'a> {
    /// Everything before the extension dot (or the whole path if none).
    stem: &'a str,
    extension: Option<&'a str>,
    /// Query and/or fragment, including the leading `?` / `#`.
    tail: &'a str,
}

impl<'a> UriParts<'a> {
    fn split(uri: &'a str) -> Self {
        let tail_at = uri.find(['?', '#']).unwrap_or(uri.len());
        let (path, tail) = uri.split_at(tail_at);
        let segment_at = path.rfind('/').map_or(0, |i| i + 1);

        // A leading dot (".hidden") is part of the name, not an extension.
        match path[segment_at..].rfind('.') {
            Some(dot) if dot > 0 && dot + 1 < path.len() - segment_at => Self {
                stem: &path[..segment_at + dot],
                extension: Some(&path[segment_at + dot + 1..]),
                tail,
            },
            _ => Self {
                stem: path,
                extension: None,
                tail,
            },
        }
    }

    fn with_suffix(&self, suffix: &str, extension: Option<&str>) -> String {
        match extension {
            Some(ext) => format!("{}{suffix}.{ext}{}", self.stem, self.tail),
            None => format!("{}{suffix}{}", self.stem, self.tail),
        }
    }
}

fn src_set(parts: &UriParts<'_>, tiers: impl Iterator<Item = u32>, ext: Option<&str>) -> SrcSet {
    SrcSet(
        tiers
            .map(|width| SrcSetEntry {
                uri: parts.with_suffix(&format!("_{width}w"), ext),
                width,
            })
            .collect(),
    )
}

/// Derive the candidate set for `descriptor`.
///
/// Deterministic and side-effect free; safe to call on every entry into
/// `Loading`.
pub fn resolve(descriptor: &ResourceDescriptor, use_alternate_encoding: bool) -> ResolvedSources {
    let base = descriptor.base_uri();
    let parts = UriParts::split(base);
    let tiers = descriptor.density_tiers();

    let src_set_primary = src_set(&parts, tiers.iter(), parts.extension);
    let src_set_alternate =
        use_alternate_encoding.then(|| src_set(&parts, tiers.iter(), Some(ALTERNATE_EXTENSION)));

    let swappable = parts
        .extension
        .is_some_and(|ext| SWAPPABLE_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)));
    let primary_src = if use_alternate_encoding && swappable {
        parts.with_suffix("", Some(ALTERNATE_EXTENSION))
    } else {
        base.to_string()
    };

    ResolvedSources {
        primary_src,
        src_set_primary,
        src_set_alternate,
    }
}
