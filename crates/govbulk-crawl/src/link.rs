use govbulk_fetch::FileDescriptor;
use url::Url;

/// A resolved row link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Link {
    Listing(Url),
    File(FileDescriptor),
}

/// Extension of the last path element, including the dot.
///
/// A path ending in `/` has no extension, and neither does a name whose
/// only dot is in a parent directory.
pub fn extension(path: &str) -> Option<&str> {
    let name = &path[path.rfind('/').map_or(0, |i| i + 1)..];
    name.rfind('.').map(|i| &name[i..])
}

/// Resolves `href` against `base` and decides whether it is a file.
pub fn classify_link(base: &Url, href: &str) -> Result<Link, url::ParseError> {
    let url = base.join(href)?;
    Ok(match extension(url.path()) {
        Some(ext) => {
            let ext = ext.to_string();
            Link::File(FileDescriptor::new(url, ext))
        }
        None => Link::Listing(url),
    })
}
