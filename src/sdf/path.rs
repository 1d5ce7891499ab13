use std::{fmt, result, str::FromStr};

use anyhow::{ensure, Result};

#[inline]
pub fn path(str: impl AsRef<str>) -> Result<Path> {
    Path::new(str.as_ref())
}

/// `SdfPath` implementation.
///
/// # Syntax
/// - A slash ("/") following an identifier is used to introduce a namespace child.
/// - A period (".") following an identifier is used to introduce a property.
/// - A property may also have several non-sequential colons (':') in its name
///   to provide a rudimentary namespace within properties.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    path: String,
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl FromStr for Path {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> result::Result<Path, Self::Err> {
        Ok(Path { path: s.to_string() })
    }
}

impl Path {
    pub fn new(path: &str) -> Result<Self> {
        Path::from_str(path)
    }

    /// The absolute root path `/`.
    #[inline]
    pub fn abs_root() -> Path {
        Path::from_str_unchecked("/")
    }

    fn from_str_unchecked(path: &str) -> Path {
        Path { path: path.to_string() }
    }

    #[inline]
    pub fn is_abs(&self) -> bool {
        self.path.starts_with('/')
    }

    #[inline]
    pub fn is_abs_root(&self) -> bool {
        self.path == "/"
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Append a property name: `/a/b` + `attr` => `/a/b.attr`.
    pub fn append_property(&self, property: &str) -> Result<Path> {
        ensure!(!property.is_empty(), "Property name cannot be empty");
        ensure!(!self.is_property_path(), "Cannot append property to property path {}", self);
        ensure!(!self.is_abs_root(), "Cannot append property to the root path");

        let mut new_path = self.path.clone();
        new_path.push('.');
        new_path.push_str(property);

        Ok(Path { path: new_path })
    }

    /// Append a child prim name: `/a` + `b` => `/a/b`.
    pub fn append_element(&self, element: &str) -> Result<Path> {
        ensure!(!element.is_empty(), "Element name cannot be empty");
        ensure!(!self.is_property_path(), "Cannot append element to property path {}", self);

        let path = if self.is_abs_root() {
            format!("/{element}")
        } else {
            format!("{}/{}", self.path, element)
        };

        Ok(Path { path })
    }

    /// Whether the last path element is a property (`/a/b.attr`).
    pub fn is_property_path(&self) -> bool {
        self.last_segment().contains('.')
    }

    /// Local element name: `b` for `/a/b`, `attr` for `/a/b.attr`, empty for `/`.
    pub fn name(&self) -> &str {
        let segment = self.last_segment();

        match segment.split_once('.') {
            Some((_, property)) => property,
            None => segment,
        }
    }

    /// Owning prim path: `/a/b` for `/a/b.attr`, the path itself otherwise.
    pub fn prim_path(&self) -> Path {
        match self.property_split() {
            Some((prim, _)) => Path::from_str_unchecked(prim),
            None => self.clone(),
        }
    }

    /// Parent path: the prim for a property, the enclosing prim for a prim,
    /// `/` for top level prims and an empty path for the root.
    pub fn parent(&self) -> Path {
        if let Some((prim, _)) = self.property_split() {
            return Path::from_str_unchecked(prim);
        }

        match self.path.rfind('/') {
            Some(0) if self.path.len() > 1 => Path::abs_root(),
            Some(0) | None => Path::default(),
            Some(pos) => Path::from_str_unchecked(&self.path[..pos]),
        }
    }

    /// Whether this path is a property of `prim` (`prim` + `.` + name).
    pub fn is_property_of(&self, prim: &Path) -> bool {
        self.property_split()
            .is_some_and(|(owner, _)| owner == prim.as_str())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    fn last_segment(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((_, after)) => after,
            None => &self.path,
        }
    }

    fn property_split(&self) -> Option<(&str, &str)> {
        let prim_len = self.path.len() - self.last_segment().len();
        let dot = self.last_segment().find('.')?;

        Some(self.path.split_at(prim_len + dot)).map(|(prim, rest)| (prim, &rest[1..]))
    }
}

impl TryFrom<&str> for Path {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> result::Result<Path, Self::Error> {
        Path::from_str(s)
    }
}

impl TryFrom<String> for Path {
    type Error = anyhow::Error;

    fn try_from(value: String) -> result::Result<Self, Self::Error> {
        Ok(Path { path: value })
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_property() {
        let base = Path::new("/foo").unwrap();

        let prop = base.append_property("points").unwrap();
        assert_eq!(prop.as_str(), "/foo.points");
        assert!(prop.is_property_path());

        let prop = base.append_property("inputs:diffuseColor").unwrap();
        assert_eq!(prop.as_str(), "/foo.inputs:diffuseColor");
        assert!(prop.is_property_path());

        assert!(prop.append_property("bar").is_err());
        assert!(Path::abs_root().append_property("bar").is_err());
        assert!(base.append_property("").is_err());
    }

    #[test]
    fn test_append_element() {
        let root = Path::abs_root();

        let a = root.append_element("a").unwrap();
        assert_eq!(a.as_str(), "/a");

        let b = a.append_element("b").unwrap();
        assert_eq!(b.as_str(), "/a/b");
        assert!(!b.is_property_path());

        let prop = b.append_property("attr").unwrap();
        assert!(prop.append_element("c").is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(path("/").unwrap().name(), "");
        assert_eq!(path("/World").unwrap().name(), "World");
        assert_eq!(path("/World/Mesh").unwrap().name(), "Mesh");
        assert_eq!(path("/World/Mesh.points").unwrap().name(), "points");
        assert_eq!(path("/World/Mesh.material:binding").unwrap().name(), "material:binding");
    }

    #[test]
    fn test_parent() {
        assert_eq!(path("/World/Mesh.points").unwrap().parent().as_str(), "/World/Mesh");
        assert_eq!(path("/World/Mesh").unwrap().parent().as_str(), "/World");
        assert_eq!(path("/World").unwrap().parent().as_str(), "/");
        assert!(Path::abs_root().parent().is_empty());
    }

    #[test]
    fn test_prim_path() {
        let prop = path("/World/Looks/Mat.outputs:surface").unwrap();
        assert_eq!(prop.prim_path().as_str(), "/World/Looks/Mat");

        let prim = path("/World/Looks/Mat").unwrap();
        assert_eq!(prim.prim_path(), prim);
    }

    #[test]
    fn test_is_property_of() {
        let prim = path("/World/Mesh").unwrap();

        assert!(path("/World/Mesh.points").unwrap().is_property_of(&prim));
        assert!(!path("/World/Mesh2.points").unwrap().is_property_of(&prim));
        assert!(!path("/World/Mesh/Child").unwrap().is_property_of(&prim));
        assert!(!prim.is_property_of(&prim));
    }
}
