// Copyright (c) 2016-2021 Fabian Schuiki

//! A global source file table that assigns an opaque ID to each processed
//! source file. This helps keeping source locations lean and allows for
//! simple querying of information.
//!
//! Contents are served as raw bytes. The lexer is byte-addressed and must be
//! able to inspect byte order marks, stray control bytes, and invalid UTF-8
//! sequences, so no encoding is assumed at this layer.

use crate::name::RcStr;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

pub const INVALID_SOURCE: Source = Source(0);
pub const INVALID_LOCATION: Location = Location {
    source: INVALID_SOURCE,
    offset: 0,
};
pub const INVALID_SPAN: Span = Span {
    source: INVALID_SOURCE,
    begin: 0,
    end: 0,
};

/// An opaque handle to a source file registered with the source manager.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Source(pub u32);

impl Source {
    /// Return the path of this source file.
    pub fn get_path(self) -> RcStr {
        get_source_manager().with(self, |x| x.path.clone())
    }

    /// Access the contents of this source file.
    pub fn get_content(self) -> Rc<Vec<u8>> {
        get_source_manager().with(self, |x| x.content.clone())
    }

    /// Copy a range of the source content into a String owned by the caller,
    /// replacing invalid UTF-8 sequences.
    pub fn extract(self, begin: usize, end: usize) -> String {
        get_source_manager().with(self, |x| {
            String::from_utf8_lossy(&x.content[begin..end]).into_owned()
        })
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 > 0 {
            write!(f, "Source({}; \"{}\")", self.0, self.get_path())
        } else {
            write!(f, "Source(INVALID)")
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.get_path(), f)
    }
}

/// A single registered source file.
struct SourceFile {
    path: RcStr,
    content: Rc<Vec<u8>>,
}

/// A manager for source files and their assigned IDs.
pub struct SourceManager {
    map: RefCell<HashMap<RcStr, Source>>,
    vect: RefCell<Vec<SourceFile>>,
}

impl SourceManager {
    fn new() -> SourceManager {
        SourceManager {
            map: RefCell::new(HashMap::new()),
            vect: RefCell::new(Vec::new()),
        }
    }

    fn with<F, R>(&self, id: Source, f: F) -> R
    where
        F: FnOnce(&SourceFile) -> R,
    {
        let ref vect = *self.vect.borrow();
        assert!(id.0 > 0, "invalid source");
        assert!(
            (id.0 as usize - 1) < vect.len(),
            "unknown source file: Source({}) >= {}",
            id.0,
            vect.len()
        );
        f(&vect[id.0 as usize - 1])
    }

    /// Try to find an already registered file.
    pub fn find<Q: ?Sized>(&self, filename: &Q) -> Option<Source>
    where
        RcStr: Borrow<Q>,
        Q: Eq + Hash,
    {
        (*self.map.borrow()).get(filename).map(|v| *v)
    }

    /// Register a file with the given contents and return its id. Future
    /// calls to `find()` with the same filename yield the same id.
    pub fn add(&self, filename: &str, content: &str) -> Source {
        self.add_bytes(filename, content.as_bytes().to_vec())
    }

    /// Register a file from raw bytes. Contents need not be valid UTF-8.
    pub fn add_bytes(&self, filename: &str, content: Vec<u8>) -> Source {
        let mut map = self.map.borrow_mut();
        let mut vect = self.vect.borrow_mut();
        let new_id = Source(vect.len() as u32 + 1);
        let v = RcStr::new(filename);
        map.insert(v.clone(), new_id);
        vect.push(SourceFile {
            path: v,
            content: Rc::new(content),
        });
        new_id
    }
}

/// Get this thread's current source manager.
pub fn get_source_manager() -> Rc<SourceManager> {
    thread_local!(static MNG: Rc<SourceManager> = Rc::new(SourceManager::new()));
    MNG.with(|x| x.clone())
}

/// A byte offset into a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub source: Source,
    pub offset: usize,
}

impl Location {
    pub fn new(source: Source, offset: usize) -> Location {
        Location { source, offset }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}:{}", self.source, self.offset)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.offset)
    }
}

/// A range of bytes in a source file, covering `begin` up to but not
/// including `end`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub source: Source,
    pub begin: usize,
    pub end: usize,
}

impl Span {
    /// Create a new span from two byte offsets.
    pub fn new(source: Source, begin: usize, end: usize) -> Span {
        assert!(begin <= end);
        Span { source, begin, end }
    }

    /// Create a new span that covers two spans, and everything in between.
    pub fn union<S: Into<Span>>(a: S, b: S) -> Span {
        let sa = a.into();
        let sb = b.into();
        assert_eq!(sa.source, sb.source, "spans of different sources");
        Span {
            source: sa.source,
            begin: std::cmp::min(sa.begin, sb.begin),
            end: std::cmp::max(sa.end, sb.end),
        }
    }

    /// Modify this span to also cover `other`.
    pub fn expand<S: Into<Span>>(&mut self, other: S) -> &mut Self {
        let o = other.into();
        self.begin = std::cmp::min(self.begin, o.begin);
        self.end = std::cmp::max(self.end, o.end);
        self
    }

    /// Return the location just before the first byte covered by this span.
    pub fn begin(&self) -> Location {
        Location {
            source: self.source,
            offset: self.begin,
        }
    }

    /// Return the location just after the last byte covered by this span.
    pub fn end(&self) -> Location {
        Location {
            source: self.source,
            offset: self.end,
        }
    }

    /// Copy the covered bytes into a String, replacing invalid UTF-8.
    pub fn extract(&self) -> String {
        self.source.extract(self.begin, self.end)
    }
}

impl From<Location> for Span {
    fn from(loc: Location) -> Span {
        Span {
            source: loc.source,
            begin: loc.offset,
            end: loc.offset,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}:{}-{}", self.source, self.begin, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}-{}", self.source, self.begin, self.end)
    }
}

/// A wrapper that associates a span with a value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Wrap a given value together with the span it covers.
    pub fn new(value: T, span: Span) -> Spanned<T> {
        Spanned { value, span }
    }

    /// Map the value, preserving the span.
    pub fn map<F, U>(self, f: F) -> Spanned<U>
    where
        F: FnOnce(T) -> U,
    {
        Spanned {
            value: f(self.value),
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry() {
        let sm = SourceManager::new();
        let a = sm.add("test.sv", "module foo; endmodule");
        assert_eq!(sm.find("test.sv"), Some(a));
        assert_eq!(sm.find("other.sv"), None);
    }

    #[test]
    fn span_extract() {
        let sm = get_source_manager();
        let src = sm.add("span_extract.sv", "wire [3:0] bus;");
        let sp = Span::new(src, 5, 10);
        assert_eq!(sp.extract(), "[3:0]");
    }

    #[test]
    fn span_union() {
        let sm = get_source_manager();
        let src = sm.add("span_union.sv", "abcdef");
        let a = Span::new(src, 1, 2);
        let b = Span::new(src, 4, 6);
        let u = Span::union(a, b);
        assert_eq!((u.begin, u.end), (1, 6));
    }

    #[test]
    fn raw_bytes() {
        let sm = get_source_manager();
        let src = sm.add_bytes("raw.sv", vec![0xfe, 0xff, b' ']);
        assert_eq!(&*src.get_content(), &vec![0xfe, 0xff, b' ']);
    }
}
