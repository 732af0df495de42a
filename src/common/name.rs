// Copyright (c) 2016-2021 Fabian Schuiki

//! A name table that internalizes all strings presented to it and allows them
//! to be referred to by a lightweight tag. Heavily inspired by the interner
//! used in the Rust compiler.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;

/// A name is a lightweight 32 bit tag that refers to a string in a name
/// table. During lexing, encountered strings are inserted into the name table
/// and only the corresponding tag is kept in the token.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(pub u32);

impl Name {
    /// Return the string representation of this name.
    pub fn as_str(self) -> RcStr {
        get_name_table().get(self)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self, self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.as_str(), f)
    }
}

/// A reference-counted string that acts like a regular str slice, hiding the
/// fact that it is wrapped in an `Rc`.
#[derive(Clone, PartialEq, Hash, PartialOrd)]
pub struct RcStr(Rc<String>);

impl RcStr {
    /// Create a new ref-counted string which is a copy of `value`.
    pub fn new<S: AsRef<str>>(value: S) -> RcStr {
        RcStr(Rc::new(value.as_ref().to_string()))
    }
}

impl Eq for RcStr {}

impl Ord for RcStr {
    fn cmp(&self, other: &RcStr) -> Ordering {
        self[..].cmp(&other[..])
    }
}

impl fmt::Debug for RcStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self[..].fmt(f)
    }
}

impl fmt::Display for RcStr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self[..].fmt(f)
    }
}

impl Borrow<str> for RcStr {
    fn borrow(&self) -> &str {
        &self.0[..]
    }
}

impl Deref for RcStr {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0[..]
    }
}

/// A lookup table of names. SystemVerilog identifiers are case sensitive, so
/// the table interns verbatim. Allows for bidirectional lookup, i.e. by
/// string or by assigned name.
pub struct NameTable {
    map: RefCell<HashMap<RcStr, Name>>,
    vect: RefCell<Vec<RcStr>>,
}

impl NameTable {
    /// Create a new empty name table.
    pub fn new() -> NameTable {
        NameTable {
            map: RefCell::new(HashMap::new()),
            vect: RefCell::new(Vec::new()),
        }
    }

    /// Obtain a name for a string. This either inserts the string into the
    /// table and returns the new name, or returns the existing name if the
    /// string is already present.
    pub fn intern(&self, value: &str) -> Name {
        let mut map = self.map.borrow_mut();
        if let Some(&idx) = map.get(value) {
            return idx;
        }
        let mut vect = self.vect.borrow_mut();
        let new_idx = Name(vect.len() as u32);
        let v = RcStr::new(value);
        map.insert(v.clone(), new_idx);
        vect.push(v);
        new_idx
    }

    /// Retrieve the string given a name tag.
    pub fn get(&self, idx: Name) -> RcStr {
        (*self.vect.borrow())[idx.0 as usize].clone()
    }

    /// Try to find a string.
    pub fn find<Q: ?Sized>(&self, value: &Q) -> Option<Name>
    where
        RcStr: Borrow<Q>,
        Q: Eq + Hash,
    {
        (*self.map.borrow()).get(value).map(|v| *v)
    }
}

/// Get this thread's current name table.
pub fn get_name_table() -> Rc<NameTable> {
    thread_local!(static TBL: Rc<NameTable> = Rc::new(NameTable::new()));
    TBL.with(|x| x.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable() {
        let tbl = NameTable::new();
        let a = tbl.intern("foo");
        let b = tbl.intern("bar");
        let c = tbl.intern("foo");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(&*tbl.get(a), "foo");
        assert_eq!(&*tbl.get(b), "bar");
    }

    #[test]
    fn case_sensitive() {
        let tbl = NameTable::new();
        assert_ne!(tbl.intern("Clk"), tbl.intern("clk"));
    }

    #[test]
    fn find_interned() {
        let tbl = NameTable::new();
        let a = tbl.intern("net1");
        assert_eq!(tbl.find("net1"), Some(a));
        assert_eq!(tbl.find("net2"), None);
    }
}
