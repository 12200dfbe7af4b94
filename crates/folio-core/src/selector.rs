#![forbid(unsafe_code)]

//! A small CSS selector matcher for the headless page.
//!
//! Supported syntax covers what the behavior layer queries:
//!
//! - selector lists: `.card, .stat-item`
//! - descendant combinator: `.stat-item h3`
//! - compound selectors made of a type (`section`, `*`), ids (`#about`),
//!   classes (`.nav-link`) and attribute tests (`[id]`, `[href="#top"]`)
//!
//! Child/sibling combinators, pseudo-classes and quoted values containing
//! whitespace are rejected at parse time.

use crate::error::FolioError;

/// Read-only view of a tree the matcher can walk.
pub trait SelectorTarget {
    type Node: Copy;

    fn node_tag(&self, node: Self::Node) -> &str;

    fn node_has_class(&self, node: Self::Node, class: &str) -> bool;

    fn node_attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    fn node_parent(&self, node: Self::Node) -> Option<Self::Node>;
}

/// Parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    alternatives: Vec<Complex>,
}

/// Compounds joined by descendant combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

impl SelectorList {
    /// Parse a selector list.
    pub fn parse(input: &str) -> Result<Self, FolioError> {
        let alternatives = input
            .split(',')
            .map(|part| {
                let compounds = part
                    .split_whitespace()
                    .map(parse_compound)
                    .collect::<Result<Vec<_>, _>>()?;
                if compounds.is_empty() {
                    return Err(invalid(input, "empty selector"));
                }
                Ok(Complex { compounds })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    /// Whether `node` matches any alternative.
    pub fn matches<T: SelectorTarget>(&self, tree: &T, node: T::Node) -> bool {
        self.alternatives.iter().any(|c| c.matches(tree, node))
    }
}

impl Complex {
    fn matches<T: SelectorTarget>(&self, tree: &T, node: T::Node) -> bool {
        let Some((last, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(tree, node) {
            return false;
        }
        // Descendant-only chains match greedily from the right.
        let mut cursor = tree.node_parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                match cursor {
                    Some(n) if compound.matches(tree, n) => {
                        cursor = tree.node_parent(n);
                        break;
                    }
                    Some(n) => cursor = tree.node_parent(n),
                    None => return false,
                }
            }
        }
        true
    }
}

impl Compound {
    fn matches<T: SelectorTarget>(&self, tree: &T, node: T::Node) -> bool {
        if let Some(tag) = &self.tag
            && !tree.node_tag(node).eq_ignore_ascii_case(tag)
        {
            return false;
        }
        self.ids
            .iter()
            .all(|id| tree.node_attribute(node, "id") == Some(id.as_str()))
            && self.classes.iter().all(|c| tree.node_has_class(node, c))
            && self.attrs.iter().all(|a| match (&a.value, tree.node_attribute(node, &a.name)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(want), Some(got)) => want == got,
            })
    }
}

fn invalid(input: &str, why: &str) -> FolioError {
    FolioError::InvalidConfig(format!("selector `{input}`: {why}"))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(rest: &str) -> (&str, &str) {
    let end = rest
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(rest.len(), |(i, _)| i);
    rest.split_at(end)
}

fn parse_compound(input: &str) -> Result<Compound, FolioError> {
    let mut compound = Compound::default();
    let mut rest = input;

    if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    } else {
        let (tag, after) = take_ident(rest);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
            rest = after;
        }
    }

    while let Some(c) = rest.chars().next() {
        match c {
            '#' | '.' => {
                let (name, after) = take_ident(&rest[1..]);
                if name.is_empty() {
                    return Err(invalid(input, "missing name"));
                }
                if c == '#' {
                    compound.ids.push(name.to_owned());
                } else {
                    compound.classes.push(name.to_owned());
                }
                rest = after;
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| invalid(input, "unterminated attribute"))?;
                let body = &rest[1..close];
                let test = match body.split_once('=') {
                    Some((name, value)) => AttrTest {
                        name: name.trim().to_owned(),
                        value: Some(value.trim().trim_matches(['"', '\'']).to_owned()),
                    },
                    None => AttrTest {
                        name: body.trim().to_owned(),
                        value: None,
                    },
                };
                if test.name.is_empty() || !test.name.chars().all(is_ident_char) {
                    return Err(invalid(input, "bad attribute name"));
                }
                compound.attrs.push(test);
                rest = &rest[close + 1..];
            }
            _ => return Err(invalid(input, "unsupported syntax")),
        }
    }
    Ok(compound)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat test tree: (tag, classes, attrs, parent).
    struct Tree(Vec<(&'static str, Vec<&'static str>, Vec<(&'static str, &'static str)>, Option<usize>)>);

    impl SelectorTarget for Tree {
        type Node = usize;

        fn node_tag(&self, node: usize) -> &str {
            self.0[node].0
        }

        fn node_has_class(&self, node: usize, class: &str) -> bool {
            self.0[node].1.contains(&class)
        }

        fn node_attribute(&self, node: usize, name: &str) -> Option<&str> {
            self.0[node]
                .2
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
        }

        fn node_parent(&self, node: usize) -> Option<usize> {
            self.0[node].3
        }
    }

    fn tree() -> Tree {
        Tree(vec![
            ("body", vec![], vec![], None),
            ("section", vec!["about"], vec![("id", "about")], Some(0)),
            ("div", vec!["stat-item", "card"], vec![], Some(1)),
            ("h3", vec![], vec![], Some(2)),
            ("a", vec!["nav-link", "active"], vec![("href", "#about")], Some(0)),
            ("section", vec![], vec![], Some(0)),
        ])
    }

    fn m(sel: &str, node: usize) -> bool {
        SelectorList::parse(sel).unwrap().matches(&tree(), node)
    }

    #[test]
    fn simple_selectors() {
        assert!(m("section", 1));
        assert!(m("SECTION", 1));
        assert!(m("#about", 1));
        assert!(m(".nav-link", 4));
        assert!(m("a.nav-link.active", 4));
        assert!(!m("a.nav-link.missing", 4));
        assert!(m("*", 3));
    }

    #[test]
    fn attribute_tests() {
        assert!(m("section[id]", 1));
        assert!(!m("section[id]", 5));
        assert!(m("a[href=\"#about\"]", 4));
        assert!(m("a[href='#about']", 4));
        assert!(!m("a[href=\"#top\"]", 4));
    }

    #[test]
    fn descendant_and_lists() {
        assert!(m(".stat-item h3", 3));
        assert!(m("body .stat-item h3", 3));
        assert!(m("section h3", 3));
        assert!(!m(".nav-link h3", 3));
        assert!(m(".card, .stat-item", 2));
        assert!(m(".nope, h3", 3));
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(SelectorList::parse("div > p").is_err());
        assert!(SelectorList::parse("a:hover").is_err());
        assert!(SelectorList::parse("[href").is_err());
        assert!(SelectorList::parse(".a,").is_err());
        assert!(SelectorList::parse("#").is_err());
    }
}
