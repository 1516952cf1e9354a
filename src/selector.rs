//! Pathname-based lookup against a parameter tree.

use crate::parameter::{Aggregate, Parameter};

/// Restricts a [`find`] search to assignments, aggregates, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Assignment,
    Aggregate,
    Either,
}

impl KindFilter {
    fn matches(self, parameter: &Parameter) -> bool {
        match self {
            KindFilter::Either => true,
            KindFilter::Assignment => parameter.as_assignment().is_some(),
            KindFilter::Aggregate => parameter.as_aggregate().is_some(),
        }
    }
}

/// A pathname search, built incrementally. Defaults to case-insensitive,
/// unfiltered, first match.
#[derive(Debug, Clone)]
pub struct Selector {
    pathname: String,
    case_sensitive: bool,
    skip: usize,
    kind: KindFilter,
}

impl Selector {
    #[must_use]
    pub fn new(pathname: impl Into<String>) -> Self {
        Selector {
            pathname: pathname.into(),
            case_sensitive: false,
            skip: 0,
            kind: KindFilter::Either,
        }
    }

    #[must_use]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: KindFilter) -> Self {
        self.kind = kind;
        self
    }

    /// Runs this search against `root`, returning the `(skip + 1)`-th match.
    #[must_use]
    pub fn find<'a>(&self, root: &'a Aggregate) -> Option<&'a Parameter> {
        let segments: Vec<&str> = self.pathname.trim_start_matches('/').split('/').collect();
        let absolute = self.pathname.starts_with('/');
        let mut matches = candidates(root, &segments, absolute, self.case_sensitive)
            .into_iter()
            .filter(|p| self.kind.matches(p));
        matches.nth(self.skip)
    }
}

/// Convenience wrapper over [`Selector`] with every default (case-insensitive,
/// unfiltered, first match) used by [`Aggregate::find`].
pub fn find<'a>(root: &'a Aggregate, pathname: &str) -> Option<&'a Parameter> {
    Selector::new(pathname).find(root)
}

fn names_match(actual: &str, expected: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        actual == expected
    } else {
        actual.eq_ignore_ascii_case(expected)
    }
}

/// Every subtree rooted anywhere under `root` (including `root` itself) whose
/// tail segments match `segments`. Absolute searches require the match to
/// begin at `root`; relative searches try every depth.
fn candidates<'a>(
    root: &'a Aggregate,
    segments: &[&str],
    absolute: bool,
    case_sensitive: bool,
) -> Vec<&'a Parameter> {
    let mut found = Vec::new();
    if absolute {
        match_from(root.children(), segments, case_sensitive, &mut found);
    } else {
        collect_relative(root.children(), segments, case_sensitive, &mut found);
    }
    found
}

fn match_from<'a>(
    siblings: &'a [Parameter],
    segments: &[&str],
    case_sensitive: bool,
    found: &mut Vec<&'a Parameter>,
) {
    let (head, rest) = match segments.split_first() {
        Some(pair) => pair,
        None => return,
    };
    for child in siblings {
        if !names_match(child.name(), head, case_sensitive) {
            continue;
        }
        if rest.is_empty() {
            found.push(child);
        } else if let Some(agg) = child.as_aggregate() {
            match_from(agg.children(), rest, case_sensitive, found);
        }
    }
}

fn collect_relative<'a>(
    siblings: &'a [Parameter],
    segments: &[&str],
    case_sensitive: bool,
    found: &mut Vec<&'a Parameter>,
) {
    match_from(siblings, segments, case_sensitive, found);
    for child in siblings {
        if let Some(agg) = child.as_aggregate() {
            collect_relative(agg.children(), segments, case_sensitive, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::{AggregateKind, Assignment};
    use crate::value::Value;

    fn sample_tree() -> Aggregate {
        let mut root = Aggregate::root();
        let mut image = Aggregate::new(AggregateKind::Object, "IMAGE");
        image.append(Parameter::Assignment(Assignment::new(
            "LINES",
            Value::integer(100),
        )));
        image.append(Parameter::Assignment(Assignment::new(
            "LINE_SAMPLES",
            Value::integer(200),
        )));
        root.append(Parameter::Aggregate(image));
        root.append(Parameter::Assignment(Assignment::new(
            "RECORD_BYTES",
            Value::integer(512),
        )));
        root
    }

    #[test]
    fn absolute_pathname_matches_from_root() {
        let root = sample_tree();
        let found = find(&root, "/IMAGE/LINES").unwrap();
        assert_eq!(found.as_assignment().unwrap().value.as_i128(), Some(100));
    }

    #[test]
    fn relative_pathname_matches_at_any_depth() {
        let root = sample_tree();
        let found = find(&root, "LINE_SAMPLES").unwrap();
        assert_eq!(found.as_assignment().unwrap().value.as_i128(), Some(200));
    }

    #[test]
    fn case_insensitive_by_default() {
        let root = sample_tree();
        assert!(find(&root, "record_bytes").is_some());
        assert!(Selector::new("record_bytes")
            .case_sensitive(true)
            .find(&root)
            .is_none());
    }

    #[test]
    fn kind_filter_and_skip() {
        let mut root = sample_tree();
        root.append(Parameter::Aggregate(Aggregate::new(
            AggregateKind::Group,
            "IMAGE",
        )));
        let second = Selector::new("IMAGE")
            .kind(KindFilter::Aggregate)
            .skip(1)
            .find(&root)
            .unwrap();
        assert_eq!(second.as_aggregate().unwrap().kind, AggregateKind::Group);
    }
}
