//! Positional line diff used by the run comparison view.
//!
//! Lines are compared index by index, not aligned, so one inserted line shifts
//! every later line into a removed/added pair.

/// Upper bound on compared line indices.
pub const MAX_DIFF_LINES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Context,
    Removed,
    Added,
}

impl DiffKind {
    /// Numeric tag: 0 context, -1 removed, +1 added.
    pub fn sign(self) -> i8 {
        match self {
            Self::Context => 0,
            Self::Removed => -1,
            Self::Added => 1,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Context => "  ",
            Self::Removed => "- ",
            Self::Added => "+ ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffKind,
    pub text: String,
}

impl DiffLine {
    fn new(kind: DiffKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }

    pub fn rendered(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.text)
    }
}

pub fn compute(left: &str, right: &str) -> Vec<DiffLine> {
    let left: Vec<&str> = left.split('\n').collect();
    let right: Vec<&str> = right.split('\n').collect();
    let len = left.len().max(right.len()).min(MAX_DIFF_LINES);

    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or("");
        let r = right.get(i).copied().unwrap_or("");
        if l == r {
            out.push(DiffLine::new(DiffKind::Context, l));
            continue;
        }
        if !l.is_empty() {
            out.push(DiffLine::new(DiffKind::Removed, l));
        }
        if !r.is_empty() {
            out.push(DiffLine::new(DiffKind::Added, r));
        }
    }
    out
}

/// `(removed, added)` line counts.
pub fn stats(lines: &[DiffLine]) -> (usize, usize) {
    lines.iter().fold((0, 0), |(rm, add), l| match l.kind {
        DiffKind::Removed => (rm + 1, add),
        DiffKind::Added => (rm, add + 1),
        DiffKind::Context => (rm, add),
    })
}
