/// Captured group spans, indexed by group id: (start, end) offsets into the
/// input. Cloned at every backtracking branch point, so a failed branch
/// never leaks captures into its siblings.
type Captures = Vec<Option<(usize, usize)>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quant {
    One,
    OneOrMore, // +
    ZeroOrOne, // ?
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomKind {
    StartAnchor, // ^
    EndAnchor,   // $
    Literal(u8),
    Digit, // \d
    Word,  // \w
    Dot,   // .
    Class { bytes: Vec<u8>, negated: bool },
    Group { id: usize, alternatives: Vec<Vec<Atom>> },
    BackRef(usize), // \1 .. \9
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub kind: AtomKind,
    pub quant: Quant,
}

impl Atom {
    pub fn new(kind: AtomKind, quant: Quant) -> Self {
        Self { kind, quant }
    }
}

/// A parsed pattern: a sequence of atoms plus the number of capture groups.
/// Immutable after parsing; one `Pattern` can serve any number of
/// `is_match` calls, each of which owns its capture state.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    atoms: Vec<Atom>,
    group_count: usize,
}

impl Pattern {
    pub fn new(atoms: Vec<Atom>, group_count: usize) -> Self {
        Self { atoms, group_count }
    }

    /// True iff some substring of `input` (possibly empty) matches the
    /// whole pattern.
    pub fn is_match(&self, input: &[u8]) -> bool {
        if matches!(
            self.atoms.first(),
            Some(Atom { kind: AtomKind::StartAnchor, .. })
        ) {
            return self.match_from(input, 0);
        }

        // The past-the-end position is a legal start so that zero-width
        // matches at the end of the input are found.
        (0..=input.len()).any(|start| self.match_from(input, start))
    }

    fn match_from(&self, input: &[u8], start: usize) -> bool {
        let captures = vec![None; self.group_count + 1]; // ids are 1-based
        match_sequence(&self.atoms, 0, input, start, &captures)
    }
}

/// Matches `atoms[idx..]` against `input[pos..]` by greedy depth-first
/// backtracking, returning true on the first success.
fn match_sequence(
    atoms: &[Atom],
    idx: usize,
    input: &[u8],
    pos: usize,
    captures: &Captures,
) -> bool {
    if idx == atoms.len() {
        return true;
    }

    let atom = &atoms[idx];
    match atom.quant {
        Quant::One => advance_one(atom, input, pos, captures)
            .into_iter()
            .any(|(next, caps)| match_sequence(atoms, idx + 1, input, next, &caps)),
        Quant::ZeroOrOne => {
            // Greedy: take one occurrence first, then try skipping.
            advance_one(atom, input, pos, captures)
                .into_iter()
                .any(|(next, caps)| match_sequence(atoms, idx + 1, input, next, &caps))
                || match_sequence(atoms, idx + 1, input, pos, captures)
        }
        Quant::OneOrMore => reachable_repeats(atom, input, pos, captures)
            .into_iter()
            .any(|(next, caps)| match_sequence(atoms, idx + 1, input, next, &caps)),
    }
}

/// One occurrence of a single atom at `pos`: every viable end position,
/// paired with the capture state after that occurrence.
fn advance_one(
    atom: &Atom,
    input: &[u8],
    pos: usize,
    captures: &Captures,
) -> Vec<(usize, Captures)> {
    match &atom.kind {
        AtomKind::StartAnchor => zero_width(pos == 0, pos, captures),
        AtomKind::EndAnchor => zero_width(pos == input.len(), pos, captures),
        AtomKind::Literal(b) => consume_if(input, pos, captures, |byte| byte == *b),
        AtomKind::Digit => consume_if(input, pos, captures, |byte| byte.is_ascii_digit()),
        AtomKind::Word => {
            consume_if(input, pos, captures, |byte| byte.is_ascii_alphanumeric() || byte == b'_')
        }
        AtomKind::Dot => consume_if(input, pos, captures, |_| true),
        AtomKind::Class { bytes, negated } => {
            consume_if(input, pos, captures, |byte| bytes.contains(&byte) != *negated)
        }
        AtomKind::BackRef(id) => match captures.get(*id).copied().flatten() {
            Some((start, end)) => {
                // A zero-length capture succeeds without advancing.
                let captured = &input[start..end];
                if input[pos..].starts_with(captured) {
                    vec![(pos + captured.len(), captures.clone())]
                } else {
                    Vec::new()
                }
            }
            // The group never completed (or does not exist): matches nothing.
            None => Vec::new(),
        },
        AtomKind::Group { id, alternatives } => {
            let mut results = Vec::new();
            for alternative in alternatives {
                for (end, mut caps) in sequence_ends(alternative, 0, input, pos, captures) {
                    caps[*id] = Some((pos, end));
                    results.push((end, caps));
                }
            }
            results
        }
    }
}

fn zero_width(ok: bool, pos: usize, captures: &Captures) -> Vec<(usize, Captures)> {
    if ok {
        vec![(pos, captures.clone())]
    } else {
        Vec::new()
    }
}

fn consume_if(
    input: &[u8],
    pos: usize,
    captures: &Captures,
    pred: impl Fn(u8) -> bool,
) -> Vec<(usize, Captures)> {
    match input.get(pos) {
        Some(&byte) if pred(byte) => vec![(pos + 1, captures.clone())],
        _ => Vec::new(),
    }
}

/// Every end position reachable by matching the whole of `atoms[idx..]`,
/// in greedy preference order. Used to enumerate group alternatives.
fn sequence_ends(
    atoms: &[Atom],
    idx: usize,
    input: &[u8],
    pos: usize,
    captures: &Captures,
) -> Vec<(usize, Captures)> {
    if idx == atoms.len() {
        return vec![(pos, captures.clone())];
    }

    let atom = &atoms[idx];
    let mut ends = Vec::new();
    match atom.quant {
        Quant::One => {
            for (next, caps) in advance_one(atom, input, pos, captures) {
                ends.extend(sequence_ends(atoms, idx + 1, input, next, &caps));
            }
        }
        Quant::ZeroOrOne => {
            for (next, caps) in advance_one(atom, input, pos, captures) {
                ends.extend(sequence_ends(atoms, idx + 1, input, next, &caps));
            }
            ends.extend(sequence_ends(atoms, idx + 1, input, pos, captures));
        }
        Quant::OneOrMore => {
            for (next, caps) in reachable_repeats(atom, input, pos, captures) {
                ends.extend(sequence_ends(atoms, idx + 1, input, next, &caps));
            }
        }
    }
    ends
}

/// Positions reachable by 1, 2, 3… consecutive occurrences of `atom`,
/// longest occurrence count first. Positions are deduplicated across the
/// frontier so an atom that can match the empty string cannot loop.
fn reachable_repeats(
    atom: &Atom,
    input: &[u8],
    pos: usize,
    captures: &Captures,
) -> Vec<(usize, Captures)> {
    let mut seen: Vec<usize> = Vec::new();
    let mut levels: Vec<Vec<(usize, Captures)>> = Vec::new();

    let mut frontier = Vec::new();
    for (next, caps) in advance_one(atom, input, pos, captures) {
        if !seen.contains(&next) {
            seen.push(next);
            frontier.push((next, caps));
        }
    }

    while !frontier.is_empty() {
        let mut discovered = Vec::new();
        for (current, caps) in &frontier {
            for (next, next_caps) in advance_one(atom, input, *current, caps) {
                if !seen.contains(&next) {
                    seen.push(next);
                    discovered.push((next, next_caps));
                }
            }
        }
        levels.push(frontier);
        frontier = discovered;
    }

    levels.into_iter().rev().flatten().collect()
}
