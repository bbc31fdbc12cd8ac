//! Thompson-NFA simulation (C7): parallel epsilon-closure evaluation with a
//! visited bitmap, so no single input can blow up the state set the way a
//! naive backtracking matcher would.

use crate::nfa::{Kind, State, StateId};

pub(crate) struct Program {
    pub(crate) states: Vec<State>,
    pub(crate) start: StateId,
    pub(crate) accept: StateId,
}

impl Program {
    /// Anchored match: does the *entire* input satisfy the pattern?
    /// Mirrors `Basic_regex_match::match_for`.
    pub(crate) fn match_in<U>(
        &self,
        input: &[u8],
        mut success: impl FnMut(usize) -> U,
        mut failure: impl FnMut(usize) -> U,
    ) -> U {
        let mut visited = vec![false; self.states.len()];
        let mut closure = Vec::new();
        self.closure(&[self.start], &mut visited, &mut closure);

        let mut next = Vec::new();
        for (i, &b) in input.iter().enumerate() {
            self.step(&closure, b, &mut next);
            if next.is_empty() {
                return failure(i);
            }
            visited.iter_mut().for_each(|v| *v = false);
            self.closure(&next, &mut visited, &mut closure);
        }

        if closure.contains(&self.accept) {
            success(input.len())
        } else {
            failure(input.len())
        }
    }

    /// Longest-prefix search: the largest `k` such that `input[..k]`
    /// satisfies the pattern, or failure if no such `k > 0` exists.
    /// Mirrors `Basic_regex_match::search_for`.
    pub(crate) fn search_in<U>(
        &self,
        input: &[u8],
        mut success: impl FnMut(usize) -> U,
        mut failure: impl FnMut(usize) -> U,
    ) -> U {
        let mut visited = vec![false; self.states.len()];
        let mut closure = Vec::new();
        self.closure(&[self.start], &mut visited, &mut closure);

        let mut last_accept = None;
        let mut next = Vec::new();
        let mut i = 0;
        while i < input.len() {
            self.step(&closure, input[i], &mut next);
            if next.is_empty() {
                break;
            }
            visited.iter_mut().for_each(|v| *v = false);
            self.closure(&next, &mut visited, &mut closure);
            i += 1;
            if closure.contains(&self.accept) {
                last_accept = Some(i);
            }
        }

        match last_accept {
            Some(pos) => success(pos),
            None => failure(i),
        }
    }

    /// Expands `frontier` by following epsilon edges until no new state is
    /// reached, recording visits in `visited` (sized `states.len()`) to
    /// avoid revisiting a state twice in one closure.
    fn closure(&self, frontier: &[StateId], visited: &mut [bool], out: &mut Vec<StateId>) {
        out.clear();
        let mut stack = Vec::new();
        for &s in frontier {
            if !visited[s as usize] {
                visited[s as usize] = true;
                out.push(s);
                stack.push(s);
            }
        }
        while let Some(s) = stack.pop() {
            for &t in &self.states[s as usize].eps {
                if !visited[t as usize] {
                    visited[t as usize] = true;
                    out.push(t);
                    stack.push(t);
                }
            }
        }
    }

    /// Applies one input byte to every state in `closure`, collecting the
    /// (not yet epsilon-closed) set of states reached.
    fn step(&self, closure: &[StateId], byte: u8, out: &mut Vec<StateId>) {
        out.clear();
        for &s in closure {
            match &self.states[s as usize].kind {
                Kind::Common(map) => {
                    if let Some(&t) = map.get(&byte) {
                        out.push(t);
                    }
                }
                Kind::DotAny(t) => out.push(*t),
                Kind::NegClass { excluded, otherwise } => {
                    if !excluded.contains(&byte) {
                        out.push(*otherwise);
                    }
                }
            }
        }
    }
}
