//! Parser/builder driver (C6): walks the LL(1) table with an explicit
//! stack mixing nonterminals, terminals, and actions, dispatching each
//! action against a fragment stack to grow the NFA in `NfaStore`.

use std::collections::HashMap;

use crate::grammar::{production, BuilderAction, NonTerminal, Sym};
use crate::lexer::Lexer;
use crate::nfa::{Kind, NfaStore, StateId};
use crate::stream::PatternSource;
use crate::token::{Sign, Token};
use crate::Error;

/// An in-progress piece of the NFA sitting on the builder's operand stack.
/// `SingleChar` defers allocating states for a bare literal until it is
/// either consumed into a larger fragment (as a spliced edge, no new
/// states) or has to stand on its own at the end of parsing.
#[derive(Debug, Clone, Copy)]
enum Fragment {
    SingleChar(u8),
    Mid { first: StateId, last: StateId },
    Complete { first: StateId, last: StateId },
}

impl Fragment {
    fn endpoints(self) -> Option<(StateId, StateId)> {
        match self {
            Fragment::SingleChar(_) => None,
            Fragment::Mid { first, last } | Fragment::Complete { first, last } => {
                Some((first, last))
            }
        }
    }
}

pub(crate) const CLONE_ARRAY_THRESHOLD: usize = 64;

/// Old-state-id -> new-state-id remap used while cloning a fragment. A
/// flat array is cheaper below the threshold; a hash map avoids wasting
/// space once the arena is large, mirroring the array/hash-map split the
/// original source makes for the same purpose.
enum Remap {
    Array(Vec<Option<StateId>>),
    Map(HashMap<StateId, StateId>),
}

impl Remap {
    fn get(&self, id: StateId) -> Option<StateId> {
        match self {
            Remap::Array(v) => v.get(id as usize).copied().flatten(),
            Remap::Map(m) => m.get(&id).copied(),
        }
    }

    fn insert(&mut self, id: StateId, new: StateId) {
        match self {
            Remap::Array(v) => {
                if id as usize >= v.len() {
                    v.resize(id as usize + 1, None);
                }
                v[id as usize] = Some(new);
            }
            Remap::Map(m) => {
                m.insert(id, new);
            }
        }
    }
}

pub(crate) struct Builder<S> {
    lexer: Lexer<S>,
    nfa: NfaStore,
    stack: Vec<Fragment>,
    tok: Token,
}

impl<S: PatternSource> Builder<S> {
    pub(crate) fn compile(source: S) -> Result<(Vec<crate::nfa::State>, StateId, StateId), Error> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        let mut builder = Builder {
            lexer,
            nfa: NfaStore::new(),
            stack: Vec::new(),
            tok,
        };
        builder.run()?;
        if builder.tok != Token::Sign(Sign::End) {
            return Err(Error::Parse {
                offset: builder.lexer.offset(),
                reason: "trailing input after a complete pattern",
            });
        }
        if builder.stack.len() != 1 {
            return Err(Error::BuilderInvariant {
                reason: "parse completed without exactly one fragment on the stack",
            });
        }
        let frag = builder.stack.pop().unwrap();
        let (start, accept) = builder.materialize(frag);
        Ok((builder.nfa.into_states(), start, accept))
    }

    fn run(&mut self) -> Result<(), Error> {
        let mut syms: Vec<Sym> = vec![Sym::NonTerm(NonTerminal::E)];
        while let Some(sym) = syms.pop() {
            match sym {
                Sym::NonTerm(nt) => {
                    let rhs = production(nt, &self.tok, self.lexer.offset())?;
                    syms.extend(rhs.into_iter().rev());
                }
                Sym::Term(sign) => {
                    if self.tok != Token::Sign(sign) {
                        return Err(Error::Parse {
                            offset: self.lexer.offset(),
                            reason: "terminal mismatch",
                        });
                    }
                    self.tok = self.lexer.next_token()?;
                }
                Sym::Action(act) => self.dispatch(act)?,
            }
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Fragment, Error> {
        self.stack.pop().ok_or(Error::BuilderInvariant {
            reason: "action fired with an empty fragment stack",
        })
    }

    fn dispatch(&mut self, act: BuilderAction) -> Result<(), Error> {
        use BuilderAction::*;
        match act {
            Alpha => self.act_alpha(),
            AnyAlpha => self.act_any_alpha(),
            Range => self.act_range(),
            Union => self.act_union(),
            Or => self.act_or(),
            Rep => self.act_rep(),
            OneOr => self.act_one_or(),
            ZeroOne => self.act_zero_one(),
            RepFor => self.act_rep_for(),
        }
    }

    /// Turns a fragment into concrete (first, last) states, allocating the
    /// two states a bare `SingleChar` was deferring.
    fn materialize(&mut self, frag: Fragment) -> (StateId, StateId) {
        match frag {
            Fragment::SingleChar(b) => {
                let q0 = self.nfa.alloc();
                let q1 = self.nfa.alloc();
                self.nfa.add_edge(q0, b, q1).expect("fresh state");
                (q0, q1)
            }
            Fragment::Mid { first, last } | Fragment::Complete { first, last } => (first, last),
        }
    }

    // ---- literal / class actions -------------------------------------

    fn act_alpha(&mut self) -> Result<(), Error> {
        let b = match self.tok {
            Token::Char(b) => b,
            _ => {
                return Err(Error::BuilderInvariant {
                    reason: "ACT_ALPHA fired without a pending literal",
                })
            }
        };
        self.stack.push(Fragment::SingleChar(b));
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn act_any_alpha(&mut self) -> Result<(), Error> {
        let q0 = self.nfa.alloc();
        let q1 = self.nfa.alloc();
        self.nfa.mark_dot(q0, q1);
        self.stack.push(Fragment::Mid { first: q0, last: q1 });
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    /// `[...]` / `[^...]` character classes.
    fn act_range(&mut self) -> Result<(), Error> {
        let q0 = self.nfa.alloc();
        let q1 = self.nfa.alloc();
        self.tok = self.lexer.next_token()?;

        let negated = self.tok == Token::Sign(Sign::Caret);
        if negated {
            self.nfa.mark_neg(q0, q1);
            self.tok = self.lexer.next_token()?;
        }

        let add_member = |this: &mut Self, b: u8| -> Result<(), Error> {
            if negated {
                this.nfa.add_excluded(q0, b)
            } else {
                this.nfa.add_edge(q0, b, q1)
            }
        };

        loop {
            let a = match self.tok {
                Token::Char(b) => b,
                _ => {
                    return Err(Error::Parse {
                        offset: self.lexer.offset(),
                        reason: "expected a character class member",
                    })
                }
            };
            add_member(self, a)?;
            self.tok = self.lexer.next_token()?;

            match self.tok {
                Token::Sign(Sign::RightBracket) => break,
                Token::Sign(Sign::Minus) => {
                    self.tok = self.lexer.next_token()?;
                    let z = match self.tok {
                        Token::Char(b) if b > a => b,
                        _ => {
                            return Err(Error::Parse {
                                offset: self.lexer.offset(),
                                reason: "invalid character range endpoint",
                            })
                        }
                    };
                    for b in (a + 1)..=z {
                        add_member(self, b)?;
                    }
                    self.tok = self.lexer.next_token()?;
                }
                Token::Char(_) => {}
                _ => {
                    return Err(Error::Parse {
                        offset: self.lexer.offset(),
                        reason: "unterminated character class",
                    })
                }
            }
        }
        self.tok = self.lexer.next_token()?; // consume ']'
        self.stack.push(Fragment::Mid { first: q0, last: q1 });
        Ok(())
    }

    // ---- concatenation / alternation ---------------------------------

    fn act_union(&mut self) -> Result<(), Error> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let merged = match (lhs, rhs) {
            (Fragment::SingleChar(a), Fragment::SingleChar(b)) => {
                let r = self.nfa.alloc();
                let r1 = self.nfa.alloc();
                let r2 = self.nfa.alloc();
                self.nfa.add_edge(r, a, r1)?;
                self.nfa.add_edge(r1, b, r2)?;
                Fragment::Mid { first: r, last: r2 }
            }
            (Fragment::SingleChar(a), other) => {
                let (ofirst, olast) = other.endpoints().unwrap();
                let s = self.nfa.alloc();
                self.nfa.add_edge(s, a, ofirst)?;
                Fragment::Mid { first: s, last: olast }
            }
            (other, Fragment::SingleChar(a)) => {
                let (ofirst, olast) = other.endpoints().unwrap();
                let s = self.nfa.alloc();
                self.nfa.add_edge(olast, a, s)?;
                Fragment::Mid { first: ofirst, last: s }
            }
            (lhs, rhs) => {
                let (lfirst, llast) = lhs.endpoints().unwrap();
                let (rfirst, rlast) = rhs.endpoints().unwrap();
                self.nfa.add_eps(llast, rfirst);
                let complete = matches!(lhs, Fragment::Complete { .. })
                    && matches!(rhs, Fragment::Complete { .. });
                if complete {
                    Fragment::Complete { first: lfirst, last: rlast }
                } else {
                    Fragment::Mid { first: lfirst, last: rlast }
                }
            }
        };
        self.stack.push(merged);
        Ok(())
    }

    fn act_or(&mut self) -> Result<(), Error> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        let merged = match (lhs, rhs) {
            (Fragment::SingleChar(a), Fragment::SingleChar(b)) => {
                let qs = self.nfa.alloc();
                let qe = self.nfa.alloc();
                self.nfa.add_edge(qs, a, qe)?;
                self.nfa.add_edge(qs, b, qe)?;
                Fragment::Mid { first: qs, last: qe }
            }
            (Fragment::SingleChar(a), Fragment::Complete { first, last })
            | (Fragment::Complete { first, last }, Fragment::SingleChar(a)) => {
                self.nfa.add_edge(first, a, last)?;
                Fragment::Mid { first, last }
            }
            (Fragment::SingleChar(a), other) | (other, Fragment::SingleChar(a)) => {
                let (ofirst, olast) = other.endpoints().unwrap();
                let qs = self.nfa.alloc();
                let qe = self.nfa.alloc();
                self.nfa.add_edge(qs, a, qe)?;
                self.nfa.add_eps(qs, ofirst);
                self.nfa.add_eps(olast, qe);
                Fragment::Mid { first: qs, last: qe }
            }
            (Fragment::Mid { first: f1, last: l1 }, Fragment::Mid { first: f2, last: l2 }) => {
                let qs = self.nfa.alloc();
                let qe = self.nfa.alloc();
                self.nfa.add_eps(qs, f1);
                self.nfa.add_eps(qs, f2);
                self.nfa.add_eps(l1, qe);
                self.nfa.add_eps(l2, qe);
                Fragment::Complete { first: qs, last: qe }
            }
            (Fragment::Mid { first: mfirst, last: mlast }, Fragment::Complete { first, last })
            | (Fragment::Complete { first, last }, Fragment::Mid { first: mfirst, last: mlast }) => {
                self.nfa.add_eps(first, mfirst);
                self.nfa.add_eps(mlast, last);
                Fragment::Complete { first, last }
            }
            (Fragment::Complete { first: f1, last: l1 }, Fragment::Complete { first: f2, last: l2 }) => {
                self.nfa.add_eps(f1, f2);
                self.nfa.add_eps(l2, l1);
                Fragment::Complete { first: f1, last: l1 }
            }
        };
        self.stack.push(merged);
        Ok(())
    }

    // ---- unbounded quantifiers -----------------------------------------

    fn act_rep(&mut self) -> Result<(), Error> {
        // `*`
        self.quantify(true, true)
    }

    fn act_one_or(&mut self) -> Result<(), Error> {
        // `+`
        self.quantify(false, true)
    }

    fn act_zero_one(&mut self) -> Result<(), Error> {
        // `?`
        self.quantify(true, false)
    }

    /// Shared shape of `*`/`+`/`?`: optionally skip the atom (`allow_skip`)
    /// and/or loop back onto it (`allow_loop`).
    fn quantify(&mut self, allow_skip: bool, allow_loop: bool) -> Result<(), Error> {
        let frag = self.pop()?;
        let (first, last) = match frag {
            Fragment::SingleChar(a) => {
                let q0 = self.nfa.alloc();
                let q1 = self.nfa.alloc();
                self.nfa.add_edge(q0, a, q1)?;
                (q0, q1)
            }
            other => other.endpoints().unwrap(),
        };
        if allow_skip {
            self.nfa.add_eps(first, last);
        }
        if allow_loop {
            self.nfa.add_eps(last, first);
        }
        self.stack.push(Fragment::Mid { first, last });
        Ok(())
    }

    // ---- bounded repetition `{m,n}` -------------------------------------

    fn act_rep_for(&mut self) -> Result<(), Error> {
        let (m, n, comma) = self.parse_rep_spec()?;

        match (m, n) {
            (0, Some(1)) => return self.act_zero_one(),
            (0, None) => return self.act_rep(),
            (1, None) => return self.act_one_or(),
            _ => {}
        }

        if !comma {
            if m == 0 {
                return self.epsilon_only(false);
            }
            if m == 1 {
                return self.promote_identity(false);
            }
            return self.general_repeat(m, m, true, false);
        }

        match n {
            None => self.general_repeat(m, m, true, true),
            Some(n) => {
                if m > n && m != 0 && n != 0 {
                    return Err(Error::Parse {
                        offset: self.lexer.offset(),
                        reason: "invalid {m,n} repetition range",
                    });
                }
                if n == 0 {
                    return self.epsilon_only(true);
                }
                if n == 1 {
                    return self.promote_identity(true);
                }
                self.general_repeat(m, n, false, true)
            }
        }
    }

    /// Reads the `{...}` argument. The builder drives the lexer directly
    /// here (rather than through the grammar stack) since digits lex as
    /// plain `Char` tokens with no nonterminal of their own.
    fn parse_rep_spec(&mut self) -> Result<(u32, Option<u32>, bool), Error> {
        // self.tok is still Sign(LeftBrace) on entry.
        self.tok = self.lexer.next_token()?;

        let mut m = 0u32;
        let mut saw_m_digit = false;
        while let Token::Char(b) = self.tok {
            if !b.is_ascii_digit() {
                break;
            }
            saw_m_digit = true;
            m = m * 10 + (b - b'0') as u32;
            self.tok = self.lexer.next_token()?;
        }

        if self.tok == Token::Sign(Sign::Comma) {
            self.tok = self.lexer.next_token()?;
            let mut n = 0u32;
            let mut saw_n_digit = false;
            while let Token::Char(b) = self.tok {
                if !b.is_ascii_digit() {
                    break;
                }
                saw_n_digit = true;
                n = n * 10 + (b - b'0') as u32;
                self.tok = self.lexer.next_token()?;
            }
            if self.tok != Token::Sign(Sign::RightBrace) {
                return Err(Error::Parse {
                    offset: self.lexer.offset(),
                    reason: "malformed {m,n} repetition",
                });
            }
            self.tok = self.lexer.next_token()?;
            let m = if saw_m_digit { m } else { 0 };
            let n = if saw_n_digit { Some(n) } else { None };
            Ok((m, n, true))
        } else if self.tok == Token::Sign(Sign::RightBrace) {
            if !saw_m_digit {
                return Err(Error::Parse {
                    offset: self.lexer.offset(),
                    reason: "empty {} repetition",
                });
            }
            self.tok = self.lexer.next_token()?;
            Ok((m, None, false))
        } else {
            Err(Error::Parse {
                offset: self.lexer.offset(),
                reason: "malformed {m,n} repetition",
            })
        }
    }

    /// `{0}` / `{0,0}`: matches only the empty string, independent of the
    /// atom it was applied to.
    fn epsilon_only(&mut self, complete: bool) -> Result<(), Error> {
        self.pop()?;
        let s0 = self.nfa.alloc();
        let s1 = self.nfa.alloc();
        self.nfa.add_eps(s0, s1);
        self.stack.push(if complete {
            Fragment::Complete { first: s0, last: s1 }
        } else {
            Fragment::Mid { first: s0, last: s1 }
        });
        Ok(())
    }

    /// `{1}` / `{1,1}`: exactly one occurrence, identity up to tagging.
    fn promote_identity(&mut self, complete: bool) -> Result<(), Error> {
        let frag = self.pop()?;
        let (first, last) = self.materialize(frag);
        self.stack.push(if complete {
            Fragment::Complete { first, last }
        } else {
            Fragment::Mid { first, last }
        });
        Ok(())
    }

    /// The general `{m,n}` (or unbounded-beyond-`m`) construction: clone the
    /// atom into `count` consecutive occurrences, link them end to end, and
    /// either wire early-exit edges for the admissible range or, for the
    /// unbounded forms, loop the final occurrence back onto itself.
    fn general_repeat(
        &mut self,
        m: u32,
        count: u32,
        unbounded_tail: bool,
        complete: bool,
    ) -> Result<(), Error> {
        let frag = self.pop()?;
        let unit = self.materialize(frag);

        let count = count as usize;
        let mut entries = Vec::with_capacity(count);
        let mut exits = Vec::with_capacity(count);
        entries.push(unit.0);
        exits.push(unit.1);

        if count > 1 {
            let (clone_entry, clone_exit) = self.clone_fragment(unit.0, unit.1);
            entries.push(clone_entry);
            exits.push(clone_exit);
            for _ in 2..count {
                let (e, x) = self.clone_fragment(entries[1], exits[1]);
                entries.push(e);
                exits.push(x);
            }
        }

        for i in 0..count - 1 {
            self.nfa.add_eps(exits[i], entries[i + 1]);
        }

        let final_exit = exits[count - 1];
        if unbounded_tail {
            self.nfa.add_eps(final_exit, entries[count - 1]);
        } else {
            for idx in (m as usize)..count {
                self.nfa.add_eps(entries[idx], final_exit);
            }
        }

        self.stack.push(if complete {
            Fragment::Complete { first: entries[0], last: final_exit }
        } else {
            Fragment::Mid { first: entries[0], last: final_exit }
        });
        Ok(())
    }

    /// BFS-copies every state reachable from `entry` (via both epsilon and
    /// labeled edges) into fresh arena slots, using a flat remap array
    /// below `CLONE_ARRAY_THRESHOLD` total states and a hash map above it,
    /// the same split the original source makes between its small-array and
    /// large-hash-map remap tables.
    fn clone_fragment(&mut self, entry: StateId, exit: StateId) -> (StateId, StateId) {
        let mut remap = if self.nfa.len() <= CLONE_ARRAY_THRESHOLD {
            Remap::Array(Vec::new())
        } else {
            Remap::Map(HashMap::new())
        };
        self.clone_with_remap(entry, exit, &mut remap)
    }

    fn clone_with_remap(
        &mut self,
        entry: StateId,
        exit: StateId,
        remap: &mut Remap,
    ) -> (StateId, StateId) {
        let mut order = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(entry);
        remap.insert(entry, self.nfa.alloc());
        order.push(entry);
        while let Some(old) = queue.pop_front() {
            let neighbors: Vec<StateId> = {
                let st = self.nfa.state(old);
                let mut v = st.eps.clone();
                match &st.kind {
                    Kind::Common(map) => v.extend(map.values().copied()),
                    Kind::DotAny(t) => v.push(*t),
                    Kind::NegClass { otherwise, .. } => v.push(*otherwise),
                }
                v
            };
            for nb in neighbors {
                if remap.get(nb).is_none() {
                    remap.insert(nb, self.nfa.alloc());
                    order.push(nb);
                    queue.push_back(nb);
                }
            }
        }
        for old in order {
            let new = remap.get(old).unwrap();
            let st = self.nfa.state(old).clone();
            for t in &st.eps {
                self.nfa.add_eps(new, remap.get(*t).unwrap());
            }
            match st.kind {
                Kind::Common(map) => {
                    for (b, t) in map {
                        self.nfa.add_edge(new, b, remap.get(t).unwrap()).expect("fresh clone");
                    }
                }
                Kind::DotAny(t) => self.nfa.mark_dot(new, remap.get(t).unwrap()),
                Kind::NegClass { excluded, otherwise } => {
                    self.nfa.mark_neg(new, remap.get(otherwise).unwrap());
                    for b in excluded {
                        self.nfa.add_excluded(new, b).expect("fresh clone");
                    }
                }
            }
        }
        (remap.get(entry).unwrap(), remap.get(exit).unwrap())
    }
}
