//! Static LL(1) parse table (C4).
//!
//! Grammar (terminals quoted, `ACT_*` are semantic actions dispatched by
//! the builder, `α` is any literal `Char` token):
//!
//! ```text
//! E   → T E'
//! E'  → '|' T ACT_OR E'              | ε          follow {')', '#'}
//! T   → T1 T'
//! T'  → T1 ACT_UNION T'              | ε          follow {'|', ')', '#'}
//! T1  → F R
//! R   → '*' ACT_REP | '+' ACT_ONE_OR | '?' ACT_ZERO_ONE
//!     | ACT_REP_FOR (on lookahead '{', note: '{' itself is *not* shifted
//!       here, ACT_REP_FOR consumes it directly so it can keep reading
//!       raw digit/comma tokens past the point the table can describe)
//!     | ε                                          follow {'|','(',')','#','.','[',α}
//! F   → '(' E ')' | ACT_ALPHA (α) | ACT_ANY_ALPHA ('.') | ACT_RANGE ('[')
//! ```

use crate::token::{Sign, Token};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NonTerminal {
    E,
    EPrime,
    T,
    TPrime,
    T1,
    R,
    F,
}

/// The nine NFA-construction actions (C6). Each is dispatched with the
/// fragment stack and current lookahead available; `RepFor` additionally
/// drives the lexer directly to read its `{m,n}` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuilderAction {
    Alpha,
    AnyAlpha,
    Range,
    Union,
    Or,
    Rep,
    OneOr,
    ZeroOne,
    RepFor,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Sym {
    NonTerm(NonTerminal),
    Term(Sign),
    Action(BuilderAction),
}

fn starts_e_t_f(tok: &Token) -> bool {
    matches!(
        tok,
        Token::Char(_)
            | Token::Sign(Sign::LeftParen)
            | Token::Sign(Sign::Dot)
            | Token::Sign(Sign::LeftBracket)
    )
}

/// Returns the right-hand side for `nt` given lookahead `tok`, or a parse
/// error if no production applies. The returned symbols are in left-to-right
/// order; the caller pushes them onto its stack in reverse.
pub(crate) fn production(
    nt: NonTerminal,
    tok: &Token,
    offset: usize,
) -> Result<Vec<Sym>, Error> {
    use BuilderAction::*;
    use NonTerminal::*;
    use Sym::*;

    let unexpected = || Error::Parse {
        offset,
        reason: "unexpected token",
    };

    match nt {
        E => {
            if starts_e_t_f(tok) {
                Ok(vec![NonTerm(T), NonTerm(EPrime)])
            } else {
                Err(unexpected())
            }
        }
        EPrime => match tok {
            Token::Sign(Sign::Or) => Ok(vec![
                Term(Sign::Or),
                NonTerm(T),
                Action(Or),
                NonTerm(EPrime),
            ]),
            Token::Sign(Sign::RightParen) | Token::Sign(Sign::End) => Ok(vec![]),
            _ => Err(unexpected()),
        },
        T => {
            if starts_e_t_f(tok) {
                Ok(vec![NonTerm(T1), NonTerm(TPrime)])
            } else {
                Err(unexpected())
            }
        }
        TPrime => {
            if starts_e_t_f(tok) {
                Ok(vec![NonTerm(T1), Action(Union), NonTerm(TPrime)])
            } else {
                match tok {
                    Token::Sign(Sign::Or) | Token::Sign(Sign::RightParen) | Token::Sign(Sign::End) => {
                        Ok(vec![])
                    }
                    _ => Err(unexpected()),
                }
            }
        }
        T1 => {
            if starts_e_t_f(tok) {
                Ok(vec![NonTerm(F), NonTerm(R)])
            } else {
                Err(unexpected())
            }
        }
        R => match tok {
            Token::Sign(Sign::Star) => Ok(vec![Term(Sign::Star), Action(Rep)]),
            Token::Sign(Sign::Plus) => Ok(vec![Term(Sign::Plus), Action(OneOr)]),
            Token::Sign(Sign::Question) => Ok(vec![Term(Sign::Question), Action(ZeroOne)]),
            Token::Sign(Sign::LeftBrace) => Ok(vec![Action(RepFor)]),
            Token::Sign(Sign::Or)
            | Token::Sign(Sign::LeftParen)
            | Token::Sign(Sign::RightParen)
            | Token::Sign(Sign::End)
            | Token::Sign(Sign::Dot)
            | Token::Sign(Sign::LeftBracket) => Ok(vec![]),
            Token::Char(_) => Ok(vec![]),
            _ => Err(unexpected()),
        },
        F => match tok {
            Token::Char(_) => Ok(vec![Action(Alpha)]),
            Token::Sign(Sign::LeftParen) => {
                Ok(vec![Term(Sign::LeftParen), NonTerm(E), Term(Sign::RightParen)])
            }
            Token::Sign(Sign::Dot) => Ok(vec![Action(AnyAlpha)]),
            Token::Sign(Sign::LeftBracket) => Ok(vec![Action(Range)]),
            _ => Err(unexpected()),
        },
    }
}
