//! Reader for the textual form of the lowered IR. The format is a flat
//! list of functions, each a list of statements, each a list of postfix
//! tokens ended by a semicolon:
//!
//! ```text
//! fn @fib 1 1
//!   local -4
//!   expr %-4 load 2 lt ifnot.1 ;
//!   ...
//! end
//! ```
//!
//! Globals are spelled `@name`, locals `%ofs`, operators as lowercase
//! words. Width-suffixed operators and label-suffixed control tokens use a
//! dot, as in `set.b` or `goto.3`.

use anyhow::{anyhow, bail, Result};
use logos::Logos;

use super::{Function, Names, Op, Stmt, Tok, Width};

#[derive(Logos, Debug, PartialEq)]
enum RawToken<'src> {
    #[token(";")]
    Semi,

    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*", |lex| &lex.slice()[1..])]
    Ident(&'src str),

    #[regex(r"%-?[0-9]+", |lex| lex.slice()[1..].parse::<i32>().ok())]
    Local(i32),

    #[regex(r"-?[0-9]+u?", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r"[a-z][a-z0-9.]*", |lex| lex.slice())]
    Word(&'src str),

    #[error]
    #[regex(r"[ \t\n\r]+", logos::skip)]
    #[regex(r"#[^\n\r]*", logos::skip)]
    Error,
}

pub fn parse_program(src: &str) -> Result<(Names, Vec<Function>)> {
    let mut names = Names::new();
    let mut functions = Vec::new();

    let toks: Vec<_> = RawToken::lexer(src).collect();
    if let Some(at) = toks.iter().position(|tok| *tok == RawToken::Error) {
        bail!("unreadable input near token {at}");
    }

    let mut toks = toks.into_iter();
    while let Some(tok) = toks.next() {
        match tok {
            RawToken::Word("fn") => {
                let name = match toks.next() {
                    Some(RawToken::Ident(text)) => names.add(text),
                    other => bail!("expected a function name, found {other:?}"),
                };
                let param_min = parse_count(toks.next())?;
                let param_max = parse_count(toks.next())?;
                let body = parse_body(&mut names, &mut toks)?;

                functions.push(Function {
                    name,
                    param_min,
                    param_max,
                    body,
                });
            }

            other => bail!("expected a function, found {other:?}"),
        }
    }

    Ok((names, functions))
}

fn parse_count(tok: Option<RawToken>) -> Result<usize> {
    match tok {
        Some(RawToken::Number(text)) => text
            .parse()
            .map_err(|_| anyhow!("bad parameter count {text:?}")),
        other => bail!("expected a parameter count, found {other:?}"),
    }
}

fn parse_body<'src>(
    names: &mut Names,
    toks: &mut impl Iterator<Item = RawToken<'src>>,
) -> Result<Vec<Stmt>> {
    let mut body = Vec::new();

    loop {
        match toks.next() {
            Some(RawToken::Word("end")) => break,

            Some(RawToken::Word("local")) => match toks.next() {
                Some(RawToken::Number(text)) => {
                    let ofs = text.parse().map_err(|_| anyhow!("bad offset {text:?}"))?;
                    body.push(Stmt::Local(ofs));
                }
                other => bail!("expected an offset after local, found {other:?}"),
            },

            Some(RawToken::Word(word)) if word.starts_with("label.") => {
                body.push(Stmt::Label(parse_suffix(word)?));
            }
            Some(RawToken::Word(word)) if word.starts_with("jump.") => {
                body.push(Stmt::Jump(parse_suffix(word)?));
            }
            Some(RawToken::Word(word)) if word.starts_with("case.") => {
                let label = parse_suffix(word)?;
                match toks.next() {
                    Some(RawToken::Number(text)) => {
                        let value =
                            text.parse().map_err(|_| anyhow!("bad case value {text:?}"))?;
                        body.push(Stmt::JumpIfEqual(value, label));
                    }
                    other => bail!("expected a case value, found {other:?}"),
                }
            }

            Some(RawToken::Word("expr")) => {
                let mut expr = Vec::new();
                loop {
                    match toks.next() {
                        Some(RawToken::Semi) => break,
                        Some(tok) => expr.push(parse_tok(names, tok)?),
                        None => bail!("expression not ended"),
                    }
                }
                body.push(Stmt::Expr(expr));
            }

            other => bail!("expected a statement, found {other:?}"),
        }
    }

    Ok(body)
}

fn parse_tok(names: &mut Names, tok: RawToken) -> Result<Tok> {
    Ok(match tok {
        RawToken::Ident(text) => Tok::Ident(names.add(text)),
        RawToken::Local(ofs) => Tok::LocalOfs(ofs),

        RawToken::Number(text) => match text.strip_suffix('u') {
            Some(digits) => Tok::Uint(
                digits
                    .parse()
                    .map_err(|_| anyhow!("bad unsigned literal {text:?}"))?,
            ),
            None => Tok::Int(text.parse().map_err(|_| anyhow!("bad literal {text:?}"))?),
        },

        RawToken::Word(word) => parse_word(word)?,
        other => bail!("token out of place: {other:?}"),
    })
}

fn parse_word(word: &str) -> Result<Tok> {
    let (base, suffix) = match word.split_once('.') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (word, None),
    };

    // control tokens carry a label or byte count in the suffix
    match base {
        "open" => return Ok(Tok::Open(parse_num_suffix(word, suffix)?)),
        "close" => return Ok(Tok::Close(parse_num_suffix(word, suffix)?)),
        "if" => return Ok(Tok::If(parse_num_suffix(word, suffix)?)),
        "ifnot" => return Ok(Tok::IfNot(parse_num_suffix(word, suffix)?)),
        "goto" => return Ok(Tok::Goto(parse_num_suffix(word, suffix)?)),
        "orskip" => {
            return Ok(Tok::ShortCirc {
                or: true,
                label: parse_num_suffix(word, suffix)?,
            })
        }
        "andskip" => {
            return Ok(Tok::ShortCirc {
                or: false,
                label: parse_num_suffix(word, suffix)?,
            })
        }
        "join" => return Ok(Tok::CircTarget(parse_num_suffix(word, suffix)?)),
        _ => {}
    }

    let width = match suffix {
        None => Width::Word,
        Some("b") => Width::I8,
        Some("ub") => Width::U8,
        Some("h") => Width::I16,
        Some("uh") => Width::U16,
        Some(other) => bail!("unknown width {other:?} in {word:?}"),
    };

    let op = match base {
        "arg" => return Ok(Tok::Comma),
        "ret" => return Ok(Tok::Return),
        "void" => return Ok(Tok::Void),

        "add" => Op::Add,
        "sub" => Op::Sub,
        "mul" => Op::Mul,
        "div" => Op::Div,
        "udiv" => Op::UDiv,
        "mod" => Op::Mod,
        "umod" => Op::UMod,
        "and" => Op::And,
        "xor" => Op::Xor,
        "or" => Op::Or,
        "shl" => Op::Shl,
        "shr" => Op::Shr,
        "ushr" => Op::UShr,

        "lt" => Op::Lt,
        "gt" => Op::Gt,
        "le" => Op::Le,
        "ge" => Op::Ge,
        "ult" => Op::ULt,
        "ugt" => Op::UGt,
        "ule" => Op::ULe,
        "uge" => Op::UGe,
        "eq" => Op::Eq,
        "ne" => Op::Ne,

        "not" => Op::Not,
        "neg" => Op::Neg,
        "plus" => Op::Plus,
        "bool" => Op::Bool,

        "load" => Op::Deref,
        "inc" => Op::Inc,
        "dec" => Op::Dec,
        "incpost" => Op::PostInc,
        "decpost" => Op::PostDec,
        "addpost" => Op::PostAdd,
        "subpost" => Op::PostSub,

        "set" => Op::Assign,
        "setadd" => Op::AssignAdd,
        "setsub" => Op::AssignSub,
        "setmul" => Op::AssignMul,
        "setdiv" => Op::AssignDiv,
        "setudiv" => Op::AssignUDiv,
        "setmod" => Op::AssignMod,
        "setumod" => Op::AssignUMod,
        "setshl" => Op::AssignShl,
        "setshr" => Op::AssignShr,
        "setushr" => Op::AssignUShr,
        "setand" => Op::AssignAnd,
        "setxor" => Op::AssignXor,
        "setor" => Op::AssignOr,

        "seq" => Op::Seq,

        "i8" => Op::CastI8,
        "u8" => Op::CastU8,
        "i16" => Op::CastI16,
        "u16" => Op::CastU16,

        other => bail!("unknown operator {other:?}"),
    };

    Ok(Tok::Op(op, width))
}

fn parse_suffix(word: &str) -> Result<u32> {
    parse_num_suffix(word, word.split_once('.').map(|(_, suffix)| suffix))
}

fn parse_num_suffix<T: std::str::FromStr>(word: &str, suffix: Option<&str>) -> Result<T> {
    suffix
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| anyhow!("missing or bad suffix on {word:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_small_function() {
        let src = "
            # store, then branch on a comparison
            fn @f 1 1
              local -4
              expr 5 %-4 set ;
              expr %-4 load 2 lt ifnot.1 ;
              jump.2
              label.1
              expr %-4 load ret ;
              label.2
            end
        ";

        let (names, functions) = parse_program(src).unwrap();
        assert_eq!(1, functions.len());

        let f = &functions[0];
        assert_eq!("f", names.get(f.name));
        assert_eq!((1, 1), (f.param_min, f.param_max));
        assert_eq!(7, f.body.len());
        assert_eq!(Stmt::Local(-4), f.body[0]);
        assert_eq!(
            Stmt::Expr(vec![Tok::Int(5), Tok::LocalOfs(-4), Tok::Op(Op::Assign, Width::Word)]),
            f.body[1]
        );
        assert_eq!(
            Stmt::Expr(vec![
                Tok::LocalOfs(-4),
                Tok::Op(Op::Deref, Width::Word),
                Tok::Int(2),
                Tok::Op(Op::Lt, Width::Word),
                Tok::IfNot(1),
            ]),
            f.body[2]
        );
        assert_eq!(Stmt::Jump(2), f.body[3]);
    }

    #[test]
    fn parses_calls_widths_and_unsigned_literals() {
        let src = "
            fn @g 0 0
              expr open.8 3000000000u arg %-4 load arg @f close.8 void ;
              expr %-8 load 255 and u8 %-8 set.ub ;
            end
        ";

        let (names, functions) = parse_program(src).unwrap();
        let body = &functions[0].body;

        let f = names.lookup("f").unwrap();
        assert_eq!(
            Stmt::Expr(vec![
                Tok::Open(8),
                Tok::Uint(3_000_000_000),
                Tok::Comma,
                Tok::LocalOfs(-4),
                Tok::Op(Op::Deref, Width::Word),
                Tok::Comma,
                Tok::Ident(f),
                Tok::Close(8),
                Tok::Void,
            ]),
            body[0]
        );

        match &body[1] {
            Stmt::Expr(toks) => {
                assert_eq!(Some(&Tok::Op(Op::CastU8, Width::Word)), toks.get(4));
                assert_eq!(Some(&Tok::Op(Op::Assign, Width::U8)), toks.last());
            }
            other => panic!("expected an expression, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_words() {
        assert!(parse_program("fn @f 0 0 expr frob ; end").is_err());
        assert!(parse_program("fn @f 0 0 expr 1 $ ; end").is_err());
    }
}
