//! Chained expressions: `In('lab').Get('cup').Wrt('table').Ei('world')`.
//!
//! A Set chain ends in `.As([[..], [..], [..], [..]])`.  Arguments may be
//! single-quoted, double-quoted or bare, and a leading `db.` is ignored.
//! Calls must appear in chain order: `In`, `Get`/`Set`, `Wrt`, `Ei`, `As`.

use wrt_graph::Request;
use wrt_types::WrtError;

use crate::matrix;

/// A parsed expression: the world it targets and what to do there.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub world: String,
    pub request: Request,
}

/// One `Name(argument)` link of the chain.
#[derive(Debug, PartialEq)]
struct Call<'a> {
    name: &'a str,
    arg: &'a str,
}

fn invalid(msg: impl Into<String>) -> WrtError {
    WrtError::InvalidRequest(msg.into())
}

/// Split `src` into its calls.  Parentheses are matched while honouring
/// quotes and brackets, so dots inside numbers or names stay in the argument.
fn split_calls(src: &str) -> Result<Vec<Call<'_>>, WrtError> {
    let bytes = src.as_bytes();
    let mut calls = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let name_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
            pos += 1;
        }
        let name = &src[name_start..pos];
        if name.is_empty() {
            return Err(invalid(format!("expected a call at offset {name_start}")));
        }
        if bytes.get(pos) != Some(&b'(') {
            return Err(invalid(format!("expected '(' after {name}")));
        }
        pos += 1;

        let arg_start = pos;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        loop {
            let Some(&c) = bytes.get(pos) else {
                return Err(invalid(format!("unclosed '(' in {name}")));
            };
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, b'\'' | b'"') => quote = Some(c),
                (None, b'[' | b'(') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b')') if depth == 0 => break,
                (None, b')') => depth -= 1,
                _ => {}
            }
            pos += 1;
        }
        calls.push(Call {
            name,
            arg: &src[arg_start..pos],
        });
        pos += 1;

        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None => return Ok(calls),
            Some(b'.') => pos += 1,
            Some(_) => return Err(invalid(format!("expected '.' after {name}(...)"))),
        }
    }
}

/// Strip one pair of matching quotes from a frame or world name.
fn unquote(arg: &str) -> Result<String, WrtError> {
    let arg = arg.trim();
    let inner = match arg.as_bytes() {
        [q @ (b'\'' | b'"'), .., last] if last == q => &arg[1..arg.len() - 1],
        [b'\'' | b'"', ..] => return Err(invalid(format!("unterminated quote in {arg}"))),
        _ => arg,
    };
    if inner.trim().is_empty() {
        return Err(invalid("names must not be empty"));
    }
    Ok(inner.to_string())
}

fn rank(name: &str) -> Option<u8> {
    match name {
        "In" => Some(0),
        "Get" | "Set" => Some(1),
        "Wrt" => Some(2),
        "Ei" => Some(3),
        "As" => Some(4),
        _ => None,
    }
}

/// Parse a chained expression into an [`Expression`].
///
/// # Errors
///
/// [`WrtError::InvalidRequest`] for syntax errors, unknown or out-of-order
/// calls and missing parts; [`WrtError::InvalidTransform`] for a bad `As`
/// matrix.
pub fn parse(src: &str, tolerance: f64) -> Result<Expression, WrtError> {
    let src = src.trim();
    let src = src.strip_prefix("db.").unwrap_or(src);

    let mut world = None;
    let mut builder = Request::builder();
    let mut last_rank = None;

    for call in split_calls(src)? {
        let step = rank(call.name).ok_or_else(|| invalid(format!("unknown call {}(...)", call.name)))?;
        if last_rank.is_some_and(|last| step <= last) {
            return Err(invalid(format!("{}(...) is out of order", call.name)));
        }
        last_rank = Some(step);

        builder = match call.name {
            "In" => {
                world = Some(unquote(call.arg)?);
                builder
            }
            "Get" => builder.get(unquote(call.arg)?),
            "Set" => builder.set(unquote(call.arg)?),
            "Wrt" => builder.wrt(unquote(call.arg)?),
            "Ei" => builder.ei(unquote(call.arg)?),
            _ => builder.pose(matrix::parse_pose(call.arg, tolerance)?),
        };
    }

    let world = world.ok_or_else(|| invalid("In is required"))?;
    Ok(Expression {
        world,
        request: builder.build()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrt_graph::{Operation, Pose};
    use wrt_types::DEFAULT_TOLERANCE;

    fn parse_ok(src: &str) -> Expression {
        parse(src, DEFAULT_TOLERANCE).unwrap_or_else(|e| panic!("{src}: {e}"))
    }

    fn parse_err(src: &str) -> WrtError {
        parse(src, DEFAULT_TOLERANCE).expect_err(src)
    }

    // ── accepted forms ───────────────────────────────────────────────────────

    #[test]
    fn get_chain_with_single_quotes() {
        let e = parse_ok("In('my-world').Get('table').Wrt('world').Ei('world')");
        assert_eq!(e.world, "my-world");
        assert_eq!(e.request.subject(), "table");
        assert_eq!(e.request.reference(), "world");
        assert_eq!(e.request.expressed_in(), "world");
        assert_eq!(e.request.operation(), &Operation::Get);
    }

    #[test]
    fn db_prefix_double_quotes_and_bare_names() {
        let e = parse_ok(r#"db.In("lab").Get(cup).Wrt( "table" ).Ei(world)"#);
        assert_eq!(e.world, "lab");
        assert_eq!(e.request.subject(), "cup");
        assert_eq!(e.request.reference(), "table");
    }

    #[test]
    fn dotted_names_stay_whole() {
        let e = parse_ok("In('lab').Get('arm.link.2').Wrt('base.v1').Ei('base.v1')");
        assert_eq!(e.request.subject(), "arm.link.2");
        assert_eq!(e.request.reference(), "base.v1");
    }

    #[test]
    fn set_chain_with_matrix() {
        let e = parse_ok(
            "In('lab').Set('cup').Wrt('table').Ei('table')\
             .As([[1, 0, 0, 0.5], [0, 1, 0, 0], [0, 0, 1, 1.25], [0, 0, 0, 1]])",
        );
        let Operation::Set(pose) = e.request.operation() else {
            panic!("expected a Set");
        };
        assert!(pose.approx_eq(&Pose::from_translation(0.5, 0.0, 1.25), 1e-12));
    }

    #[test]
    fn split_keeps_parentheses_inside_quotes() {
        let calls = split_calls("Get('a(b)').Wrt(c)").unwrap();
        assert_eq!(
            calls,
            vec![Call { name: "Get", arg: "'a(b)'" }, Call { name: "Wrt", arg: "c" }]
        );
    }

    // ── rejected forms ───────────────────────────────────────────────────────

    #[test]
    fn structural_errors_are_invalid_requests() {
        for src in [
            "",
            "Get('a').Wrt('b').Ei('b')",
            "In('w').Wrt('b').Get('a').Ei('b')",
            "In('w').Get('a').Wrt('b').Ei('b').Ei('b')",
            "In('w').Get('a').Wrt('b')",
            "In('w').Get('a').Wrt('b').Ei('b').Foo(1)",
            "In('w').Get('a').Wrt('b').Ei('b'",
            "In('w') Get('a')",
            "In('w').Get('').Wrt('b').Ei('b')",
            "In('w').Get('a).Wrt('b').Ei('b')",
            "In('w').Set('a').Wrt('b').Ei('b')",
            "In('w').Get('a').Wrt('b').Ei('b').As([[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]])",
        ] {
            assert!(matches!(parse_err(src), WrtError::InvalidRequest(_)), "{src}");
        }
    }

    #[test]
    fn bad_matrix_is_invalid_transform() {
        let err = parse_err("In('w').Set('a').Wrt('b').Ei('b').As([[1,0],[0,1]])");
        assert!(matches!(err, WrtError::InvalidTransform(_)));
    }
}
