//! Static resolution of the signature transform embedded in the YouTube
//! player script.
//!
//! The player script contains a helper object whose methods each perform one
//! primitive (reverse, splice, swap) and a transform function that calls those
//! methods in sequence. The transform is recovered with regular expressions,
//! never executed.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("helper object with transform methods not found")]
    ActionsObjectNotFound,
    #[error("signature transform function not found")]
    TransformFunctionNotFound,
    #[error("method {0} does not match any known primitive")]
    UnclassifiedMethod(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// One primitive of the signature transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherOp {
    Reverse,
    // Drop the first n elements
    Splice(usize),
    // Swap element 0 with element n % len
    Swap(usize),
}

impl CipherOp {
    fn apply(self, chars: &mut Vec<char>) {
        match self {
            CipherOp::Reverse => chars.reverse(),
            CipherOp::Splice(n) => {
                let n = n.min(chars.len());
                chars.drain(..n);
            }
            CipherOp::Swap(n) => {
                if !chars.is_empty() {
                    let i = n % chars.len();
                    chars.swap(0, i);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodKind {
    Reverse,
    Splice,
    Swap,
}

const JS_VAR: &str = r"[a-zA-Z_\$][a-zA-Z_0-9\$]*";
const REVERSE_BODY: &str = r":function\(a\)\{(?:return )?a\.reverse\(\)\}";
const SPLICE_BODY: &str = r":function\(a,b\)\{a\.splice\(0,b\)\}";
const SWAP_BODY: &str = r":function\(a,b\)\{var c=a\[0\];a\[0\]=a\[b(?:%a\.length)?\];a\[b(?:%a\.length)?\]=c(?:;return a)?\}";

static ACTIONS_OBJ_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"var ({JS_VAR})=\{{((?:(?:{JS_VAR}{REVERSE_BODY}|{JS_VAR}{SPLICE_BODY}|{JS_VAR}{SWAP_BODY}),?\n?)+)\}};"
    ))
    .unwrap()
});

static ACTIONS_FUNC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"function(?: {JS_VAR})?\(a\)\{{a=a\.split\(""\);\s*((?:(?:a=)?{JS_VAR}\.{JS_VAR}\(a,\d+\);)+)return a\.join\(""\)\}}"#
    ))
    .unwrap()
});

static REVERSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?m)(?:^|,)({JS_VAR}){REVERSE_BODY}")).unwrap());
static SPLICE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?m)(?:^|,)({JS_VAR}){SPLICE_BODY}")).unwrap());
static SWAP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?m)(?:^|,)({JS_VAR}){SWAP_BODY}")).unwrap());

/// Parses the ordered transform operations out of a player script.
pub fn parse_operations(script: &str) -> Result<Vec<CipherOp>, CipherError> {
    let obj = ACTIONS_OBJ_REGEX
        .captures(script)
        .ok_or(CipherError::ActionsObjectNotFound)?;
    let func = ACTIONS_FUNC_REGEX
        .captures(script)
        .ok_or(CipherError::TransformFunctionNotFound)?;

    let obj_name = &obj[1];
    let obj_body = &obj[2];
    let func_body = &func[1];

    let mut methods: Vec<(&str, MethodKind)> = Vec::with_capacity(3);
    for (re, kind) in [
        (&*REVERSE_REGEX, MethodKind::Reverse),
        (&*SPLICE_REGEX, MethodKind::Splice),
        (&*SWAP_REGEX, MethodKind::Swap),
    ] {
        for caps in re.captures_iter(obj_body) {
            if let Some(name) = caps.get(1) {
                methods.push((name.as_str(), kind));
            }
        }
    }
    debug!(object = obj_name, ?methods, "classified transform methods");

    let call_regex = Regex::new(&format!(
        r"(?:a=)?{}\.({JS_VAR})\(a,(\d+)\)",
        regex::escape(obj_name)
    ))?;

    let mut ops = Vec::new();
    for caps in call_regex.captures_iter(func_body) {
        let name = &caps[1];
        let kind = methods
            .iter()
            .find(|(m, _)| *m == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| CipherError::UnclassifiedMethod(name.to_string()))?;
        let arg: usize = caps[2]
            .parse()
            .map_err(|_| CipherError::InvalidArgument(caps[2].to_string()))?;
        ops.push(match kind {
            MethodKind::Reverse => CipherOp::Reverse,
            MethodKind::Splice => CipherOp::Splice(arg),
            MethodKind::Swap => CipherOp::Swap(arg),
        });
    }

    if ops.is_empty() {
        warn!("player script matched but no signature operations were found");
    }
    Ok(ops)
}

/// Applies `ops` in order to the characters of `token`.
pub fn apply_operations(ops: &[CipherOp], token: &str) -> String {
    let mut chars: Vec<char> = token.chars().collect();
    for op in ops {
        op.apply(&mut chars);
    }
    chars.into_iter().collect()
}

/// Parses `script` and deciphers `token` with the resulting operations.
pub fn decipher(script: &str, token: &str) -> Result<String, CipherError> {
    let ops = parse_operations(script)?;
    Ok(apply_operations(&ops, token))
}
