//! Regex and brace-depth scans over contract source.
//!
//! None of this is a parser. Braces inside string literals or comments are
//! counted like any other brace. Line comments between an attribute and its
//! item are skipped whole.

use regex::Regex;
use std::sync::LazyLock;

static USE_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:pub(?:\([^)]*\))?\s+)?use\s+[^;]+;").expect("use statement pattern")
});

static PUBLIC_IMPL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?m)^[ \t]*#\[(?:public|external)\]\s*",
        r"(?:(?:#\[[^\]]*\]|//[^\n]*\n)\s*)*",
        r"impl\b(?:\s*<(?:[^<>{]|<[^<>{]*>)*>)?\s*",
        r"(?P<first>[A-Za-z_][\w:]*)(?:<(?:[^<>{]|<[^<>{]*>)*>)?",
        r"(?:\s+for\s+(?P<second>[A-Za-z_][\w:]*)(?:<(?:[^<>{]|<[^<>{]*>)*>)?)?",
        r"(?:\s+where[^{]*)?\s*\{",
    ))
    .expect("impl block pattern")
});

static ENTRYPOINT_STRUCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"#\[entrypoint\]\s*",
        r"(?:(?:#\[[^\]]*\]|//[^\n]*\n)\s*)*",
        r"(?:pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>[A-Za-z_]\w*)",
    ))
    .expect("entrypoint struct pattern")
});

static FN_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bfn\b").expect("fn keyword pattern"));

/// An attribute-tagged `impl` block located in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplBlock {
    /// Byte offset of the matching `}`.
    pub close: usize,
    pub trait_name: Option<String>,
    pub type_name: String,
    pub has_fn: bool,
}

impl ImplBlock {
    /// Last path segment of the implemented trait, `None` for inherent impls.
    pub fn trait_ident(&self) -> Option<&str> {
        self.trait_name
            .as_deref()
            .map(|name| name.rsplit("::").next().unwrap_or(name))
    }
}

/// Byte offset just past the last top-level `use ...;` statement.
pub fn last_use_end(source: &str) -> Option<usize> {
    USE_STATEMENT.find_iter(source).last().map(|m| m.end())
}

/// Returns the offset of the `}` closing the brace at `open`.
pub fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    for (offset, byte) in bytes.iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// All terminated `#[public]` impl blocks, in source order.
pub fn impl_blocks(source: &str) -> Vec<ImplBlock> {
    let mut blocks = Vec::new();
    for caps in PUBLIC_IMPL.captures_iter(source) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let open = whole.end() - 1;
        let Some(close) = matching_brace(source, open) else {
            continue;
        };
        let first = caps["first"].to_string();
        let (trait_name, type_name) = match caps.name("second") {
            Some(second) => (Some(first), second.as_str().to_string()),
            None => (None, first),
        };
        let has_fn = FN_KEYWORD.is_match(&source[open + 1..close]);
        blocks.push(ImplBlock {
            close,
            trait_name,
            type_name,
            has_fn,
        });
    }
    blocks
}

/// Name of the first `#[entrypoint]` struct.
pub fn entrypoint_struct(source: &str) -> Option<String> {
    ENTRYPOINT_STRUCT
        .captures(source)
        .map(|caps| caps["name"].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_use_end_multiline() {
        let source = "use a::b;\nuse stylus_sdk::{\n    msg,\n    prelude::*,\n};\n\nfn main() {}\n";
        let end = last_use_end(source).unwrap();
        assert_eq!(&source[..end], "use a::b;\nuse stylus_sdk::{\n    msg,\n    prelude::*,\n};");
    }

    #[test]
    fn test_last_use_end_ignores_indented_use() {
        let source = "use a::b;\nmod inner {\n    use c::d;\n}\n";
        assert_eq!(last_use_end(source), Some("use a::b;".len()));
        assert_eq!(last_use_end("fn main() {}"), None);
    }

    #[test]
    fn test_pub_use_counts() {
        let source = "use a::b;\npub use c::d;\nfn main() {}";
        assert_eq!(last_use_end(source), Some("use a::b;\npub use c::d;".len()));
    }

    #[test]
    fn test_matching_brace_nested() {
        let source = "impl A { fn a() { if x { } } }";
        let open = source.find('{').unwrap();
        assert_eq!(matching_brace(source, open), Some(source.len() - 1));
        assert_eq!(matching_brace("{ {", 0), None);
        assert_eq!(matching_brace("x{}", 0), None);
    }

    #[test]
    fn test_impl_blocks_trait_and_inherent() {
        let source = "#[public]\n#[implements(IErc20<Error = Vec<u8>>)]\nimpl Token {\n    fn a() {}\n}\n\n#[public]\nimpl IErc20 for Token {\n    fn b() {}\n}\n";
        let blocks = impl_blocks(source);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].trait_name, None);
        assert_eq!(blocks[0].type_name, "Token");
        assert_eq!(blocks[1].trait_name.as_deref(), Some("IErc20"));
        assert_eq!(blocks[1].type_name, "Token");
        assert!(blocks.iter().all(|b| b.has_fn));
        assert_eq!(&source[blocks[1].close..blocks[1].close + 1], "}");
    }

    #[test]
    fn test_impl_blocks_allow_comments_after_attribute() {
        let source = "#[public]\n/// Public API\nimpl Foo {\n    fn a() {}\n}\n\n#[public]\n// ABI\n#[implements(IErc20)]\n//! inner\nimpl IErc20 for Foo {\n    fn b() {}\n}\n";
        let blocks = impl_blocks(source);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].type_name, "Foo");
        assert_eq!(blocks[0].trait_name, None);
        assert_eq!(blocks[1].trait_ident(), Some("IErc20"));
    }

    #[test]
    fn test_commented_out_impl_is_not_a_block() {
        let source = "#[public]\n// impl Ghost {}\nfn free() {}\n";
        assert!(impl_blocks(source).is_empty());
    }

    #[test]
    fn test_impl_blocks_skip_untagged_and_unterminated() {
        let source = "impl Internal {\n    fn a() {}\n}\n#[public]\nimpl Open {\n    fn b() {\n";
        assert!(impl_blocks(source).is_empty());
    }

    #[test]
    fn test_impl_block_without_fn() {
        let source = "#[public]\n#[inherit(Erc20<Params>)]\nimpl Token {}\n";
        let blocks = impl_blocks(source);
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].has_fn);
    }

    #[test]
    fn test_trait_ident_strips_path() {
        let source = "#[public]\nimpl erc20::IErc20 for Token { fn a() {} }";
        let blocks = impl_blocks(source);
        assert_eq!(blocks[0].trait_ident(), Some("IErc20"));
    }

    #[test]
    fn test_entrypoint_struct() {
        let source = "sol_storage! {\n    #[entrypoint]\n    pub struct Counter {\n        uint256 number;\n    }\n}";
        assert_eq!(entrypoint_struct(source).as_deref(), Some("Counter"));
        let storage = "#[entrypoint]\n#[storage]\nstruct Vault { }";
        assert_eq!(entrypoint_struct(storage).as_deref(), Some("Vault"));
        assert_eq!(entrypoint_struct("struct Plain {}"), None);
        let documented = "#[entrypoint]\n/// Contract state\n#[storage]\npub struct Vault { }";
        assert_eq!(entrypoint_struct(documented).as_deref(), Some("Vault"));
    }
}
