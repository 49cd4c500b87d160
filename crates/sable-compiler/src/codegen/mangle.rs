//! Identifier mangling for generated C.
//!
//! Every identifier the module defines is emitted as `z` followed by an
//! escaped form of its source name. Runtime names carry no `z` prefix, so a
//! mangled name never collides with them or with a C keyword.
//!
//! | Source char | Encoding       |
//! |-------------|----------------|
//! | `z`         | `zz`           |
//! | `#`         | `z3`           |
//! | `.`         | `z2`           |
//! | `'`         | `z7`           |
//! | `?`         | `z8`           |
//! | other       | `zu<hex>_`     |

/// Mangle a source identifier.
pub fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    out.push('z');
    for c in name.chars() {
        match c {
            'z' => out.push_str("zz"),
            '#' => out.push_str("z3"),
            '.' => out.push_str("z2"),
            '\'' => out.push_str("z7"),
            '?' => out.push_str("z8"),
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            c => {
                out.push_str("zu");
                out.push_str(&format!("{:x}", c as u32));
                out.push('_');
            }
        }
    }
    out
}

/// Recover the source identifier of a mangled name.
pub fn demangle(mangled: &str) -> Option<String> {
    let mut chars = mangled.strip_prefix('z')?.chars();
    let mut out = String::new();
    while let Some(c) = chars.next() {
        if c != 'z' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'z' => out.push('z'),
            '3' => out.push('#'),
            '2' => out.push('.'),
            '7' => out.push('\''),
            '8' => out.push('?'),
            'u' => {
                let hex: String = chars.by_ref().take_while(|&c| c != '_').collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_names() {
        assert_eq!(mangle("PC"), "zPC");
        assert_eq!(mangle("size"), "zsizze");
        assert_eq!(mangle("gs#12"), "zgsz312");
        assert_eq!(mangle("x'"), "zxz7");
    }

    #[test]
    fn fresh_names_cannot_clash_with_source_names() {
        assert_ne!(mangle("gs#1"), mangle("gs_1"));
        assert_ne!(mangle("gs#1"), mangle("gsz31"));
    }

    #[test]
    fn unusual_characters() {
        let mangled = mangle("a-b");
        assert!(mangled.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert_eq!(demangle(&mangled).as_deref(), Some("a-b"));
    }

    #[test]
    fn rejects_unmangled() {
        assert_eq!(demangle("rop"), None);
        assert_eq!(demangle("zabcz"), None);
    }

    proptest! {
        #[test]
        fn demangle_inverts_mangle(name in "[a-z#'._?-]{0,12}") {
            prop_assert_eq!(demangle(&mangle(&name)), Some(name));
        }
    }
}
