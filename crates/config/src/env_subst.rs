/// Replace `${ENV_VAR}` placeholders in a raw config string.
///
/// Placeholders whose variable is unset, and malformed placeholders, are
/// emitted verbatim.
pub fn substitute_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            _ => {
                // No closing brace (or empty name): emit literally.
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unsafe_code)]
    fn substitutes_set_var() {
        unsafe { std::env::set_var("WAYPOST_SUBST_TEST", "secret") };
        assert_eq!(
            substitute_env("token = \"${WAYPOST_SUBST_TEST}\""),
            "token = \"secret\""
        );
        unsafe { std::env::remove_var("WAYPOST_SUBST_TEST") };
    }

    #[test]
    fn keeps_unset_var() {
        assert_eq!(
            substitute_env("${WAYPOST_SUBST_UNSET_XYZ}"),
            "${WAYPOST_SUBST_UNSET_XYZ}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env("a ${oops"), "a ${oops");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(substitute_env("no placeholders here"), "no placeholders here");
    }
}
