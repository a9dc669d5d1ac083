/// Removes markup tags from caller-supplied text and trims the result.
///
/// Everything from a `<` up to the next `>` is dropped; an unterminated tag
/// drops the remainder of the input.
#[must_use]
pub fn strip_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match (in_tag, c) {
            (false, '<') => in_tag = true,
            (true, '>') => in_tag = false,
            (false, c) => output.push(c),
            (true, _) => {}
        }
    }
    output.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::strip_tags;

    #[test]
    fn strips_tags_and_whitespace() {
        assert_eq!(strip_tags(" <b>GET</b> "), "GET");
        assert_eq!(strip_tags("INV-<script>alert(1)</script>001"), "INV-alert(1)001");
        assert_eq!(strip_tags("abc<unterminated"), "abc");
        assert_eq!(strip_tags("plain"), "plain");
    }
}
