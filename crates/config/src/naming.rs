//! File-name derivation for record types.

/// Convert a type name to `snake_case`.
///
/// Uppercase letters start a new word, acronyms stay together, digits attach
/// to the preceding word, and any other character acts as a separator.
///
/// - `TestName` → `test_name`
/// - `TestName123` → `test_name123`
/// - `ABCTestName` → `abc_test_name`
/// - `TestName123_TestName456` → `test_name123_test_name456`
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    if !name.chars().any(|c| c.is_uppercase() || !c.is_alphanumeric()) {
        return name.to_lowercase();
    }

    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush(&mut words, &mut current);
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let prev_is_lower_or_digit =
                prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            let acronym_ends = prev.is_some_and(char::is_uppercase)
                && next.is_some_and(char::is_lowercase);
            if prev_is_lower_or_digit || acronym_ends {
                flush(&mut words, &mut current);
            }
        }
        current.extend(c.to_lowercase());
    }
    flush(&mut words, &mut current);

    words.join("_")
}

fn flush(words: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

/// Normalize a declared file name against a registry's extensions: append
/// `extensions[0]` unless the name already ends with one of `extensions`.
///
/// Returns the name unchanged when `extensions` is empty.
#[must_use]
pub fn with_default_extension(file_name: &str, extensions: &[&str]) -> String {
    if extensions.iter().any(|ext| file_name.ends_with(ext)) {
        return file_name.to_string();
    }
    match extensions.first() {
        Some(default) => format!("{file_name}{default}"),
        None => file_name.to_string(),
    }
}
