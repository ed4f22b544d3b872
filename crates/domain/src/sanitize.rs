//! 文本清洗：去除 HTML 标签并去掉首尾空白。

use once_cell::sync::Lazy;
use regex::Regex;

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("markup pattern is valid"));

/// 反复剥离直到没有标签残留，保证幂等
pub fn sanitize_text(input: &str) -> String {
    let mut current = input.trim().to_string();
    loop {
        let stripped = MARKUP.replace_all(&current, "");
        if stripped == current {
            break;
        }
        current = stripped.trim().to_string();
    }
    current
}
